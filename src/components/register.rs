use super::clock::{clk_input, edge_react, Edge};
use crate::simulator::abstractions::{
    Component, ComponentSpec, Data, Direction, MappedInput, MappedOutput, Pin, StateValue,
};
use crate::simulator::SimError;
use std::rc::Rc;

const DATA_IN: &str = "data_in";
const DATA: &str = "data";
const DATA_OUT: &str = "data_out";

/// An edge-triggered register: on the configured clock edge the value
/// present at `D` is latched into the internal `data` slot and driven
/// out through `Q`.
///
/// ```text
///          Register
///        ┌──────────┐
///  D --> │ D      Q │ --> Q
///  CLK ->│ >        │
///        └──────────┘
/// ```
pub struct Register {
    comp: Rc<Component>,
    data_in: Rc<Pin>,
    clk: Rc<Pin>,
    data_out: Rc<Pin>,
}

impl Register {
    /// A rising-edge register over `width`-bit data.
    pub fn new(width: u8, name: Option<&str>) -> Result<Register, SimError> {
        Register::with_edge(width, Edge::Rising, name)
    }

    pub fn with_edge(width: u8, edge: Edge, name: Option<&str>) -> Result<Register, SimError> {
        let data_in = Pin::new(Data::binary(width), None);
        let clk = Pin::new(Data::binary(1), None);
        let data_out = Pin::new(Data::binary(width), None);

        let spec = ComponentSpec::new()
            .classifier("REG")
            .input(MappedInput::new("D", DATA_IN, |d| StateValue::Data(*d)))
            .input(clk_input("CLK"))
            .slot(DATA, StateValue::Data(Data::binary(width)))
            .output(MappedOutput::new("Q", DATA_OUT, &[DATA], |srcs| {
                srcs[0].clone()
            }))
            .react(edge_react(edge, |current| {
                match current.get(DATA_IN) {
                    Some(value) => vec![(DATA.to_string(), value.clone())],
                    None => Vec::new(),
                }
            }));

        let comp = Component::new(
            spec,
            vec![
                (Rc::clone(&data_in), Direction::In, Some("D")),
                (Rc::clone(&clk), Direction::In, Some("CLK")),
                (Rc::clone(&data_out), Direction::Out, Some("Q")),
            ],
            vec![],
            vec![],
            name,
        )?;

        Ok(Register {
            comp,
            data_in,
            clk,
            data_out,
        })
    }

    pub fn comp(&self) -> &Rc<Component> {
        &self.comp
    }

    pub fn data_in(&self) -> &Rc<Pin> {
        &self.data_in
    }

    pub fn clk(&self) -> &Rc<Pin> {
        &self.clk
    }

    pub fn data_out(&self) -> &Rc<Pin> {
        &self.data_out
    }

    /// The currently latched value.
    pub fn value(&self) -> Data {
        self.comp
            .state(DATA)
            .and_then(|v| v.as_data())
            .unwrap_or(Data::word(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::abstractions::Element;
    use crate::simulator::Engine;

    fn pulse(engine: &mut Engine, reg: &Register, high_at: u64, low_at: u64) {
        engine.schedule_write(reg.clk().id(), high_at, 1).unwrap();
        engine.schedule_write(reg.clk().id(), low_at, 0).unwrap();
    }

    #[test]
    fn classifier_and_schema() {
        let reg = Register::new(8, Some("r0")).unwrap();
        assert_eq!(reg.comp().full_name(), "C_REG_r0");
        assert_eq!(reg.comp().state("clk"), Some(StateValue::Bool(false)));
        assert_eq!(reg.value().value(), 0);

        let anon = Register::new(4, None).unwrap();
        assert!(anon.comp().full_name().starts_with("C_REG_"));
        assert_eq!(anon.comp().name().len(), 5);
    }

    #[test]
    fn latches_on_the_rising_edge() {
        let mut engine = Engine::new();
        let reg = Register::new(8, Some("r1")).unwrap();
        engine.add_comp(reg.comp());

        engine.schedule_write(reg.data_in().id(), 0, 0xff).unwrap();
        pulse(&mut engine, &reg, 5, 7);
        engine.advance(10);

        assert_eq!(reg.value().value(), 0xff);
        assert_eq!(reg.data_out().data().value(), 0xff);
        assert!(engine.failures().is_empty());
    }

    #[test]
    fn holds_between_edges() {
        let mut engine = Engine::new();
        let reg = Register::new(8, Some("r2")).unwrap();
        engine.add_comp(reg.comp());

        engine.schedule_write(reg.data_in().id(), 0, 0x42).unwrap();
        pulse(&mut engine, &reg, 5, 7);
        // the input moves while clk is low; nothing latches
        engine.schedule_write(reg.data_in().id(), 8, 0x13).unwrap();
        engine.advance(12);

        assert_eq!(reg.value().value(), 0x42);
        assert_eq!(reg.data_out().data().value(), 0x42);
    }

    #[test]
    fn each_rising_edge_samples_the_input_anew() {
        let mut engine = Engine::new();
        let reg = Register::new(8, Some("r3")).unwrap();
        engine.add_comp(reg.comp());

        engine.schedule_write(reg.data_in().id(), 0, 0x01).unwrap();
        pulse(&mut engine, &reg, 2, 4);
        engine.schedule_write(reg.data_in().id(), 6, 0x02).unwrap();
        pulse(&mut engine, &reg, 8, 10);
        engine.advance(12);

        assert_eq!(reg.value().value(), 0x02);
        assert_eq!(reg.data_out().data().value(), 0x02);
    }

    #[test]
    fn falling_edge_register_latches_on_the_drop() {
        let mut engine = Engine::new();
        let reg = Register::with_edge(8, Edge::Falling, Some("r4")).unwrap();
        engine.add_comp(reg.comp());

        engine.schedule_write(reg.data_in().id(), 0, 0x77).unwrap();
        engine.schedule_write(reg.clk().id(), 2, 1).unwrap();
        engine.advance(3);
        assert_eq!(reg.value().value(), 0);

        engine.schedule_write(reg.clk().id(), 4, 0).unwrap();
        engine.advance(2);
        assert_eq!(reg.value().value(), 0x77);
    }
}
