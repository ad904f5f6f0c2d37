use super::abstractions::{Component, ComponentSpec, Direction, Pin, Wire};
use super::errors::SimError;
use super::system::EventHandler;
use super::Engine;
use std::rc::Rc;

/// Fluent builder over the component constructors: accumulate boundary
/// pins, internal wires, sub-components and extra handlers, then emit
/// a single [`Component`]. Pure glue; the engine behaviors do the rest.
///
/// ```
/// # use gatesim::simulator::abstractions::{Data, Direction, Pin};
/// # use gatesim::simulator::CircuitDesigner;
/// let clk = Pin::new(Data::binary(1), Some("clk"));
/// let block = CircuitDesigner::new()
///     .name("block")
///     .pin(&clk, Direction::In, Some("CLK"))
///     .build()
///     .unwrap();
/// assert!(block.get_pin("CLK").is_ok());
/// ```
#[derive(Default)]
pub struct CircuitDesigner {
    name: Option<String>,
    spec: ComponentSpec,
    pins: Vec<(Rc<Pin>, Direction, Option<String>)>,
    wires: Vec<Rc<Wire>>,
    comps: Vec<Rc<Component>>,
    handlers: Vec<Rc<EventHandler>>,
}

impl CircuitDesigner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Replace the mapping spec of the emitted component.
    pub fn spec(mut self, spec: ComponentSpec) -> Self {
        self.spec = spec;
        self
    }

    pub fn pin(mut self, pin: &Rc<Pin>, direction: Direction, id: Option<&str>) -> Self {
        self.pins
            .push((Rc::clone(pin), direction, id.map(str::to_string)));
        self
    }

    pub fn wire(mut self, wire: &Rc<Wire>) -> Self {
        self.wires.push(Rc::clone(wire));
        self
    }

    /// Shorthand for an internal point-to-point wire.
    pub fn connect(self, from: &Rc<Pin>, to: &Rc<Pin>, delay: u64) -> Self {
        let wire = Wire::direct(from, to, delay);
        self.wire(&wire)
    }

    pub fn comp(mut self, comp: &Rc<Component>) -> Self {
        self.comps.push(Rc::clone(comp));
        self
    }

    /// An extra handler attached to the engine on [`Self::install`].
    pub fn handler(mut self, handler: Rc<EventHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Emit the accumulated component. Handlers are only registered by
    /// `install`.
    pub fn build(self) -> Result<Rc<Component>, SimError> {
        Component::new(
            self.spec,
            self.pins
                .iter()
                .map(|(pin, dir, id)| (Rc::clone(pin), *dir, id.as_deref()))
                .collect(),
            self.wires,
            self.comps,
            self.name.as_deref(),
        )
    }

    /// Emit the component, register it (recursively) with the engine
    /// and attach the accumulated handlers.
    pub fn install(mut self, engine: &mut Engine) -> Result<Rc<Component>, SimError> {
        let handlers = std::mem::take(&mut self.handlers);
        let comp = self.build()?;
        engine.add_comp(&comp);
        for handler in handlers {
            engine.scheduler_mut().attach(handler);
        }
        Ok(comp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::abstractions::{Data, Element, MappedInput, MappedOutput, StateValue};

    #[test]
    fn build_emits_a_component_with_the_accumulated_parts() {
        let a = Pin::new(Data::binary(1), Some("a"));
        let q = Pin::new(Data::binary(1), Some("q"));
        let spec = ComponentSpec::new()
            .classifier("NOT")
            .input(MappedInput::new("a", "a", |d| {
                StateValue::Bool(d.value() == 1)
            }))
            .output(MappedOutput::new("q", "q", &["a"], |srcs| {
                StateValue::Bool(!srcs[0].as_bool())
            }));
        let comp = CircuitDesigner::new()
            .name("inv")
            .spec(spec)
            .pin(&a, Direction::In, Some("a"))
            .pin(&q, Direction::Out, Some("q"))
            .build()
            .unwrap();
        assert_eq!(comp.full_name(), "C_NOT_inv");
        assert_eq!(comp.state("q"), Some(StateValue::Bool(true)));
    }

    #[test]
    fn install_registers_the_tree_and_drives_the_circuit() {
        let mut engine = Engine::new();
        let a = Pin::new(Data::binary(1), Some("a"));
        let q = Pin::new(Data::binary(1), Some("q"));
        let spec = ComponentSpec::new()
            .input(MappedInput::new("a", "a", |d| StateValue::Data(*d)))
            .output(MappedOutput::new("q", "q", &["a"], |srcs| srcs[0].clone()));
        let comp = CircuitDesigner::new()
            .name("buf")
            .spec(spec)
            .pin(&a, Direction::In, Some("a"))
            .pin(&q, Direction::Out, Some("q"))
            .install(&mut engine)
            .unwrap();
        assert!(engine.find(comp.id()).is_ok());

        engine.schedule_write(a.id(), 0, 1).unwrap();
        engine.advance(0);
        assert_eq!(q.data().value(), 1);
    }
}
