use crate::components::Register;
use crate::simulator::abstractions::{Data, Element, Pin, Tick, Wire};
use crate::simulator::{Engine, SimError};
use std::rc::Rc;

/// Two registers in series behind a shared clock: `R1.Q` feeds `R2.D`
/// through a direct wire, and a global clock pin fans out to both
/// `CLK` inputs. A value fed into `R1` crosses one register per clock
/// pulse.
pub struct DaisyChain {
    engine: Engine,
    r1: Register,
    r2: Register,
    gclk: Rc<Pin>,
}

impl DaisyChain {
    pub fn new(width: u8) -> Result<Self, SimError> {
        let mut engine = Engine::new();
        let r1 = Register::new(width, Some("1"))?;
        let r2 = Register::new(width, Some("2"))?;
        let gclk = Pin::new(Data::binary(1), Some("GCLK"));

        let data = Wire::direct(r1.data_out(), r2.data_in(), 0);
        let clock = Wire::branch(
            &gclk,
            &[(Rc::clone(r1.clk()), 0), (Rc::clone(r2.clk()), 0)],
        );

        engine.add_comp(r1.comp());
        engine.add_comp(r2.comp());
        engine.add_pin(&gclk);
        engine.add_wire(&data);
        engine.add_wire(&clock);

        Ok(DaisyChain {
            engine,
            r1,
            r2,
            gclk,
        })
    }

    /// Present `value` at `R1.D` at the given time.
    pub fn feed(&mut self, time: Tick, value: i64) -> Result<(), SimError> {
        self.engine
            .schedule_write(self.r1.data_in().id(), time, value)
    }

    /// One full clock pulse on the global clock.
    pub fn pulse(&mut self, high_at: Tick, low_at: Tick) -> Result<(), SimError> {
        self.engine.schedule_write(self.gclk.id(), high_at, 1)?;
        self.engine.schedule_write(self.gclk.id(), low_at, 0)
    }

    pub fn run(&mut self, dt: Tick) {
        self.engine.advance(dt);
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn r1(&self) -> &Register {
        &self.r1
    }

    pub fn r2(&self) -> &Register {
        &self.r2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_register_per_clock_pulse() {
        let mut machine = DaisyChain::new(8).unwrap();
        machine.feed(0, 255).unwrap();
        machine.pulse(5, 7).unwrap();
        machine.feed(10, 133).unwrap();
        machine.pulse(15, 17).unwrap();

        machine.run(14);
        assert_eq!(machine.r1().value().value(), 255);
        assert_eq!(machine.r2().value().value(), 0);

        // the second pulse latches the fresh input into R1 and R1's
        // previous output into R2
        machine.run(4);
        assert_eq!(machine.r1().value().value(), 133);
        assert_eq!(machine.r2().value().value(), 255);
        assert!(machine.engine().failures().is_empty());
    }

    #[test]
    fn no_pulse_means_no_movement() {
        let mut machine = DaisyChain::new(8).unwrap();
        machine.feed(0, 0x5a).unwrap();
        machine.run(10);
        assert_eq!(machine.r1().value().value(), 0);
        assert_eq!(machine.r2().value().value(), 0);
    }
}
