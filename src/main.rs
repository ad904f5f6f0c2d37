use anyhow::Result;
use gatesim::machines::DaisyChain;

// Demo: two 8-bit registers in a daisy chain behind one clock. Run with
// RUST_LOG=gatesim=trace to see every dispatched event.
fn main() -> Result<()> {
    env_logger::init();

    let mut machine = DaisyChain::new(8)?;
    machine.feed(0, 255)?;
    machine.pulse(5, 7)?;
    machine.feed(10, 133)?;
    machine.pulse(15, 17)?;

    machine.run(14);
    println!(
        "t={:2}  R1={:#04x}  R2={:#04x}",
        machine.engine().now(),
        machine.r1().value().value(),
        machine.r2().value().value()
    );

    machine.run(4);
    println!(
        "t={:2}  R1={:#04x}  R2={:#04x}",
        machine.engine().now(),
        machine.r1().value().value(),
        machine.r2().value().value()
    );

    Ok(())
}
