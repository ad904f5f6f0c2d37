//! Event-driven simulator for digital logic circuits.
//!
//! Circuits are composed from pins (value-carrying nodes), wires
//! (delay-carrying conductors) and components (mapped black boxes with
//! internal state). Writes are scheduled at virtual time points; the
//! engine propagates changes through a deterministic, single-threaded
//! priority-time event queue.

pub mod components;
pub mod machines;
pub mod simulator;
