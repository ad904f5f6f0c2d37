mod component;
mod data;
mod element;
mod pin;
mod wire;

pub use component::*;
pub use data::*;
pub use element::*;
pub use pin::*;
pub use wire::*;

/// Virtual simulated time, in abstract integer units.
pub type Tick = u64;
