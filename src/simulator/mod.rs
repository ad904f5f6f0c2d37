pub mod abstractions;
pub mod system;

mod designer;
mod engine;
mod errors;

pub use {designer::*, engine::*, errors::*};
