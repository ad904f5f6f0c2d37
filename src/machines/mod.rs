mod daisy_chain;

pub use daisy_chain::*;
