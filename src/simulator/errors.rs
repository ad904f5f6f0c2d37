use thiserror::Error;

/// All failures the simulator reports. Raised synchronously at the call
/// that introduces them; nothing is retried.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("value {value} is outside the domain of {shape}")]
    InvalidValue { value: i64, shape: String },

    #[error("incompatible data: {left} vs {right}")]
    Incompatible { left: String, right: String },

    #[error("cannot reduce an empty set of data")]
    EmptyReduce,

    #[error("bit {index} is out of range for {length}-bit data")]
    BitOutOfRange { index: u8, length: u8 },

    #[error("bit operations require binary data, got {shape}")]
    NotBinary { shape: String },

    #[error("{pin} is not an input endpoint of {wire}")]
    NotAnInput { pin: String, wire: String },

    #[error("only a pin can drive {wire}")]
    NotAPin { wire: String },

    #[error("duplicate pin id '{id}' on {component}")]
    DuplicatePinId { id: String, component: String },

    #[error("duplicate state slot '{alias}' on {component}")]
    DuplicateState { alias: String, component: String },

    #[error("unknown state slot '{alias}' on {component}")]
    UnknownState { alias: String, component: String },

    #[error("unknown element {id}")]
    UnknownElement { id: String },

    #[error("unknown pin id '{id}' on {component}")]
    UnknownPinId { id: String, component: String },

    #[error("{pin} has no output mapping on {component}")]
    NotMapped { pin: String, component: String },

    #[error("event queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },

    #[error("conflicting writes to {pin} at t={time}")]
    WriteConflict { pin: String, time: u64 },

    #[error("{target} does not accept writes")]
    NotWritable { target: String },
}
