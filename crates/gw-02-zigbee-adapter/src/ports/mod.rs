//! Ports layer: the boundary to the vendor radio stack.

pub mod radio;

pub use radio::{
    RadioCallbacks, RadioConfig, RadioError, RadioReport, RadioSignal, RadioStack, RadioStatus,
    SignalAction, STATUS_OK,
};
