//! Adapters layer: radio stack implementations.

pub mod simulated;

pub use simulated::{SentFrame, SimulatedRadio, SimulatedRadioControl};
