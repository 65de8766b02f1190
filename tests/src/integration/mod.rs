//! Cross-crate tests.

pub mod gateway;
pub mod properties;
pub mod scenarios;
