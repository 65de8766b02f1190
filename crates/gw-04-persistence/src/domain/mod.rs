//! Domain layer: keys, limits and errors of the key/blob store.

pub mod config;
pub mod errors;
pub mod key;

pub use config::PersistConfig;
pub use errors::PersistError;
pub use key::{validate_key, PersistKey, SCHEMA_KEY};
