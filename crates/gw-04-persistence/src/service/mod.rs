mod store;

pub use store::{BufferedStore, PersistStats, StoreBuilder, PERSIST_SOURCE_ID};
