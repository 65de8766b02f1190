//! Ports layer.
//!
//! - [`StorageBackend`]: where flushed blobs end up (outbound).
//! - [`KeyBlobStore`]: the store as its clients see it (inbound).

pub mod backend;
pub mod store;

pub use backend::StorageBackend;
pub use store::KeyBlobStore;
