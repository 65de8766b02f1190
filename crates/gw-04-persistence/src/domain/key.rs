//! Key validation.
//!
//! Keys are short ASCII paths such as `node/0011223344556677`. They must be
//! non-empty, at most 32 bytes, and use only `[A-Za-z0-9_.-/]`.

use super::errors::PersistError;
use heapless::String as HeaplessString;
use shared_types::limits::PERSIST_KEY_MAX;

/// A validated key.
pub type PersistKey = HeaplessString<PERSIST_KEY_MAX>;

/// Reserved key holding the schema version.
pub const SCHEMA_KEY: &str = "_schema_version";

/// Validates `key` and copies it into a bounded string.
///
/// # Errors
///
/// `InvalidKey` when the key is empty, too long or contains a character
/// outside the allowed set.
pub fn validate_key(key: &str) -> Result<PersistKey, PersistError> {
    let invalid = |reason| PersistError::InvalidKey {
        key: key.to_string(),
        reason,
    };
    if key.is_empty() {
        return Err(invalid("empty"));
    }
    if key.len() > PERSIST_KEY_MAX {
        return Err(invalid("longer than 32 bytes"));
    }
    if !key
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.' | b'/'))
    {
        return Err(invalid("unsupported character"));
    }
    let mut bounded = PersistKey::new();
    bounded
        .push_str(key)
        .map_err(|()| invalid("longer than 32 bytes"))?;
    Ok(bounded)
}
