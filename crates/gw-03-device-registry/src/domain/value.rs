//! Typed attribute values decoded from ZCL wire data.

use serde::{Deserialize, Serialize};
use shared_types::limits::REG_NAME_MAX_LEN;
use std::fmt;

/// ZCL data type identifiers understood by [`AttrValue::from_zcl`].
pub mod zcl_types {
    pub const BOOL: u8 = 0x10;
    pub const BITMAP8: u8 = 0x18;
    pub const BITMAP16: u8 = 0x19;
    pub const U8: u8 = 0x20;
    pub const U16: u8 = 0x21;
    pub const U32: u8 = 0x23;
    pub const S8: u8 = 0x28;
    pub const S16: u8 = 0x29;
    pub const S32: u8 = 0x2B;
    pub const ENUM8: u8 = 0x30;
    pub const CHAR_STRING: u8 = 0x42;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttrValue {
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    S8(i8),
    S16(i16),
    S32(i32),
    Str(String),
    /// Types without a typed decoding, kept raw.
    Bytes(Vec<u8>),
}

impl AttrValue {
    /// Decodes little-endian ZCL `data` of type `data_type`.
    ///
    /// Short or unknown input falls back to `Bytes`.
    #[must_use]
    pub fn from_zcl(data_type: u8, data: &[u8]) -> Self {
        use zcl_types::*;
        let fixed = |n: usize| data.get(..n);
        let decoded = match data_type {
            BOOL => fixed(1).map(|b| Self::Bool(b[0] != 0)),
            U8 | ENUM8 | BITMAP8 => fixed(1).map(|b| Self::U8(b[0])),
            U16 | BITMAP16 => fixed(2).map(|b| Self::U16(u16::from_le_bytes([b[0], b[1]]))),
            U32 => fixed(4).map(|b| Self::U32(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))),
            S8 => fixed(1).map(|b| Self::S8(b[0] as i8)),
            S16 => fixed(2).map(|b| Self::S16(i16::from_le_bytes([b[0], b[1]]))),
            S32 => fixed(4).map(|b| Self::S32(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))),
            CHAR_STRING => data.split_first().map(|(&len, rest)| {
                let text = &rest[..rest.len().min(len as usize)];
                Self::Str(bounded(&String::from_utf8_lossy(text)))
            }),
            _ => None,
        };
        decoded.unwrap_or_else(|| Self::Bytes(data.to_vec()))
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::Bool(b) => Some(i64::from(b)),
            Self::U8(v) => Some(i64::from(v)),
            Self::U16(v) => Some(i64::from(v)),
            Self::U32(v) => Some(i64::from(v)),
            Self::S8(v) => Some(i64::from(v)),
            Self::S16(v) => Some(i64::from(v)),
            Self::S32(v) => Some(i64::from(v)),
            Self::Str(_) | Self::Bytes(_) => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::U8(v) => write!(f, "{v}"),
            Self::U16(v) => write!(f, "{v}"),
            Self::U32(v) => write!(f, "{v}"),
            Self::S8(v) => write!(f, "{v}"),
            Self::S16(v) => write!(f, "{v}"),
            Self::S32(v) => write!(f, "{v}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Bytes(bytes) => {
                for b in bytes {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
        }
    }
}

/// Truncates `text` to the registry string bound on a char boundary.
pub(crate) fn bounded(text: &str) -> String {
    if text.len() <= REG_NAME_MAX_LEN {
        return text.to_string();
    }
    let mut end = REG_NAME_MAX_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}
