use crate::error::ParseError;
use crate::types::ObjectKey;
use indexmap::IndexMap;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Key of one cross-reference entry.
///
/// Uncompressed objects are addressed by `(number, generation)`. Objects
/// held inside an object stream are addressed by the stream's object
/// number and the index within it; such entries carry no byte offset of
/// their own. Displays as `"num_gen"` / `"stream_0_index"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum XrefKey {
    Object(ObjectKey),
    InStream { stream: u32, index: u32 },
}

impl fmt::Display for XrefKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XrefKey::Object(key) => write!(f, "{}", key),
            XrefKey::InStream { stream, index } => write!(f, "{}_0_{}", stream, index),
        }
    }
}

impl FromStr for XrefKey {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('_').collect();
        let int = |p: &str| {
            p.parse::<u32>()
                .map_err(|_| ParseError::InvalidReference(s.to_string()))
        };
        match parts.as_slice() {
            [num, gen] => Ok(XrefKey::Object(ObjectKey::new(int(*num)?, int(*gen)?))),
            [stream, zero, index] if *zero == "0" => Ok(XrefKey::InStream {
                stream: int(*stream)?,
                index: int(*index)?,
            }),
            _ => Err(ParseError::InvalidReference(s.to_string())),
        }
    }
}

impl From<ObjectKey> for XrefKey {
    fn from(key: ObjectKey) -> Self {
        XrefKey::Object(key)
    }
}

impl Serialize for XrefKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for XrefKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

/// One cross-reference entry: either a byte offset into the buffer, or the
/// marker for an object stored in an object stream (whose coordinates live
/// in the `XrefKey::InStream` key).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum XrefEntry {
    Offset(u64),
    Compressed,
}

impl XrefEntry {
    pub fn offset(&self) -> Option<u64> {
        match self {
            XrefEntry::Offset(offset) => Some(*offset),
            XrefEntry::Compressed => None,
        }
    }
}

/// Document-wide pointers gathered from the trailer dictionary (or from an
/// xref stream's own dictionary). The first cross-reference section
/// encountered, the one nearest EOF, owns these; `Prev` sections only
/// contribute object entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trailer {
    pub size: Option<i64>,
    pub root: Option<ObjectKey>,
    pub info: Option<ObjectKey>,
    pub encrypt: Option<ObjectKey>,
    pub id: Option<[Vec<u8>; 2]>,
}

/// The merged cross-reference index of a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Xref {
    /// Entries in the order they were first seen, walking from the section
    /// nearest EOF backwards through the `Prev` chain. First insertion
    /// wins; later sections never overwrite an entry.
    pub entries: IndexMap<XrefKey, XrefEntry>,
    pub trailer: Trailer,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_spelling() {
        let plain = XrefKey::Object(ObjectKey::new(4, 1));
        assert_eq!(plain.to_string(), "4_1");
        assert_eq!("4_1".parse::<XrefKey>().unwrap(), plain);

        let packed = XrefKey::InStream { stream: 9, index: 3 };
        assert_eq!(packed.to_string(), "9_0_3");
        assert_eq!("9_0_3".parse::<XrefKey>().unwrap(), packed);
    }

    #[test]
    fn test_instream_middle_component_must_be_zero() {
        assert!("9_1_3".parse::<XrefKey>().is_err());
    }

    #[test]
    fn test_entry_offset() {
        assert_eq!(XrefEntry::Offset(17).offset(), Some(17));
        assert_eq!(XrefEntry::Compressed.offset(), None);
    }
}
