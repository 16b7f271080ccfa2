use crate::error::ParseError;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Identifier of an indirect object: object number plus generation.
///
/// Displays as the underscore-joined form (`"12_0"`) used throughout the
/// cross-reference index and in serialized output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub number: u32,
    pub generation: u32,
}

impl ObjectKey {
    pub fn new(number: u32, generation: u32) -> Self {
        ObjectKey { number, generation }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.number, self.generation)
    }
}

impl FromStr for ObjectKey {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (num, gen) = s
            .split_once('_')
            .ok_or_else(|| ParseError::InvalidReference(s.to_string()))?;
        let number = num
            .parse::<u32>()
            .map_err(|_| ParseError::InvalidReference(s.to_string()))?;
        // u32 parsing ignores leading zeros, so "7_00" reads as generation 0.
        let generation = gen
            .parse::<u32>()
            .map_err(|_| ParseError::InvalidReference(s.to_string()))?;
        Ok(ObjectKey { number, generation })
    }
}

impl From<(u32, u32)> for ObjectKey {
    fn from((number, generation): (u32, u32)) -> Self {
        ObjectKey::new(number, generation)
    }
}

impl Serialize for ObjectKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ObjectKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_roundtrip() {
        let key = ObjectKey::new(12, 0);
        assert_eq!(key.to_string(), "12_0");
        assert_eq!("12_0".parse::<ObjectKey>().unwrap(), key);
    }

    #[test]
    fn test_leading_zero_generation() {
        assert_eq!(
            "7_00".parse::<ObjectKey>().unwrap(),
            ObjectKey::new(7, 0)
        );
    }

    #[test]
    fn test_malformed_key_rejected() {
        assert!("12".parse::<ObjectKey>().is_err());
        assert!("a_b".parse::<ObjectKey>().is_err());
        assert!("12_".parse::<ObjectKey>().is_err());
    }
}
