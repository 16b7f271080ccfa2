use crate::types::ObjectKey;
use serde::{Deserialize, Serialize};

/// One value produced by the raw-object tokenizer.
///
/// `end` is the buffer offset at which parsing of this value stopped; a
/// value whose `end` equals the offset it was requested at consumed
/// nothing, which callers treat as the stall signal on malformed input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawValue {
    pub kind: RawKind,
    pub end: usize,
}

impl RawValue {
    pub fn new(kind: RawKind, end: usize) -> Self {
        RawValue { kind, end }
    }

    pub fn as_name(&self) -> Option<&[u8]> {
        match &self.kind {
            RawKind::Name(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[RawValue]> {
        match &self.kind {
            RawKind::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&[RawValue]> {
        match &self.kind {
            RawKind::Dict(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<ObjectKey> {
        match &self.kind {
            RawKind::Reference(key) => Some(*key),
            _ => None,
        }
    }

    /// Numeric payloads are kept as raw byte spans and coerced here, at
    /// consumption time. Reals are truncated toward zero.
    pub fn as_int(&self) -> Option<i64> {
        match &self.kind {
            RawKind::Numeric(span) => {
                let text = std::str::from_utf8(span).ok()?;
                text.parse::<i64>()
                    .ok()
                    .or_else(|| text.parse::<f64>().ok().map(|r| r as i64))
            }
            _ => None,
        }
    }
}

/// The tagged sum emitted by the tokenizer.
///
/// Payloads are the raw bytes from the buffer: literal strings keep their
/// escape bytes, hex strings keep their digits (whitespace stripped), names
/// keep `#`-sequences, numerics keep the matched span. Interpreting any of
/// these further is a consumer concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawKind {
    Name(Vec<u8>),
    Literal(Vec<u8>),
    Hex(Vec<u8>),
    Numeric(Vec<u8>),
    Boolean(bool),
    Null,
    Array(Vec<RawValue>),
    Dict(Vec<RawValue>),
    Reference(ObjectKey),
    ObjectHeader(ObjectKey),
    EndObj,
    Stream(RawStream),
    EndStream,
    EndArray,
    EndDict,
    EndHex,
    EndLiteral,
}

/// A stream body: the undecoded bytes between the `stream` keyword's EOL
/// and the closing `endstream`, plus the decode result when the
/// materializer ran the filter pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawStream {
    pub raw: Vec<u8>,
    pub decoded: Option<DecodedStream>,
}

impl RawStream {
    pub fn new(raw: Vec<u8>) -> Self {
        RawStream { raw, decoded: None }
    }
}

/// Outcome of running a stream through the filter pipeline.
///
/// On success `residual_filters` is empty. When filter failures are being
/// tolerated, `data` holds the bytes that were handed to the pipeline and
/// `residual_filters` names the filters still pending on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedStream {
    pub data: Vec<u8>,
    pub residual_filters: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_coercion() {
        let int = RawValue::new(RawKind::Numeric(b"42".to_vec()), 0);
        assert_eq!(int.as_int(), Some(42));

        let real = RawValue::new(RawKind::Numeric(b"12.9".to_vec()), 0);
        assert_eq!(real.as_int(), Some(12));

        let signed = RawValue::new(RawKind::Numeric(b"-7".to_vec()), 0);
        assert_eq!(signed.as_int(), Some(-7));

        let junk = RawValue::new(RawKind::Numeric(b"..".to_vec()), 0);
        assert_eq!(junk.as_int(), None);
    }

    #[test]
    fn test_accessors() {
        let name = RawValue::new(RawKind::Name(b"Filter".to_vec()), 0);
        assert_eq!(name.as_name(), Some(&b"Filter"[..]));
        assert!(name.as_dict().is_none());

        let reference = RawValue::new(RawKind::Reference(ObjectKey::new(3, 0)), 0);
        assert_eq!(reference.as_reference(), Some(ObjectKey::new(3, 0)));
    }
}
