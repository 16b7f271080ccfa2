//! Low-level PDF structure parsing: a raw-object tokenizer, a
//! cross-reference resolver, and an indirect-object materializer over a
//! caller-supplied byte buffer.
//!
//! The crate decodes the skeleton of a PDF file — the cross-reference
//! index (classical tables and cross-reference streams, following
//! incremental-update `Prev` chains), the trailer, and the raw value tree
//! of every addressable indirect object, with stream payloads run through
//! the filter pipeline. Payload bytes are handed back unprocessed:
//! literal-string escapes, name `#`-sequences, and numeric spans are left
//! for consumers to interpret.
//!
//! Rendering, content-stream interpretation, and decryption are out of
//! scope.
//!
//! Licensed under the GNU General Public License v3.0.
//! See LICENSE file for details

/// Parse error kinds and result alias.
pub mod error;
/// Stream filters (compression and encoding pipelines).
pub mod filters;
/// Tokenizer, cross-reference resolver, and parse session.
pub mod parser;
/// Raw value tree, object keys, and cross-reference records.
pub mod types;

pub use error::{ParseError, ParseResult};
pub use filters::{FilterError, FilterResult};
pub use parser::{ParsedDocument, PdfParser};
pub use types::{
    DecodedStream, ObjectKey, RawKind, RawStream, RawValue, Trailer, Xref, XrefEntry, XrefKey,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_types() {
        let key = ObjectKey::new(1, 0);
        assert_eq!(key.to_string(), "1_0");

        let value = RawValue::new(RawKind::Numeric(b"42".to_vec()), 2);
        assert_eq!(value.as_int(), Some(42));
        assert_eq!(value.end, 2);
    }

    #[test]
    fn test_empty_input_is_rejected() {
        match PdfParser::new().parse_bytes(b"") {
            Err(ParseError::EmptyData) => {}
            other => panic!("expected EmptyData, got {:?}", other),
        }
    }

    #[test]
    fn test_header_is_required() {
        match PdfParser::new().parse_bytes(b"not a pdf at all") {
            Err(ParseError::HeaderMissing) => {}
            other => panic!("expected HeaderMissing, got {:?}", other),
        }
    }
}
