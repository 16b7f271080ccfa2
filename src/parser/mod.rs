pub mod lexer;
pub mod pdf_file;
pub mod tokenizer;
pub mod xref;

use crate::error::ParseResult;
use crate::types::{ObjectKey, RawValue, Xref};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Result of a successful parse: the merged cross-reference index and,
/// for every in-use uncompressed entry, the raw values of that indirect
/// object in parse order. Self-contained; the input buffer may be dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub xref: Xref,
    pub objects: IndexMap<ObjectKey, Vec<RawValue>>,
}

impl ParsedDocument {
    /// The parsed values of one indirect object, if it was materialized.
    pub fn object(&self, key: ObjectKey) -> Option<&[RawValue]> {
        self.objects.get(&key).map(Vec::as_slice)
    }
}

/// Session options; built through the [`PdfParser`] methods.
#[derive(Debug, Clone, Default)]
pub struct ParserOptions {
    pub ignore_filter_errors: bool,
}

/// Entry point of the crate.
///
/// ```
/// use pdf_raw::PdfParser;
///
/// let parser = PdfParser::new();
/// assert!(parser.parse_bytes(b"").is_err());
/// ```
pub struct PdfParser {
    options: ParserOptions,
}

impl PdfParser {
    pub fn new() -> Self {
        PdfParser {
            options: ParserOptions::default(),
        }
    }

    /// Tolerate stream filter failures: instead of aborting the parse,
    /// the affected stream keeps its undecoded bytes and reports the
    /// filters still pending on them.
    pub fn with_ignore_filter_errors(mut self, ignore: bool) -> Self {
        self.options.ignore_filter_errors = ignore;
        self
    }

    /// Parses a complete PDF byte buffer.
    pub fn parse_bytes(&self, data: &[u8]) -> ParseResult<ParsedDocument> {
        let parser = pdf_file::PdfFileParser::new(data, self.options.clone())?;
        parser.parse()
    }
}

impl Default for PdfParser {
    fn default() -> Self {
        Self::new()
    }
}
