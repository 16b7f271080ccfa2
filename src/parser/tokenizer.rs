//! Raw-object tokenizer.
//!
//! Walks the byte buffer from a given offset and emits one tagged value
//! per call. Payloads are raw byte spans; escape sequences in literal
//! strings and `#`-sequences in names are left for consumers. Every value
//! carries the offset at which parsing stopped; a value whose end equals
//! the requested offset consumed nothing, which callers use as the stall
//! signal on malformed input.

use crate::parser::lexer::{self, is_regular_char, is_whitespace};
use crate::types::{RawKind, RawStream, RawValue};

/// Window applied when matching `N G R` / `N G obj` at the cursor.
const REF_WINDOW: usize = 33;
/// Longest name payload the tokenizer will consume.
const MAX_NAME_LEN: usize = 255;

/// Tokenizes the next raw value starting at `offset`.
pub fn next_raw_value(data: &[u8], offset: usize) -> RawValue {
    let mut pos = offset;
    while pos < data.len() && is_whitespace(data[pos]) {
        pos += 1;
    }
    if pos >= data.len() {
        return RawValue::new(RawKind::Null, offset);
    }

    match data[pos] {
        b'%' => {
            while pos < data.len() && data[pos] != b'\r' && data[pos] != b'\n' {
                pos += 1;
            }
            next_raw_value(data, pos)
        }
        b'/' => name_at(data, pos),
        b'(' => literal_at(data, pos),
        b'<' if data.get(pos + 1) == Some(&b'<') => dict_at(data, pos),
        b'<' => hex_at(data, pos),
        b'[' => array_at(data, pos),
        b']' => RawValue::new(RawKind::EndArray, pos + 1),
        b')' => RawValue::new(RawKind::EndLiteral, pos + 1),
        b'>' if data.get(pos + 1) == Some(&b'>') => RawValue::new(RawKind::EndDict, pos + 2),
        b'>' => RawValue::new(RawKind::EndHex, pos + 1),
        _ => keyword_or_number_at(data, pos, offset),
    }
}

fn name_at(data: &[u8], start: usize) -> RawValue {
    let mut pos = start + 1;
    let limit = (pos + MAX_NAME_LEN).min(data.len());
    while pos < limit && is_regular_char(data[pos]) {
        pos += 1;
    }
    RawValue::new(RawKind::Name(data[start + 1..pos].to_vec()), pos)
}

fn literal_at(data: &[u8], start: usize) -> RawValue {
    let body = start + 1;
    let mut pos = body;
    let mut depth = 1usize;
    while pos < data.len() {
        match data[pos] {
            // The escape byte skips the following byte for balance
            // counting only; both stay in the payload.
            b'\\' => {
                pos += 2;
                continue;
            }
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            _ => {}
        }
        pos += 1;
    }
    let close = pos.min(data.len());
    let end = if pos < data.len() { pos + 1 } else { data.len() };
    RawValue::new(RawKind::Literal(data[body..close].to_vec()), end)
}

fn hex_at(data: &[u8], start: usize) -> RawValue {
    let mut pos = start + 1;
    while pos < data.len() && (data[pos].is_ascii_hexdigit() || is_whitespace(data[pos])) {
        pos += 1;
    }
    if pos > start + 1 && data.get(pos) == Some(&b'>') {
        let digits: Vec<u8> = data[start + 1..pos]
            .iter()
            .copied()
            .filter(u8::is_ascii_hexdigit)
            .collect();
        return RawValue::new(RawKind::Hex(digits), pos + 1);
    }
    // Not a hex body; skip to the next '>' and emit an empty payload.
    let end = match lexer::find_subsequence(data, b">", start + 1) {
        Some(gt) => gt + 1,
        None => data.len(),
    };
    RawValue::new(RawKind::Hex(Vec::new()), end)
}

fn array_at(data: &[u8], start: usize) -> RawValue {
    let (items, end) = collect_children(data, start + 1, |kind| {
        matches!(kind, RawKind::EndArray)
    });
    RawValue::new(RawKind::Array(items), end)
}

fn dict_at(data: &[u8], start: usize) -> RawValue {
    let (items, end) = collect_children(data, start + 2, |kind| {
        matches!(kind, RawKind::EndDict)
    });
    RawValue::new(RawKind::Dict(items), end)
}

/// Collects child values until the closing sentinel, which is consumed and
/// dropped. An unterminated container ends where the input stops making
/// progress.
fn collect_children(
    data: &[u8],
    mut pos: usize,
    is_close: fn(&RawKind) -> bool,
) -> (Vec<RawValue>, usize) {
    let mut items = Vec::new();
    loop {
        let value = next_raw_value(data, pos);
        if value.end == pos {
            break;
        }
        let end = value.end;
        if is_close(&value.kind) {
            pos = end;
            break;
        }
        pos = end;
        items.push(value);
    }
    (items, pos)
}

fn keyword_or_number_at(data: &[u8], pos: usize, requested: usize) -> RawValue {
    let rest = &data[pos..];
    if rest.starts_with(b"endobj") {
        return RawValue::new(RawKind::EndObj, pos + 6);
    }
    if rest.starts_with(b"endstream") {
        return RawValue::new(RawKind::EndStream, pos + 9);
    }
    if rest.starts_with(b"null") {
        return RawValue::new(RawKind::Null, pos + 4);
    }
    if rest.starts_with(b"true") {
        return RawValue::new(RawKind::Boolean(true), pos + 4);
    }
    if rest.starts_with(b"false") {
        return RawValue::new(RawKind::Boolean(false), pos + 5);
    }
    if rest.starts_with(b"stream") {
        return stream_at(data, pos);
    }

    let window = &rest[..rest.len().min(REF_WINDOW)];
    if let Ok((tail, key)) = lexer::object_reference(window) {
        return RawValue::new(RawKind::Reference(key), pos + (window.len() - tail.len()));
    }
    if let Ok((tail, key)) = lexer::object_header(window) {
        return RawValue::new(RawKind::ObjectHeader(key), pos + (window.len() - tail.len()));
    }
    if let Ok((_, span)) = lexer::numeric_span(rest) {
        return RawValue::new(RawKind::Numeric(span.to_vec()), pos + span.len());
    }

    // Unrecognized byte: report no progress.
    RawValue::new(RawKind::Null, requested)
}

fn stream_at(data: &[u8], start: usize) -> RawValue {
    let mut body = start + 6;
    if data.get(body) == Some(&b'\r') {
        body += 1;
    }
    if data.get(body) == Some(&b'\n') {
        body += 1;
    }
    // The body runs to the nearest `endstream` that is followed by a
    // whitespace byte (or the end of the buffer); the cursor parks just
    // before the keyword so it is tokenized next.
    let mut search = body;
    let end = loop {
        match lexer::find_subsequence(data, b"endstream", search) {
            Some(at) => match data.get(at + b"endstream".len()) {
                None => break at,
                Some(&c) if is_whitespace(c) => break at,
                Some(_) => search = at + b"endstream".len(),
            },
            None => break data.len(),
        }
    };
    RawValue::new(
        RawKind::Stream(RawStream::new(data[body..end].to_vec())),
        end,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(data: &[u8]) -> RawKind {
        next_raw_value(data, 0).kind
    }

    #[test]
    fn test_leading_whitespace_and_comments() {
        let value = next_raw_value(b"  % intro\n  /Name", 0);
        assert_eq!(value.kind, RawKind::Name(b"Name".to_vec()));
        assert_eq!(value.end, 17);
    }

    #[test]
    fn test_name_terminates_on_delimiter() {
        let value = next_raw_value(b"/Type/Catalog", 0);
        assert_eq!(value.kind, RawKind::Name(b"Type".to_vec()));
        assert_eq!(value.end, 5);
    }

    #[test]
    fn test_empty_name() {
        let value = next_raw_value(b"/ 1", 0);
        assert_eq!(value.kind, RawKind::Name(Vec::new()));
        assert_eq!(value.end, 1);
    }

    #[test]
    fn test_literal_balance_and_escapes() {
        assert_eq!(kind(b"(a(b)c)"), RawKind::Literal(b"a(b)c".to_vec()));
        assert_eq!(kind(br"(a\)b)"), RawKind::Literal(br"a\)b".to_vec()));
    }

    #[test]
    fn test_unterminated_literal() {
        let value = next_raw_value(b"(open", 0);
        assert_eq!(value.kind, RawKind::Literal(b"open".to_vec()));
        assert_eq!(value.end, 5);
    }

    #[test]
    fn test_hex_and_malformed_hex() {
        assert_eq!(kind(b"<4A6F>"), RawKind::Hex(b"4A6F".to_vec()));
        // Garbage between the angle brackets: skip to the closing '>'.
        let value = next_raw_value(b"<zz>1", 0);
        assert_eq!(value.kind, RawKind::Hex(Vec::new()));
        assert_eq!(value.end, 4);
    }

    #[test]
    fn test_keywords() {
        assert_eq!(kind(b"true "), RawKind::Boolean(true));
        assert_eq!(kind(b"false "), RawKind::Boolean(false));
        assert_eq!(kind(b"null "), RawKind::Null);
        assert_eq!(kind(b"endobj"), RawKind::EndObj);
        assert_eq!(kind(b"endstream "), RawKind::EndStream);
    }

    #[test]
    fn test_numeric_spans() {
        assert_eq!(kind(b"612 "), RawKind::Numeric(b"612".to_vec()));
        assert_eq!(kind(b"-0.5]"), RawKind::Numeric(b"-0.5".to_vec()));
    }

    #[test]
    fn test_stall_on_unknown_byte() {
        let value = next_raw_value(b"{", 0);
        assert_eq!(value.end, 0);
    }

    #[test]
    fn test_stream_body_spans_to_endstream() {
        let data = b"stream\nBODY BYTES\nendstream endobj";
        let value = next_raw_value(data, 0);
        match value.kind {
            RawKind::Stream(stream) => assert_eq!(stream.raw, b"BODY BYTES\n"),
            other => panic!("expected stream, got {:?}", other),
        }
        // The cursor parks just before the keyword.
        assert_eq!(&data[value.end..value.end + 9], b"endstream");
    }

    #[test]
    fn test_stream_skips_endstream_without_following_whitespace() {
        let data = b"stream\nxxendstreamyy endstream\n";
        let value = next_raw_value(data, 0);
        match value.kind {
            RawKind::Stream(stream) => assert_eq!(stream.raw, b"xxendstreamyy "),
            other => panic!("expected stream, got {:?}", other),
        }
    }
}
