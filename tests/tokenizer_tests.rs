//! Lexical behavior of the raw-object tokenizer.

use pdf_raw::parser::tokenizer::next_raw_value;
use pdf_raw::types::{ObjectKey, RawKind, RawValue};

fn tokenize_all(data: &[u8]) -> Vec<RawValue> {
    let mut values = Vec::new();
    let mut offset = 0;
    loop {
        let value = next_raw_value(data, offset);
        if value.end == offset {
            break;
        }
        offset = value.end;
        values.push(value);
    }
    values
}

#[test]
fn test_literal_keeps_escape_bytes() {
    let value = next_raw_value(br"(a\(b\)c)", 0);
    assert_eq!(value.kind, RawKind::Literal(br"a\(b\)c".to_vec()));
    assert_eq!(value.end, 9);
}

#[test]
fn test_literal_nested_parentheses() {
    let value = next_raw_value(b"(outer (inner) tail)", 0);
    assert_eq!(
        value.kind,
        RawKind::Literal(b"outer (inner) tail".to_vec())
    );
}

#[test]
fn test_hex_string_drops_whitespace() {
    let value = next_raw_value(b"<4A 6F>", 0);
    assert_eq!(value.kind, RawKind::Hex(b"4A6F".to_vec()));
    assert_eq!(value.end, 7);
}

#[test]
fn test_hex_string_odd_nibble_tolerated() {
    let value = next_raw_value(b"<4A6>", 0);
    assert_eq!(value.kind, RawKind::Hex(b"4A6".to_vec()));
}

#[test]
fn test_name_keeps_hash_sequences() {
    let value = next_raw_value(b"/A#20B ", 0);
    assert_eq!(value.kind, RawKind::Name(b"A#20B".to_vec()));
    assert_eq!(value.end, 6);
}

#[test]
fn test_dictionary_children_alternate_by_position() {
    let value = next_raw_value(b"<< /Type /Catalog /Pages 2 0 R >>", 0);
    let items = value.as_dict().expect("dict");
    assert_eq!(items.len(), 4);
    assert_eq!(items[0].as_name(), Some(&b"Type"[..]));
    assert_eq!(items[1].as_name(), Some(&b"Catalog"[..]));
    assert_eq!(items[2].as_name(), Some(&b"Pages"[..]));
    assert_eq!(items[3].as_reference(), Some(ObjectKey::new(2, 0)));
    assert_eq!(value.end, 33);
}

#[test]
fn test_nested_containers() {
    let value = next_raw_value(b"[1 [2 3] << /K (v) >>]", 0);
    let items = value.as_array().expect("array");
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].as_int(), Some(1));
    let inner = items[1].as_array().expect("inner array");
    assert_eq!(inner.len(), 2);
    let dict = items[2].as_dict().expect("inner dict");
    assert_eq!(dict[1].kind, RawKind::Literal(b"v".to_vec()));
}

#[test]
fn test_reference_and_header_disambiguation() {
    let reference = next_raw_value(b"12 0 R", 0);
    assert_eq!(reference.kind, RawKind::Reference(ObjectKey::new(12, 0)));

    let header = next_raw_value(b"12 0 obj", 0);
    assert_eq!(header.kind, RawKind::ObjectHeader(ObjectKey::new(12, 0)));

    // Two bare numbers stay numbers.
    let values = tokenize_all(b"12 13");
    assert_eq!(values[0].kind, RawKind::Numeric(b"12".to_vec()));
    assert_eq!(values[1].kind, RawKind::Numeric(b"13".to_vec()));
}

#[test]
fn test_comment_skipped_between_values() {
    let values = tokenize_all(b"1 % trailing comment\n2");
    assert_eq!(values[0].kind, RawKind::Numeric(b"1".to_vec()));
    assert_eq!(values[1].kind, RawKind::Numeric(b"2".to_vec()));
}

#[test]
fn test_object_body_sequence() {
    let values = tokenize_all(b"<< /Length 4 >>\nstream\nDATA\nendstream\nendobj");
    assert_eq!(values.len(), 4);
    assert!(values[0].as_dict().is_some());
    match &values[1].kind {
        RawKind::Stream(stream) => assert_eq!(stream.raw, b"DATA\n"),
        other => panic!("expected stream, got {:?}", other),
    }
    assert_eq!(values[2].kind, RawKind::EndStream);
    assert_eq!(values[3].kind, RawKind::EndObj);
}

#[test]
fn test_stream_with_crlf_after_keyword() {
    let values = tokenize_all(b"stream\r\nXY\nendstream ");
    match &values[0].kind {
        RawKind::Stream(stream) => assert_eq!(stream.raw, b"XY\n"),
        other => panic!("expected stream, got {:?}", other),
    }
}

#[test]
fn test_offsets_strictly_advance() {
    let data = b"<< /A [1 2 (x)] /B <AF> >> 7 0 R null";
    let mut offset = 0;
    loop {
        let value = next_raw_value(data, offset);
        if value.end == offset {
            break;
        }
        assert!(value.end > offset, "offset went backwards at {}", offset);
        offset = value.end;
    }
    assert_eq!(offset, data.len());
}

#[test]
fn test_unterminated_dictionary_stops_at_end() {
    let value = next_raw_value(b"<< /Open true", 0);
    let items = value.as_dict().expect("dict");
    assert_eq!(items.len(), 2);
    assert_eq!(value.end, 13);
}
