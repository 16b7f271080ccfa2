use crate::types::ObjectKey;
use nom::{
    bytes::complete::{tag, take_while1},
    character::complete::digit1,
    combinator::map_res,
    sequence::tuple,
    IResult,
};

pub fn is_whitespace(c: u8) -> bool {
    matches!(c, b'\0' | b'\t' | b'\n' | b'\x0C' | b'\r' | b' ')
}

pub fn is_delimiter(c: u8) -> bool {
    matches!(
        c,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

pub fn is_regular_char(c: u8) -> bool {
    !is_whitespace(c) && !is_delimiter(c)
}

/// Characters a numeric span is made of. Sign and dot may appear anywhere
/// in the run; the consumer decides between integer and real.
pub fn is_numeric_char(c: u8) -> bool {
    matches!(c, b'0'..=b'9' | b'+' | b'-' | b'.')
}

fn unsigned(input: &[u8]) -> IResult<&[u8], u32> {
    map_res(digit1, |s: &[u8]| {
        std::str::from_utf8(s).unwrap().parse::<u32>()
    })(input)
}

fn whitespace1(input: &[u8]) -> IResult<&[u8], &[u8]> {
    take_while1(is_whitespace)(input)
}

/// Matches an indirect reference `N G R` at the start of the input.
pub fn object_reference(input: &[u8]) -> IResult<&[u8], ObjectKey> {
    let (input, (number, _, generation, _, _)) =
        tuple((unsigned, whitespace1, unsigned, whitespace1, tag(b"R")))(input)?;
    Ok((input, ObjectKey::new(number, generation)))
}

/// Matches an indirect-object header `N G obj` at the start of the input.
pub fn object_header(input: &[u8]) -> IResult<&[u8], ObjectKey> {
    let (input, (number, _, generation, _, _)) =
        tuple((unsigned, whitespace1, unsigned, whitespace1, tag(b"obj")))(input)?;
    Ok((input, ObjectKey::new(number, generation)))
}

/// Longest run of numeric span characters at the start of the input.
pub fn numeric_span(input: &[u8]) -> IResult<&[u8], &[u8]> {
    take_while1(is_numeric_char)(input)
}

/// First occurrence of `needle` in `haystack` at or after `from`.
pub fn find_subsequence(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() || needle.is_empty() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|pos| pos + from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_character_classes() {
        for c in [0x00, 0x09, 0x0A, 0x0C, 0x0D, 0x20] {
            assert!(is_whitespace(c));
        }
        assert!(!is_whitespace(b'a'));
        assert!(is_delimiter(b'('));
        assert!(is_delimiter(b'%'));
        assert!(is_regular_char(b'R'));
        assert!(!is_regular_char(b'['));
    }

    #[test]
    fn test_object_reference() {
        let (rest, key) = object_reference(b"12 0 R tail").unwrap();
        assert_eq!(key, ObjectKey::new(12, 0));
        assert_eq!(rest, b" tail");

        assert!(object_reference(b"12 0 obj").is_err());
        assert!(object_reference(b"R").is_err());
    }

    #[test]
    fn test_object_header() {
        let (_, key) = object_header(b"3 17 obj").unwrap();
        assert_eq!(key, ObjectKey::new(3, 17));
        assert!(object_header(b"3 17 R").is_err());
    }

    #[test]
    fn test_numeric_span() {
        let (rest, span) = numeric_span(b"-12.5]").unwrap();
        assert_eq!(span, b"-12.5");
        assert_eq!(rest, b"]");
        assert!(numeric_span(b"abc").is_err());
    }

    #[test]
    fn test_find_subsequence() {
        let data = b"aa endstream bb endstream";
        assert_eq!(find_subsequence(data, b"endstream", 0), Some(3));
        assert_eq!(find_subsequence(data, b"endstream", 4), Some(16));
        assert_eq!(find_subsequence(data, b"endstream", 17), None);
    }
}
