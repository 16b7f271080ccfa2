//! Cross-reference parsing helpers: the classical table line matcher, the
//! trailer-body scanner, and the binary row machinery used by
//! cross-reference streams (PNG unpredictor plus big-endian field unpack).

use crate::error::{ParseError, ParseResult};
use crate::types::ObjectKey;
use regex::bytes::Regex;
use std::sync::OnceLock;

/// Tail pattern `startxref <offset> ... %%EOF`. The whole buffer is
/// scanned and the match nearest EOF wins.
pub(crate) fn startxref_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\r?\nstartxref[\s]+([0-9]+)[\s]+%%EOF").unwrap())
}

fn table_line_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Subsection headers leave the flag empty; entry lines end with one of
    // the legal two-byte terminators (or a bare EOL).
    RE.get_or_init(|| Regex::new(r"^([0-9]+) ([0-9]+) ?([nf]?)(\r\n| ?\r| ?\n)").unwrap())
}

fn trailer_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Unicode mode is off so `.` matches arbitrary bytes, not just UTF-8.
    RE.get_or_init(|| Regex::new(r"(?s-u)trailer[\s]*<<(.*?)>>").unwrap())
}

/// Finds the `startxref` tail at or after `from`, returning the captured
/// offset. With `from == 0` the last match in the buffer wins.
pub(crate) fn find_startxref(data: &[u8], from: usize) -> Option<usize> {
    let region = data.get(from..)?;
    let capture = if from == 0 {
        startxref_pattern().captures_iter(region).last()?
    } else {
        startxref_pattern().captures(region)?
    };
    ascii_to_usize(capture.get(1)?.as_bytes())
}

fn ascii_to_usize(digits: &[u8]) -> Option<usize> {
    std::str::from_utf8(digits).ok()?.parse().ok()
}

/// One matched line of a classical xref table.
pub(crate) struct TableLine {
    pub first: u64,
    pub second: u64,
    pub flag: LineFlag,
    /// Bytes consumed by the match, terminator included.
    pub len: usize,
}

pub(crate) enum LineFlag {
    InUse,
    Free,
    /// No flag: a `first count` subsection header.
    Section,
}

/// Matches one table line exactly at the start of `input`.
pub(crate) fn match_table_line(input: &[u8]) -> Option<TableLine> {
    let caps = table_line_pattern().captures(input)?;
    let first = ascii_to_usize(caps.get(1)?.as_bytes())? as u64;
    let second = ascii_to_usize(caps.get(2)?.as_bytes())? as u64;
    let flag = match caps.get(3)?.as_bytes() {
        b"n" => LineFlag::InUse,
        b"f" => LineFlag::Free,
        _ => LineFlag::Section,
    };
    Some(TableLine {
        first,
        second,
        flag,
        len: caps.get(0)?.end(),
    })
}

/// Fields recovered from a classical trailer dictionary by simple
/// scanning. `prev` schedules the next chain step.
#[derive(Default)]
pub(crate) struct TrailerScan {
    pub size: Option<i64>,
    pub root: Option<ObjectKey>,
    pub info: Option<ObjectKey>,
    pub encrypt: Option<ObjectKey>,
    pub id: Option<[Vec<u8>; 2]>,
    pub prev: Option<usize>,
}

/// Locates `trailer << ... >>` at or after `from` and scans its body.
/// Returns `None` when no trailer dictionary exists there.
pub(crate) fn scan_trailer(data: &[u8], from: usize) -> Option<TrailerScan> {
    let region = data.get(from..)?;
    let caps = trailer_pattern().captures(region)?;
    let body = caps.get(1)?.as_bytes();

    static SIZE: OnceLock<Regex> = OnceLock::new();
    static PREV: OnceLock<Regex> = OnceLock::new();
    static ROOT: OnceLock<Regex> = OnceLock::new();
    static INFO: OnceLock<Regex> = OnceLock::new();
    static ENCRYPT: OnceLock<Regex> = OnceLock::new();
    static ID: OnceLock<Regex> = OnceLock::new();
    let size = SIZE.get_or_init(|| Regex::new(r"Size[\s]+([0-9]+)").unwrap());
    let prev = PREV.get_or_init(|| Regex::new(r"Prev[\s]+([0-9]+)").unwrap());
    let root = ROOT.get_or_init(|| Regex::new(r"Root[\s]+([0-9]+)[\s]+([0-9]+)[\s]+R").unwrap());
    let info = INFO.get_or_init(|| Regex::new(r"Info[\s]+([0-9]+)[\s]+([0-9]+)[\s]+R").unwrap());
    let encrypt =
        ENCRYPT.get_or_init(|| Regex::new(r"Encrypt[\s]+([0-9]+)[\s]+([0-9]+)[\s]+R").unwrap());
    let id = ID.get_or_init(|| {
        Regex::new(r"ID[\s]*\[[\s]*<([0-9A-Fa-f]*)>[\s]*<([0-9A-Fa-f]*)>").unwrap()
    });

    let key_of = |caps: &regex::bytes::Captures| -> Option<ObjectKey> {
        Some(ObjectKey::new(
            ascii_to_usize(caps.get(1)?.as_bytes())? as u32,
            ascii_to_usize(caps.get(2)?.as_bytes())? as u32,
        ))
    };

    Some(TrailerScan {
        size: size
            .captures(body)
            .and_then(|c| ascii_to_usize(c.get(1)?.as_bytes()))
            .map(|v| v as i64),
        root: root.captures(body).as_ref().and_then(key_of),
        info: info.captures(body).as_ref().and_then(key_of),
        encrypt: encrypt.captures(body).as_ref().and_then(key_of),
        id: id.captures(body).map(|c| {
            [
                c.get(1).map(|m| m.as_bytes().to_vec()).unwrap_or_default(),
                c.get(2).map(|m| m.as_bytes().to_vec()).unwrap_or_default(),
            ]
        }),
        prev: prev
            .captures(body)
            .and_then(|c| ascii_to_usize(c.get(1)?.as_bytes())),
    })
}

/// Undoes the PNG row predictor over `data`, viewed as rows of
/// `columns + 1` bytes whose leading byte selects the per-row predictor
/// (selector value plus 10). Returns the decoded rows.
pub(crate) fn png_unpredict(data: &[u8], columns: usize) -> ParseResult<Vec<Vec<u8>>> {
    let row_len = columns + 1;
    let mut rows: Vec<Vec<u8>> = Vec::with_capacity(data.len() / row_len);
    let mut chunks = data.chunks_exact(row_len);
    for chunk in &mut chunks {
        let selector = chunk[0] as u16 + 10;
        let cur = &chunk[1..];
        let mut out = vec![0u8; columns];
        for i in 0..columns {
            let left = if i > 0 { out[i - 1] } else { 0 };
            let (up, up_left) = match rows.last() {
                Some(prev) => (
                    prev[i],
                    if i > 0 { prev[i - 1] } else { 0 },
                ),
                None => (0, 0),
            };
            out[i] = match selector {
                10 => cur[i],
                11 => cur[i].wrapping_add(left),
                12 => cur[i].wrapping_add(up),
                13 => cur[i].wrapping_add(((left as u16 + up as u16) / 2) as u8),
                14 => cur[i].wrapping_add(paeth(left, up, up_left)),
                other => return Err(ParseError::UnknownPredictor(other)),
            };
        }
        rows.push(out);
    }
    if !chunks.remainder().is_empty() {
        return Err(ParseError::UnpackFailure(format!(
            "{} trailing bytes do not fill a predictor row of {}",
            chunks.remainder().len(),
            row_len
        )));
    }
    Ok(rows)
}

/// Paeth estimate; distance ties resolve left, then up, then up-left.
fn paeth(left: u8, up: u8, up_left: u8) -> u8 {
    let (a, b, c) = (left as i32, up as i32, up_left as i32);
    let p = a + b - c;
    let pa = (p - a).abs();
    let pb = (p - b).abs();
    let pc = (p - c).abs();
    if pa <= pb && pa <= pc {
        left
    } else if pb <= pc {
        up
    } else {
        up_left
    }
}

/// Splits undecoded (predictor-free) stream data into rows of `row_len`.
pub(crate) fn chunk_rows(data: &[u8], row_len: usize) -> ParseResult<Vec<Vec<u8>>> {
    if row_len == 0 {
        return Err(ParseError::UnpackFailure(
            "all cross-reference field widths are zero".to_string(),
        ));
    }
    let mut chunks = data.chunks_exact(row_len);
    let rows = (&mut chunks).map(<[u8]>::to_vec).collect();
    if !chunks.remainder().is_empty() {
        return Err(ParseError::UnpackFailure(format!(
            "{} trailing bytes do not fill a row of {}",
            chunks.remainder().len(),
            row_len
        )));
    }
    Ok(rows)
}

/// Reads the three big-endian fields of one row. A zero-width type field
/// defaults to 1 (in-use).
pub(crate) fn read_row_fields(row: &[u8], widths: [usize; 3]) -> ParseResult<[u64; 3]> {
    let needed: usize = widths.iter().sum();
    if row.len() < needed {
        return Err(ParseError::UnpackFailure(format!(
            "row of {} bytes is shorter than the declared field widths ({})",
            row.len(),
            needed
        )));
    }
    let mut fields = [0u64; 3];
    let mut at = 0;
    for (slot, width) in fields.iter_mut().zip(widths) {
        *slot = be_int(&row[at..at + width]);
        at += width;
    }
    if widths[0] == 0 {
        fields[0] = 1;
    }
    Ok(fields)
}

fn be_int(data: &[u8]) -> u64 {
    data.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}
