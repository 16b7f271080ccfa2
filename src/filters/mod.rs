//! Stream filter pipeline.
//!
//! The parser core hands this module a list of filter names and the raw
//! stream bytes; filters are applied in declared order. Predictor
//! post-processing is not handled here.

use flate2::read::ZlibDecoder;
use std::io::Read;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("unsupported filter: {0}")]
    Unsupported(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("decompression error: {0}")]
    Decompression(String),
}

pub type FilterResult<T> = Result<T, FilterError>;

/// Applies every named filter in order and returns the decoded bytes.
pub fn decode_all(filters: &[String], data: &[u8]) -> FilterResult<Vec<u8>> {
    let mut result = data.to_vec();
    for name in filters {
        result = decode_one(name, &result)?;
    }
    Ok(result)
}

fn decode_one(name: &str, data: &[u8]) -> FilterResult<Vec<u8>> {
    match name {
        "FlateDecode" | "Fl" => decode_flate(data),
        "LZWDecode" | "LZW" => decode_lzw(data),
        "ASCIIHexDecode" | "AHx" => decode_ascii_hex(data),
        "ASCII85Decode" | "A85" => decode_ascii85(data),
        "RunLengthDecode" | "RL" => decode_run_length(data),
        other => Err(FilterError::Unsupported(other.to_string())),
    }
}

fn decode_flate(data: &[u8]) -> FilterResult<Vec<u8>> {
    // Zlib-wrapped first; some producers emit headerless deflate.
    inflate(ZlibDecoder::new(data)).or_else(|zlib_err| {
        inflate(flate2::read::DeflateDecoder::new(data))
            .map_err(|_| FilterError::Decompression(format!("flate decode error: {}", zlib_err)))
    })
}

fn inflate<R: Read>(mut reader: R) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    reader.read_to_end(&mut out)?;
    Ok(out)
}

fn decode_lzw(data: &[u8]) -> FilterResult<Vec<u8>> {
    // PDF writers default to early code-size changes; fall back to the
    // plain variant for streams that do not use them.
    let mut early = lzw::DecoderEarlyChange::new(lzw::MsbReader::new(), 8);
    drain_lzw(data, |chunk, out| {
        let (used, bytes) = early.decode_bytes(chunk)?;
        out.extend_from_slice(bytes);
        Ok(used)
    })
    .or_else(|early_err| {
        let mut plain = lzw::Decoder::new(lzw::MsbReader::new(), 8);
        drain_lzw(data, |chunk, out| {
            let (used, bytes) = plain.decode_bytes(chunk)?;
            out.extend_from_slice(bytes);
            Ok(used)
        })
        .map_err(|plain_err| {
            FilterError::Decompression(format!(
                "LZW decode error (early-change: {}, plain: {})",
                early_err, plain_err
            ))
        })
    })
}

/// Feeds `data` through `step` until the input is exhausted or `step`
/// stops consuming; `step` appends its decoded bytes to the output and
/// reports how much input it took.
fn drain_lzw<F>(data: &[u8], mut step: F) -> std::io::Result<Vec<u8>>
where
    F: FnMut(&[u8], &mut Vec<u8>) -> std::io::Result<usize>,
{
    let mut out = Vec::new();
    let mut rest = data;
    while !rest.is_empty() {
        let used = step(rest, &mut out)?;
        if used == 0 {
            break;
        }
        rest = &rest[used..];
    }
    Ok(out)
}

fn decode_ascii_hex(data: &[u8]) -> FilterResult<Vec<u8>> {
    let mut out = Vec::new();
    let mut high: Option<u8> = None;

    for &byte in data {
        if byte == b'>' {
            break;
        }
        if byte.is_ascii_whitespace() {
            continue;
        }
        let nibble = match (byte as char).to_digit(16) {
            Some(value) => value as u8,
            None => {
                return Err(FilterError::InvalidData(format!(
                    "byte {:#04x} is not a hex digit",
                    byte
                )))
            }
        };
        match high.take() {
            Some(first) => out.push((first << 4) | nibble),
            None => high = Some(nibble),
        }
    }

    // An odd trailing nibble pads with zero.
    if let Some(first) = high {
        out.push(first << 4);
    }
    Ok(out)
}

fn decode_ascii85(data: &[u8]) -> FilterResult<Vec<u8>> {
    let mut out = Vec::new();
    let mut group = [0u8; 5];
    let mut filled = 0usize;

    for &byte in data {
        match byte {
            b'~' => break,
            // The all-zero shortcut is only legal between groups.
            b'z' if filled == 0 => out.extend_from_slice(&[0; 4]),
            b'!'..=b'u' => {
                group[filled] = byte - b'!';
                filled += 1;
                if filled == 5 {
                    flush_base85_group(&group, 5, &mut out);
                    filled = 0;
                }
            }
            _ if byte.is_ascii_whitespace() => {}
            _ => {
                return Err(FilterError::InvalidData(format!(
                    "byte {:#04x} is not valid ASCII85",
                    byte
                )))
            }
        }
    }

    if filled > 0 {
        for slot in group.iter_mut().skip(filled) {
            *slot = 84;
        }
        flush_base85_group(&group, filled, &mut out);
    }
    Ok(out)
}

/// Expands one base-85 group. A final short group of `filled` digits
/// (padded to five with the highest digit) contributes `filled - 1` bytes.
fn flush_base85_group(group: &[u8; 5], filled: usize, out: &mut Vec<u8>) {
    let mut word = 0u32;
    for &digit in group {
        word = word.wrapping_mul(85).wrapping_add(digit as u32);
    }
    let take = if filled == 5 { 4 } else { filled - 1 };
    out.extend_from_slice(&word.to_be_bytes()[..take]);
}

fn decode_run_length(data: &[u8]) -> FilterResult<Vec<u8>> {
    let mut out = Vec::new();
    let mut rest = data;
    loop {
        match rest {
            [] | [128, ..] => return Ok(out),
            [n, tail @ ..] if *n < 128 => {
                let take = *n as usize + 1;
                if tail.len() < take {
                    return Err(FilterError::InvalidData(
                        "run-length literal run past end of data".to_string(),
                    ));
                }
                out.extend_from_slice(&tail[..take]);
                rest = &tail[take..];
            }
            [n, byte, tail @ ..] => {
                out.resize(out.len() + 257 - *n as usize, *byte);
                rest = tail;
            }
            [_] => {
                return Err(FilterError::InvalidData(
                    "run-length repeat run missing its byte".to_string(),
                ));
            }
        }
    }
}
