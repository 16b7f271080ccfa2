//! The parse session: one borrowed byte buffer, one cross-reference
//! accumulator, one object cache, one visited-offset guard. The driver,
//! the cross-reference resolution walk, and the indirect-object
//! materializer all live here as methods on the session.

use crate::error::{ParseError, ParseResult};
use crate::filters;
use crate::parser::lexer::{self, find_subsequence, is_whitespace};
use crate::parser::tokenizer::next_raw_value;
use crate::parser::xref::{self, LineFlag};
use crate::parser::{ParsedDocument, ParserOptions};
use crate::types::{
    DecodedStream, ObjectKey, RawKind, RawValue, Trailer, Xref, XrefEntry, XrefKey,
};
use indexmap::IndexMap;
use log::{debug, warn};
use std::collections::HashSet;

const PDF_HEADER_SIGNATURE: &[u8] = b"%PDF-";
const XREF_KEYWORD: &[u8] = b"xref";

/// Window applied when checking for an `N G obj` header at an offset.
const HEADER_WINDOW: usize = 33;

pub struct PdfFileParser<'a> {
    data: &'a [u8],
    options: ParserOptions,
    xref: Xref,
    objects: IndexMap<ObjectKey, Vec<RawValue>>,
    visited_offsets: HashSet<usize>,
    /// The section nearest EOF owns the trailer; set once.
    trailer_set: bool,
}

impl<'a> PdfFileParser<'a> {
    /// Builds a session over `data`. Everything before the first `%PDF-`
    /// is trimmed away, so stored offsets count from the header.
    pub fn new(data: &'a [u8], options: ParserOptions) -> ParseResult<Self> {
        if data.is_empty() {
            return Err(ParseError::EmptyData);
        }
        let start =
            find_subsequence(data, PDF_HEADER_SIGNATURE, 0).ok_or(ParseError::HeaderMissing)?;
        if start > 0 {
            debug!("trimming {} preamble bytes before the PDF header", start);
        }
        Ok(PdfFileParser {
            data: &data[start..],
            options,
            xref: Xref::default(),
            objects: IndexMap::new(),
            visited_offsets: HashSet::new(),
            trailer_set: false,
        })
    }

    pub fn parse(mut self) -> ParseResult<ParsedDocument> {
        debug!("resolving cross-reference chain");
        self.resolve_xref(0)?;
        if self.xref.entries.is_empty() {
            return Err(ParseError::XrefNotFound);
        }

        debug!(
            "materializing {} cross-reference entries",
            self.xref.entries.len()
        );
        let worklist: Vec<(ObjectKey, u64)> = self
            .xref
            .entries
            .iter()
            .filter_map(|(key, entry)| match (key, entry) {
                (XrefKey::Object(key), XrefEntry::Offset(offset)) if *offset > 0 => {
                    Some((*key, *offset))
                }
                _ => None,
            })
            .collect();
        for (key, offset) in worklist {
            if self.objects.contains_key(&key) {
                continue;
            }
            let values = self.get_indirect_object(key, offset as usize, true)?;
            self.objects.insert(key, values);
        }

        Ok(ParsedDocument {
            xref: self.xref,
            objects: self.objects,
        })
    }

    /// One step of the cross-reference walk. `offset` is 0 for the entry
    /// call and a `Prev` target afterwards; every offset may be processed
    /// at most once per session.
    fn resolve_xref(&mut self, offset: usize) -> ParseResult<()> {
        if !self.visited_offsets.insert(offset) {
            return Err(ParseError::XrefLoop(offset));
        }

        let startxref = if offset == 0 {
            xref::find_startxref(self.data, 0).ok_or(ParseError::StartXrefNotFound)?
        } else if let Some(pos) = self.find_xref_keyword_near(offset) {
            pos
        } else if self.object_header_at(offset) {
            offset
        } else {
            xref::find_startxref(self.data, offset).ok_or(ParseError::StartXrefNotFound)?
        };

        if self
            .data
            .get(startxref..)
            .is_some_and(|rest| rest.starts_with(XREF_KEYWORD))
        {
            self.decode_xref_table(startxref)
        } else {
            self.decode_xref_stream(startxref)
        }
    }

    /// Looks for the `xref` keyword starting within four bytes of `offset`.
    fn find_xref_keyword_near(&self, offset: usize) -> Option<usize> {
        let window_end = (offset + 4 + XREF_KEYWORD.len()).min(self.data.len());
        find_subsequence(&self.data[..window_end], XREF_KEYWORD, offset)
    }

    /// True when an `N G obj` header starts exactly at `offset`.
    fn object_header_at(&self, offset: usize) -> bool {
        let window_end = (offset + HEADER_WINDOW).min(self.data.len());
        match self.data.get(offset..window_end) {
            Some(window) => lexer::object_header(window).is_ok(),
            None => false,
        }
    }

    fn decode_xref_table(&mut self, startxref: usize) -> ParseResult<()> {
        debug!("classical cross-reference table at {}", startxref);
        let mut pos = startxref + XREF_KEYWORD.len();
        while pos < self.data.len() && is_whitespace(self.data[pos]) {
            pos += 1;
        }

        let mut obj_num: u64 = 0;
        while let Some(line) = xref::match_table_line(&self.data[pos..]) {
            match line.flag {
                LineFlag::InUse => {
                    let key = XrefKey::Object(ObjectKey::new(obj_num as u32, line.second as u32));
                    self.xref
                        .entries
                        .entry(key)
                        .or_insert(XrefEntry::Offset(line.first));
                    obj_num += 1;
                }
                LineFlag::Free => obj_num += 1,
                LineFlag::Section => obj_num = line.first,
            }
            pos += line.len;
        }

        let scan = xref::scan_trailer(self.data, startxref).ok_or(ParseError::TrailerNotFound)?;
        let prev = scan.prev;
        if !self.trailer_set {
            self.trailer_set = true;
            self.xref.trailer = Trailer {
                size: scan.size,
                root: scan.root,
                info: scan.info,
                encrypt: scan.encrypt,
                id: scan.id,
            };
        }
        if let Some(prev) = prev {
            debug!("following Prev link to {}", prev);
            self.resolve_xref(prev)?;
        }
        Ok(())
    }

    fn decode_xref_stream(&mut self, startxref: usize) -> ParseResult<()> {
        debug!("cross-reference stream at {}", startxref);
        let header = next_raw_value(self.data, startxref);
        let key = match header.kind {
            RawKind::ObjectHeader(key) => key,
            _ => return Err(ParseError::StartXrefNotFound),
        };

        let values = self.get_indirect_object(key, startxref, true)?;
        let dict_items: Vec<RawValue> = match values.iter().find_map(RawValue::as_dict) {
            Some(items) => items.to_vec(),
            // Not a dictionary-led object; nothing to take from it.
            None => return Ok(()),
        };
        let stream_bytes: Option<Vec<u8>> = values.iter().find_map(|value| match &value.kind {
            RawKind::Stream(stream) => Some(
                stream
                    .decoded
                    .as_ref()
                    .map(|d| d.data.clone())
                    .unwrap_or_else(|| stream.raw.clone()),
            ),
            _ => None,
        });
        self.objects.entry(key).or_insert(values);

        let first_section = !self.trailer_set;
        let mut type_is_xref = false;
        let mut index_first: u64 = 0;
        let mut prev: Option<usize> = None;
        let mut widths: Option<[usize; 3]> = None;
        let mut columns: Option<usize> = None;

        for (i, item) in dict_items.iter().enumerate() {
            let name = match item.as_name() {
                Some(name) => name,
                None => continue,
            };
            let value = dict_items.get(i + 1);
            if name == b"Type" {
                if value.and_then(|v| v.as_name()) == Some(&b"XRef"[..]) {
                    type_is_xref = true;
                }
            } else if name == b"Index" {
                if let Some(first) = value
                    .and_then(|v| v.as_array())
                    .and_then(|items| items.first())
                    .and_then(RawValue::as_int)
                {
                    index_first = first.max(0) as u64;
                }
            } else if name == b"Prev" {
                if let Some(target) = value.and_then(RawValue::as_int) {
                    if target >= 0 {
                        prev = Some(target as usize);
                    }
                }
            } else if name == b"W" {
                if let Some(items) = value.and_then(|v| v.as_array()) {
                    let w: Vec<usize> = items
                        .iter()
                        .filter_map(RawValue::as_int)
                        .map(|v| v.max(0) as usize)
                        .collect();
                    if w.len() == 3 {
                        widths = Some([w[0], w[1], w[2]]);
                    }
                }
            } else if name == b"DecodeParms" {
                if let Some(parms) = value.and_then(|v| v.as_dict()) {
                    columns = Some(columns_from_parms(parms));
                }
            } else if name == b"Size" && first_section {
                self.xref.trailer.size = value.and_then(RawValue::as_int);
            } else if name == b"Root" && first_section {
                self.xref.trailer.root = value.and_then(RawValue::as_reference);
            } else if name == b"Info" && first_section {
                self.xref.trailer.info = value.and_then(RawValue::as_reference);
            } else if name == b"Encrypt" && first_section {
                self.xref.trailer.encrypt = value.and_then(RawValue::as_reference);
            } else if name == b"ID" && first_section {
                if let Some(items) = value.and_then(|v| v.as_array()) {
                    if items.len() >= 2 {
                        self.xref.trailer.id =
                            Some([string_payload(&items[0]), string_payload(&items[1])]);
                    }
                }
            }
        }

        if type_is_xref {
            let widths = widths.ok_or_else(|| {
                ParseError::UnpackFailure("cross-reference stream carries no W array".to_string())
            })?;
            let bytes = stream_bytes.unwrap_or_default();
            let rows = match columns {
                Some(columns) => xref::png_unpredict(&bytes, columns)?,
                None => xref::chunk_rows(&bytes, widths.iter().sum())?,
            };

            let mut obj_num = index_first;
            for row in &rows {
                let fields = xref::read_row_fields(row, widths)?;
                match fields[0] {
                    1 => {
                        let key =
                            XrefKey::Object(ObjectKey::new(obj_num as u32, fields[2] as u32));
                        self.xref
                            .entries
                            .entry(key)
                            .or_insert(XrefEntry::Offset(fields[1]));
                    }
                    2 => {
                        let key = XrefKey::InStream {
                            stream: fields[1] as u32,
                            index: fields[2] as u32,
                        };
                        self.xref.entries.entry(key).or_insert(XrefEntry::Compressed);
                    }
                    // Free entries and reserved types contribute nothing.
                    _ => {}
                }
                obj_num += 1;
            }
        } else {
            debug!("object {} is not a cross-reference stream", key);
        }

        if first_section {
            self.trailer_set = true;
        }
        if let Some(prev) = prev {
            debug!("following Prev link to {}", prev);
            self.resolve_xref(prev)?;
        }
        Ok(())
    }

    /// Parses the indirect object `key` expected at `offset`. A missing
    /// object materializes as a single `null`. With `decode` set, stream
    /// payloads are run through the filter pipeline and attached.
    pub(crate) fn get_indirect_object(
        &mut self,
        key: ObjectKey,
        offset: usize,
        decode: bool,
    ) -> ParseResult<Vec<RawValue>> {
        let mut pos = offset.min(self.data.len());
        // Tolerate zero-padded object headers.
        while pos < self.data.len() && self.data[pos] == b'0' {
            pos += 1;
        }
        let header = format!("{} {} obj", key.number, key.generation).into_bytes();
        if !self.slice_starts_with(pos, &header) {
            pos += 1;
            if !self.slice_starts_with(pos, &header) {
                debug!("object {} missing at offset {}", key, offset);
                return Ok(vec![RawValue::new(RawKind::Null, offset)]);
            }
        }
        pos += header.len();

        let mut values: Vec<RawValue> = Vec::new();
        loop {
            let mut value = next_raw_value(self.data, pos);
            if value.end == pos {
                break;
            }
            if matches!(value.kind, RawKind::EndObj) {
                break;
            }
            let end = value.end;
            if decode {
                if let RawKind::Stream(stream) = &mut value.kind {
                    if let Some(dict) = values.last().and_then(RawValue::as_dict) {
                        let items = dict.to_vec();
                        let decoded = self.decode_stream(&items, &stream.raw)?;
                        stream.decoded = Some(decoded);
                    }
                }
            }
            values.push(value);
            pos = end;
        }
        Ok(values)
    }

    /// Runs a stream body through the filter pipeline as directed by its
    /// dictionary: `/Length` truncates the physical span, `/Filter` names
    /// the pipeline (resolved through the xref when indirect).
    fn decode_stream(
        &mut self,
        dict_items: &[RawValue],
        raw: &[u8],
    ) -> ParseResult<DecodedStream> {
        if raw.is_empty() {
            return Ok(DecodedStream {
                data: Vec::new(),
                residual_filters: Vec::new(),
            });
        }

        let mut bytes: &[u8] = raw;
        let mut filter_names: Vec<String> = Vec::new();
        for (i, item) in dict_items.iter().enumerate() {
            let name = match item.as_name() {
                Some(name) => name,
                None => continue,
            };
            if name == b"Length" {
                if let Some(declared) = dict_items.get(i + 1).and_then(RawValue::as_int) {
                    if declared >= 0 && (declared as usize) < bytes.len() {
                        bytes = &bytes[..declared as usize];
                    } else if declared >= 0 && declared as usize > bytes.len() {
                        // The physical span wins.
                        warn!(
                            "declared stream length {} exceeds the {} physical bytes",
                            declared,
                            bytes.len()
                        );
                    }
                }
            } else if name == b"Filter" {
                let value = match dict_items.get(i + 1) {
                    Some(v) if v.as_reference().is_some() => Some(self.get_object_value(v)?),
                    other => other.cloned(),
                };
                match value.as_ref().map(|v| &v.kind) {
                    Some(RawKind::Name(filter)) => {
                        filter_names.push(String::from_utf8_lossy(filter).into_owned());
                    }
                    Some(RawKind::Array(items)) => {
                        for item in items {
                            if let Some(filter) = item.as_name() {
                                filter_names.push(String::from_utf8_lossy(filter).into_owned());
                            }
                        }
                    }
                    _ => {}
                }
            }
        }

        match filters::decode_all(&filter_names, bytes) {
            Ok(data) => Ok(DecodedStream {
                data,
                residual_filters: Vec::new(),
            }),
            Err(err) if self.options.ignore_filter_errors => {
                warn!("stream decode failed ({}); keeping the raw bytes", err);
                Ok(DecodedStream {
                    data: bytes.to_vec(),
                    residual_filters: filter_names,
                })
            }
            Err(err) => Err(ParseError::Filter(err)),
        }
    }

    /// Resolves `value` one step: a reference is replaced by the first
    /// value of the object it names (parsed on demand and cached);
    /// anything else comes back unchanged.
    pub(crate) fn get_object_value(&mut self, value: &RawValue) -> ParseResult<RawValue> {
        let key = match value.as_reference() {
            Some(key) => key,
            None => return Ok(value.clone()),
        };
        if let Some(cached) = self.objects.get(&key) {
            return Ok(cached
                .first()
                .cloned()
                .unwrap_or_else(|| RawValue::new(RawKind::Null, value.end)));
        }
        let offset = match self.xref.entries.get(&XrefKey::Object(key)) {
            Some(XrefEntry::Offset(offset)) => *offset,
            _ => return Ok(value.clone()),
        };
        let parsed = self.get_indirect_object(key, offset as usize, false)?;
        let first = parsed
            .first()
            .cloned()
            .unwrap_or_else(|| RawValue::new(RawKind::Null, value.end));
        self.objects.insert(key, parsed);
        Ok(first)
    }

    fn slice_starts_with(&self, offset: usize, pattern: &[u8]) -> bool {
        self.data
            .get(offset..)
            .is_some_and(|rest| rest.starts_with(pattern))
    }
}

fn columns_from_parms(parms: &[RawValue]) -> usize {
    for (i, item) in parms.iter().enumerate() {
        if item.as_name() == Some(&b"Columns"[..]) {
            if let Some(columns) = parms.get(i + 1).and_then(RawValue::as_int) {
                // Negative column counts clamp to zero.
                return columns.max(0) as usize;
            }
        }
    }
    0
}

fn string_payload(value: &RawValue) -> Vec<u8> {
    match &value.kind {
        RawKind::Hex(bytes) | RawKind::Literal(bytes) => bytes.clone(),
        _ => Vec::new(),
    }
}
