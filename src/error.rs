use crate::filters::FilterError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("empty input")]
    EmptyData,

    #[error("PDF header not found")]
    HeaderMissing,

    #[error("startxref marker not found")]
    StartXrefNotFound,

    #[error("no cross-reference entries found")]
    XrefNotFound,

    #[error("trailer not found after cross-reference table")]
    TrailerNotFound,

    #[error("cross-reference chain revisits offset {0}")]
    XrefLoop(usize),

    #[error("invalid object reference: {0}")]
    InvalidReference(String),

    #[error("unknown predictor selector: {0}")]
    UnknownPredictor(u16),

    #[error("cross-reference stream unpack failed: {0}")]
    UnpackFailure(String),

    #[error("filter error: {0}")]
    Filter(#[from] FilterError),
}

pub type ParseResult<T> = Result<T, ParseError>;
