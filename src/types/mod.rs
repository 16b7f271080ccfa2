mod key;
mod raw;
mod xref;

pub use key::ObjectKey;
pub use raw::{DecodedStream, RawKind, RawStream, RawValue};
pub use xref::{Trailer, Xref, XrefEntry, XrefKey};
