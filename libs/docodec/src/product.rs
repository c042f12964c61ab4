//! Runtime half of record derivation.
//!
//! `#[derive(Decode)]` on a struct expands to one [`field`] call per
//! declared field, folded together with [`zip`](crate::error::zip) so
//! that every field failure is reported. Hand-written record codecs use
//! the same helpers.

use crate::codec::Decoder;
use crate::error::{DecodeError, DecodeErrors, DecodeResult};
use crate::scalar::mismatch;
use crate::value::{Document, Kind, Value};

pub fn expect_document(value: &Value) -> DecodeResult<&Document> {
    value
        .as_document()
        .ok_or_else(|| mismatch(value, Kind::Document))
}

/// Decode field `name` of `doc`.
///
/// Absent: the decoder's default value, else `MissingField(name)`.
/// Present: the decoder's result, failures located under `name`.
pub fn field<A, D: Decoder<A>>(doc: &Document, name: &str, decoder: &D) -> DecodeResult<A> {
    match doc.get(name) {
        Some(value) => decoder.decode(value).map_err(|e| e.in_field(name)),
        None => decoder
            .default_value()
            .ok_or_else(|| DecodeErrors::single(DecodeError::missing(name))),
    }
}

/// Like [`field`], with an explicit default taking precedence over the
/// decoder's own.
pub fn field_or_else<A, D, F>(doc: &Document, name: &str, decoder: &D, default: F) -> DecodeResult<A>
where
    D: Decoder<A>,
    F: FnOnce() -> A,
{
    match doc.get(name) {
        Some(value) => decoder.decode(value).map_err(|e| e.in_field(name)),
        None => Ok(default()),
    }
}

/// Log a failed record decode. Pass-through for the result.
pub fn finish<A>(type_name: &'static str, result: DecodeResult<A>) -> DecodeResult<A> {
    if let Err(errors) = &result {
        tracing::trace!(record = type_name, errors = errors.len(), "record decode failed");
    }
    result
}
