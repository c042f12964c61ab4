//! Typed codecs between native values and a document value model.
//!
//! Every codec is composed statically from the codecs of its parts:
//! scalars and containers are provided, records and tagged unions are
//! derived.
//!
//! ```ignore
//! use docodec::{Decode, Encode};
//!
//! #[derive(Decode, Encode)]
//! struct Person {
//!     name: String,
//!     nick: Option<String>,
//!     #[docodec(default)]
//!     tags: Vec<String>,
//! }
//!
//! let value = docodec::encode(&person);
//! let back: Person = docodec::decode(&value)?;
//! ```
//!
//! Decoding accumulates: a malformed document yields every field and
//! element failure at once, each located by its [`Path`](error::Path).

#[allow(unused_extern_crates)]
extern crate self as docodec;

pub mod codec;
pub mod container;
pub mod coproduct;
pub mod error;
pub mod lazy;
pub mod product;
pub mod scalar;
pub mod value;

pub use codec::{
    codec, decode, decoder, encode, encoder, Codec, Decode, Decoder, Encode, Encoder, Resolved,
};
pub use docodec_derive::{Decode, Encode};
pub use error::{DecodeError, DecodeErrors, DecodeResult};
pub use lazy::Deferred;
pub use scalar::Millis;
pub use value::{Binary, Document, Kind, Symbol, Value};
