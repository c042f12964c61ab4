//! Codecs for primitive kinds, and scalars derived from them.
//!
//! Decoding checks the kind tag first; on mismatch it fails with exactly
//! one `TypeMismatch`. Nothing is coerced: an `Int32` is never read as an
//! `Int64`, a `Symbol` never as a `String`.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::codec::{Decode, Decoder, Encode, Encoder};
use crate::error::{DecodeError, DecodeErrors, DecodeResult};
use crate::value::{Binary, Kind, Symbol, Value};

pub(crate) fn mismatch(value: &Value, expected: Kind) -> DecodeErrors {
    DecodeErrors::single(DecodeError::mismatch(value.kind(), expected))
}

macro_rules! scalar_codec {
    ($(#[$doc:meta])* $codec:ident: $ty:ty => $kind:ident, $access:expr, $wrap:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $codec;

        impl Decoder<$ty> for $codec {
            fn decode(&self, value: &Value) -> DecodeResult<$ty> {
                ($access)(value).ok_or_else(|| mismatch(value, Kind::$kind))
            }
        }

        impl Encoder<$ty> for $codec {
            fn encode(&self, value: &$ty) -> Value {
                ($wrap)(value)
            }
        }
    };
}

macro_rules! impl_scalar {
    ($ty:ty => $codec:ident) => {
        impl Decode for $ty {
            fn decode(value: &Value) -> DecodeResult<Self> {
                $codec.decode(value)
            }
        }

        impl Encode for $ty {
            fn encode(&self) -> Value {
                $codec.encode(self)
            }
        }
    };
}

scalar_codec!(BoolCodec: bool => Bool, |v: &Value| v.as_bool(), |v: &bool| Value::Bool(*v));
scalar_codec!(
    StringCodec: String => String,
    |v: &Value| v.as_str().map(str::to_string),
    |v: &String| Value::String(v.clone())
);
scalar_codec!(Int32Codec: i32 => Int32, |v: &Value| v.as_i32(), |v: &i32| Value::Int32(*v));
scalar_codec!(Int64Codec: i64 => Int64, |v: &Value| v.as_i64(), |v: &i64| Value::Int64(*v));
scalar_codec!(DoubleCodec: f64 => Double, |v: &Value| v.as_f64(), |v: &f64| Value::Double(*v));
scalar_codec!(
    /// Raw timestamp as milliseconds since the epoch. [`Millis`] is
    /// derived from it.
    TimestampCodec: i64 => Timestamp,
    |v: &Value| v.as_timestamp(),
    |v: &i64| Value::Timestamp(*v)
);
scalar_codec!(
    BinaryCodec: Binary => Binary,
    |v: &Value| v.as_binary().map(|b| Binary(b.to_vec())),
    |v: &Binary| Value::Binary(v.0.clone())
);
scalar_codec!(
    SymbolCodec: Symbol => Symbol,
    |v: &Value| v.as_symbol().map(|s| Symbol(s.to_string())),
    |v: &Symbol| Value::Symbol(v.0.clone())
);
scalar_codec!(
    /// `()` as the null kind.
    UnitCodec: () => Null,
    |v: &Value| v.is_null().then_some(()),
    |_: &()| Value::Null
);

impl_scalar!(bool => BoolCodec);
impl_scalar!(String => StringCodec);
impl_scalar!(i32 => Int32Codec);
impl_scalar!(i64 => Int64Codec);
impl_scalar!(f64 => DoubleCodec);
impl_scalar!(Binary => BinaryCodec);
impl_scalar!(Symbol => SymbolCodec);

impl Decode for () {
    const NULLABLE: bool = true;

    fn decode(value: &Value) -> DecodeResult<Self> {
        UnitCodec.decode(value)
    }
}

impl Encode for () {
    const NULLABLE: bool = true;

    fn encode(&self) -> Value {
        UnitCodec.encode(self)
    }
}

impl Encode for str {
    fn encode(&self) -> Value {
        Value::String(self.to_string())
    }
}

// ════════════════════════════════════════════════════════════════
//  Derived scalars
// ════════════════════════════════════════════════════════════════

/// Hyphenated string form.
impl Decode for Uuid {
    fn decode(value: &Value) -> DecodeResult<Self> {
        StringCodec
            .try_map(|s: String| Uuid::parse_str(&s))
            .decode(value)
    }
}

impl Encode for Uuid {
    fn encode(&self) -> Value {
        StringCodec
            .contramap(|u: &Uuid| u.hyphenated().to_string())
            .encode(self)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("timestamp {0}ms is out of range")]
pub struct TimestampOutOfRange(pub i64);

/// UTC instant at millisecond precision, the resolution of
/// [`Value::Timestamp`].
///
/// Construction truncates toward the past, so every `Millis` survives an
/// encode and decode unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Millis(DateTime<Utc>);

impl Millis {
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self(DateTime::from_timestamp_millis(instant.timestamp_millis()).unwrap_or(instant))
    }

    pub fn from_millis(ms: i64) -> Result<Self, TimestampOutOfRange> {
        DateTime::from_timestamp_millis(ms)
            .map(Self)
            .ok_or(TimestampOutOfRange(ms))
    }

    pub fn millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    pub fn instant(&self) -> DateTime<Utc> {
        self.0
    }
}

impl From<DateTime<Utc>> for Millis {
    fn from(instant: DateTime<Utc>) -> Self {
        Self::new(instant)
    }
}

impl From<Millis> for DateTime<Utc> {
    fn from(millis: Millis) -> Self {
        millis.0
    }
}

impl Decode for Millis {
    fn decode(value: &Value) -> DecodeResult<Self> {
        TimestampCodec.try_map(Millis::from_millis).decode(value)
    }
}

impl Encode for Millis {
    fn encode(&self) -> Value {
        TimestampCodec.contramap(Millis::millis).encode(self)
    }
}
