//! Decoder / Encoder capabilities and the [`Codec`] façade.
//!
//! Two layers:
//!
//! - [`Decoder`] / [`Encoder`] — value-level capabilities. Immutable,
//!   stateless, composable (`try_map`, `map`, `contramap`).
//! - [`Decode`] / [`Encode`] — type-level resolution: "the" codec of a type.
//!   Implemented by scalars, containers and `#[derive(Decode, Encode)]`.
//!
//! [`Resolved`] bridges the two: a zero-sized capability that calls the
//! type's impl at decode time.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{DecodeError, DecodeErrors, DecodeResult};
use crate::value::Value;

// ════════════════════════════════════════════════════════════════
//  Capabilities
// ════════════════════════════════════════════════════════════════

/// Maps a [`Value`] to an `A` or a non-empty set of errors.
pub trait Decoder<A> {
    fn decode(&self, value: &Value) -> DecodeResult<A>;

    /// Value used when the source field is absent. `None`: field required.
    fn default_value(&self) -> Option<A> {
        None
    }

    /// Derived scalar: decode, then apply a conversion that may fail.
    /// A conversion failure becomes [`DecodeError::FieldParseError`].
    fn try_map<B, E, F>(self, f: F) -> TryMap<Self, F, A>
    where
        Self: Sized,
        F: Fn(A) -> Result<B, E>,
        E: std::error::Error + Send + Sync + 'static,
    {
        TryMap {
            inner: self,
            f,
            _marker: PhantomData,
        }
    }

    fn map<B, F>(self, f: F) -> Map<Self, F, A>
    where
        Self: Sized,
        F: Fn(A) -> B,
    {
        Map {
            inner: self,
            f,
            _marker: PhantomData,
        }
    }
}

/// Maps an `A` to a [`Value`].
pub trait Encoder<A> {
    fn encode(&self, value: &A) -> Value;

    /// Encode a `B` by first projecting it to an `A`.
    fn contramap<B, F>(self, f: F) -> Contramap<Self, F, A>
    where
        Self: Sized,
        F: Fn(&B) -> A,
    {
        Contramap {
            inner: self,
            f,
            _marker: PhantomData,
        }
    }
}

impl<A, D: Decoder<A> + ?Sized> Decoder<A> for &D {
    fn decode(&self, value: &Value) -> DecodeResult<A> {
        (**self).decode(value)
    }

    fn default_value(&self) -> Option<A> {
        (**self).default_value()
    }
}

impl<A, D: Decoder<A> + ?Sized> Decoder<A> for Box<D> {
    fn decode(&self, value: &Value) -> DecodeResult<A> {
        (**self).decode(value)
    }

    fn default_value(&self) -> Option<A> {
        (**self).default_value()
    }
}

impl<A, D: Decoder<A> + ?Sized> Decoder<A> for Arc<D> {
    fn decode(&self, value: &Value) -> DecodeResult<A> {
        (**self).decode(value)
    }

    fn default_value(&self) -> Option<A> {
        (**self).default_value()
    }
}

impl<A, E: Encoder<A> + ?Sized> Encoder<A> for &E {
    fn encode(&self, value: &A) -> Value {
        (**self).encode(value)
    }
}

impl<A, E: Encoder<A> + ?Sized> Encoder<A> for Box<E> {
    fn encode(&self, value: &A) -> Value {
        (**self).encode(value)
    }
}

impl<A, E: Encoder<A> + ?Sized> Encoder<A> for Arc<E> {
    fn encode(&self, value: &A) -> Value {
        (**self).encode(value)
    }
}

// ────────────────────────────────────────────────────────────────
//  Combinators
// ────────────────────────────────────────────────────────────────

/// See [`Decoder::try_map`].
#[derive(Clone, Copy)]
pub struct TryMap<D, F, A> {
    inner: D,
    f: F,
    _marker: PhantomData<fn() -> A>,
}

impl<A, B, E, D, F> Decoder<B> for TryMap<D, F, A>
where
    D: Decoder<A>,
    F: Fn(A) -> Result<B, E>,
    E: std::error::Error + Send + Sync + 'static,
{
    fn decode(&self, value: &Value) -> DecodeResult<B> {
        let a = self.inner.decode(value)?;
        (self.f)(a).map_err(|e| DecodeErrors::single(DecodeError::parse(e)))
    }

    fn default_value(&self) -> Option<B> {
        self.inner.default_value().and_then(|a| (self.f)(a).ok())
    }
}

/// See [`Decoder::map`].
#[derive(Clone, Copy)]
pub struct Map<D, F, A> {
    inner: D,
    f: F,
    _marker: PhantomData<fn() -> A>,
}

impl<A, B, D, F> Decoder<B> for Map<D, F, A>
where
    D: Decoder<A>,
    F: Fn(A) -> B,
{
    fn decode(&self, value: &Value) -> DecodeResult<B> {
        self.inner.decode(value).map(&self.f)
    }

    fn default_value(&self) -> Option<B> {
        self.inner.default_value().map(&self.f)
    }
}

/// See [`Encoder::contramap`].
#[derive(Clone, Copy)]
pub struct Contramap<E, F, A> {
    inner: E,
    f: F,
    _marker: PhantomData<fn(A)>,
}

impl<A, B, E, F> Encoder<B> for Contramap<E, F, A>
where
    E: Encoder<A>,
    F: Fn(&B) -> A,
{
    fn encode(&self, value: &B) -> Value {
        self.inner.encode(&(self.f)(value))
    }
}

/// Decoder from a closure. See [`decoder_fn`].
#[derive(Clone, Copy)]
pub struct FnDecoder<F>(F);

/// Encoder from a closure. See [`encoder_fn`].
#[derive(Clone, Copy)]
pub struct FnEncoder<F>(F);

/// Hand-written decoder, e.g. a record codec assembled from
/// [`product::field`](crate::product::field) calls.
pub fn decoder_fn<A, F>(f: F) -> FnDecoder<F>
where
    F: Fn(&Value) -> DecodeResult<A>,
{
    FnDecoder(f)
}

pub fn encoder_fn<A, F>(f: F) -> FnEncoder<F>
where
    F: Fn(&A) -> Value,
{
    FnEncoder(f)
}

impl<A, F> Decoder<A> for FnDecoder<F>
where
    F: Fn(&Value) -> DecodeResult<A>,
{
    fn decode(&self, value: &Value) -> DecodeResult<A> {
        (self.0)(value)
    }
}

impl<A, F> Encoder<A> for FnEncoder<F>
where
    F: Fn(&A) -> Value,
{
    fn encode(&self, value: &A) -> Value {
        (self.0)(value)
    }
}

// ════════════════════════════════════════════════════════════════
//  Type-level resolution
// ════════════════════════════════════════════════════════════════

/// Types with a canonical decoder.
pub trait Decode: Sized {
    /// True when every encoded value of this type is a document.
    const DOCUMENT: bool = false;
    /// True when some value of this type is decoded from null.
    const NULLABLE: bool = false;

    fn decode(value: &Value) -> DecodeResult<Self>;

    fn default_value() -> Option<Self> {
        None
    }
}

/// Types with a canonical encoder.
pub trait Encode {
    /// True when [`encode`](Encode::encode) always yields a document.
    const DOCUMENT: bool = false;
    /// True when [`encode`](Encode::encode) may yield null.
    const NULLABLE: bool = false;

    fn encode(&self) -> Value;
}

/// Zero-sized capability delegating to `A`'s [`Decode`] / [`Encode`] impls.
///
/// Resolution happens per call, never at construction, so holding a
/// `Resolved<A>` inside `A`'s own codec cannot recurse.
pub struct Resolved<A>(PhantomData<fn() -> A>);

impl<A> Resolved<A> {
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<A> Default for Resolved<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Clone for Resolved<A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A> Copy for Resolved<A> {}

impl<A> fmt::Debug for Resolved<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Resolved<{}>", std::any::type_name::<A>())
    }
}

impl<A: Decode> Decoder<A> for Resolved<A> {
    fn decode(&self, value: &Value) -> DecodeResult<A> {
        A::decode(value)
    }

    fn default_value(&self) -> Option<A> {
        A::default_value()
    }
}

impl<A: Encode> Encoder<A> for Resolved<A> {
    fn encode(&self, value: &A) -> Value {
        value.encode()
    }
}

pub const fn decoder<A: Decode>() -> Resolved<A> {
    Resolved::new()
}

pub const fn encoder<A: Encode>() -> Resolved<A> {
    Resolved::new()
}

/// The canonical codec of `A`, packaged as a [`Codec`].
pub fn codec<A: Decode + Encode + 'static>() -> Codec<A> {
    Codec::new(Resolved::<A>::new(), Resolved::<A>::new())
}

pub fn decode<A: Decode>(value: &Value) -> DecodeResult<A> {
    A::decode(value)
}

pub fn encode<A: Encode + ?Sized>(value: &A) -> Value {
    value.encode()
}

// ════════════════════════════════════════════════════════════════
//  Codec façade
// ════════════════════════════════════════════════════════════════

/// A [`Decoder`] and an [`Encoder`] for the same type, packaged together.
///
/// Adds no logic: both trait impls forward to the halves.
pub struct Codec<A> {
    decoder: Arc<dyn Decoder<A> + Send + Sync>,
    encoder: Arc<dyn Encoder<A> + Send + Sync>,
}

impl<A> Codec<A> {
    pub fn new<D, E>(decoder: D, encoder: E) -> Self
    where
        D: Decoder<A> + Send + Sync + 'static,
        E: Encoder<A> + Send + Sync + 'static,
    {
        Self {
            decoder: Arc::new(decoder),
            encoder: Arc::new(encoder),
        }
    }

    /// Package a value that is both halves at once.
    pub fn pair<C>(codec: C) -> Self
    where
        C: Decoder<A> + Encoder<A> + Send + Sync + 'static,
    {
        let shared = Arc::new(codec);
        Self {
            decoder: shared.clone(),
            encoder: shared,
        }
    }

    pub fn decoder(&self) -> &(dyn Decoder<A> + Send + Sync) {
        &*self.decoder
    }

    pub fn encoder(&self) -> &(dyn Encoder<A> + Send + Sync) {
        &*self.encoder
    }
}

impl<A> Clone for Codec<A> {
    fn clone(&self) -> Self {
        Self {
            decoder: self.decoder.clone(),
            encoder: self.encoder.clone(),
        }
    }
}

impl<A> fmt::Debug for Codec<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Codec<{}>", std::any::type_name::<A>())
    }
}

impl<A> Decoder<A> for Codec<A> {
    fn decode(&self, value: &Value) -> DecodeResult<A> {
        self.decoder.decode(value)
    }

    fn default_value(&self) -> Option<A> {
        self.decoder.default_value()
    }
}

impl<A> Encoder<A> for Codec<A> {
    fn encode(&self, value: &A) -> Value {
        self.encoder.encode(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::{Int32Codec, StringCodec};
    use crate::value::Kind;

    #[derive(Debug, PartialEq)]
    struct Port(u16);

    #[test]
    fn try_map_wraps_conversion_failure() {
        let port = Int32Codec.try_map(|n: i32| u16::try_from(n).map(Port));

        assert_eq!(port.decode(&Value::Int32(8080)).unwrap(), Port(8080));

        let errors = port.decode(&Value::Int32(-1)).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors.first().error,
            DecodeError::FieldParseError(_)
        ));
    }

    #[test]
    fn try_map_keeps_kind_mismatch() {
        let port = Int32Codec.try_map(|n: i32| u16::try_from(n).map(Port));
        let errors = port.decode(&Value::from("80")).unwrap_err();
        assert_eq!(
            errors.first().error,
            DecodeError::mismatch(Kind::String, Kind::Int32)
        );
    }

    #[test]
    fn facade_pairs_halves_without_logic() {
        let upper = Codec::new(
            StringCodec.map(|s: String| s.to_uppercase()),
            StringCodec.contramap(|s: &String| s.to_lowercase()),
        );
        assert_eq!(upper.encode(&"ABC".to_string()), Value::from("abc"));
        assert_eq!(upper.decode(&Value::from("abc")).unwrap(), "ABC");
        assert_eq!(upper.default_value(), None);
    }

    #[test]
    fn resolved_codec_round_trips() {
        let c = codec::<i64>();
        let v = c.encode(&42);
        assert_eq!(v, Value::Int64(42));
        assert_eq!(c.decode(&v).unwrap(), 42);
    }
}
