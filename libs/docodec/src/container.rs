//! Container combinators, generic over the codec of their elements.
//!
//! - [`OptionCodec`] — null ⇄ `None`; absent field ⇄ `None`.
//! - [`SeqCodec`] — array ⇄ `Vec` / `VecDeque`, source order kept.
//! - [`SetCodec`] — array ⇄ `BTreeSet` / `HashSet`, deduplicated.
//! - [`MapCodec`] — document ⇄ `BTreeMap<String, _>` / `HashMap<String, _>`.
//!
//! Element failures never hide sibling failures: every element is decoded
//! and all errors are returned, each located by index (or key).

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::hash::Hash;
use std::sync::Arc;

use crate::codec::{Decode, Decoder, Encode, Encoder, Resolved};
use crate::error::{accumulate, DecodeResult};
use crate::scalar::mismatch;
use crate::value::{Document, Kind, Value};

// ════════════════════════════════════════════════════════════════
//  Option
// ════════════════════════════════════════════════════════════════

/// Optional value.
///
/// `None` always encodes as a null-kind value, also inside records: an
/// absent optional field is written as `null`, never omitted. `Some(x)`
/// encodes as `x` itself, so the inner codec must never produce null;
/// `OptionCodec` over such a codec cannot tell `Some` from `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionCodec<C>(pub C);

impl<A, C: Decoder<A>> Decoder<Option<A>> for OptionCodec<C> {
    fn decode(&self, value: &Value) -> DecodeResult<Option<A>> {
        if value.is_null() {
            return Ok(None);
        }
        self.0.decode(value).map(Some)
    }

    fn default_value(&self) -> Option<Option<A>> {
        Some(None)
    }
}

impl<A, C: Encoder<A>> Encoder<Option<A>> for OptionCodec<C> {
    fn encode(&self, value: &Option<A>) -> Value {
        match value {
            Some(v) => self.0.encode(v),
            None => Value::Null,
        }
    }
}

/// At the type level a nullable inner is rejected at compile time:
/// `Option<Option<T>>`, `Option<()>` and `Option` of a newtype over either
/// do not build.
///
/// ```compile_fail
/// let _ = docodec::encode(&Some(None::<i32>));
/// ```
///
/// ```compile_fail
/// let _ = docodec::decode::<Option<()>>(&docodec::Value::Null);
/// ```
impl<A: Decode> Decode for Option<A> {
    const NULLABLE: bool = true;

    fn decode(value: &Value) -> DecodeResult<Self> {
        const { assert!(!A::NULLABLE, "Option of a type that decodes from null") };
        OptionCodec(Resolved::<A>::new()).decode(value)
    }

    fn default_value() -> Option<Self> {
        Some(None)
    }
}

impl<A: Encode> Encode for Option<A> {
    const NULLABLE: bool = true;

    fn encode(&self) -> Value {
        const { assert!(!A::NULLABLE, "Option of a type that encodes to null") };
        match self {
            Some(v) => v.encode(),
            None => Value::Null,
        }
    }
}

// ════════════════════════════════════════════════════════════════
//  Sequences and sets
// ════════════════════════════════════════════════════════════════

fn decode_elements<A, C, D>(inner: &D, value: &Value) -> DecodeResult<C>
where
    D: Decoder<A>,
    C: FromIterator<A>,
{
    let items = value.as_array().ok_or_else(|| mismatch(value, Kind::Array))?;
    accumulate(
        items
            .iter()
            .enumerate()
            .map(|(i, item)| inner.decode(item).map_err(|e| e.in_index(i))),
    )
}

fn encode_elements<'a, A: 'a, E: Encoder<A>>(
    inner: &E,
    items: impl Iterator<Item = &'a A>,
) -> Value {
    Value::Array(items.map(|item| inner.encode(item)).collect())
}

/// Ordered sequence. Source order is preserved both ways.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeqCodec<C>(pub C);

impl<A, C: Decoder<A>> Decoder<Vec<A>> for SeqCodec<C> {
    fn decode(&self, value: &Value) -> DecodeResult<Vec<A>> {
        decode_elements(&self.0, value)
    }
}

impl<A, C: Encoder<A>> Encoder<Vec<A>> for SeqCodec<C> {
    fn encode(&self, value: &Vec<A>) -> Value {
        encode_elements(&self.0, value.iter())
    }
}

impl<A, C: Decoder<A>> Decoder<VecDeque<A>> for SeqCodec<C> {
    fn decode(&self, value: &Value) -> DecodeResult<VecDeque<A>> {
        decode_elements(&self.0, value)
    }
}

impl<A, C: Encoder<A>> Encoder<VecDeque<A>> for SeqCodec<C> {
    fn encode(&self, value: &VecDeque<A>) -> Value {
        encode_elements(&self.0, value.iter())
    }
}

/// Set. Duplicate elements in the source collapse into one.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetCodec<C>(pub C);

impl<A: Ord, C: Decoder<A>> Decoder<BTreeSet<A>> for SetCodec<C> {
    fn decode(&self, value: &Value) -> DecodeResult<BTreeSet<A>> {
        decode_elements(&self.0, value)
    }
}

impl<A, C: Encoder<A>> Encoder<BTreeSet<A>> for SetCodec<C> {
    fn encode(&self, value: &BTreeSet<A>) -> Value {
        encode_elements(&self.0, value.iter())
    }
}

impl<A: Eq + Hash, C: Decoder<A>> Decoder<HashSet<A>> for SetCodec<C> {
    fn decode(&self, value: &Value) -> DecodeResult<HashSet<A>> {
        decode_elements(&self.0, value)
    }
}

impl<A, C: Encoder<A>> Encoder<HashSet<A>> for SetCodec<C> {
    fn encode(&self, value: &HashSet<A>) -> Value {
        encode_elements(&self.0, value.iter())
    }
}

impl<A: Decode> Decode for Vec<A> {
    fn decode(value: &Value) -> DecodeResult<Self> {
        SeqCodec(Resolved::<A>::new()).decode(value)
    }
}

impl<A: Encode> Encode for Vec<A> {
    fn encode(&self) -> Value {
        SeqCodec(Resolved::<A>::new()).encode(self)
    }
}

impl<A: Decode> Decode for VecDeque<A> {
    fn decode(value: &Value) -> DecodeResult<Self> {
        SeqCodec(Resolved::<A>::new()).decode(value)
    }
}

impl<A: Encode> Encode for VecDeque<A> {
    fn encode(&self) -> Value {
        SeqCodec(Resolved::<A>::new()).encode(self)
    }
}

impl<A: Decode + Ord> Decode for BTreeSet<A> {
    fn decode(value: &Value) -> DecodeResult<Self> {
        SetCodec(Resolved::<A>::new()).decode(value)
    }
}

impl<A: Encode> Encode for BTreeSet<A> {
    fn encode(&self) -> Value {
        SetCodec(Resolved::<A>::new()).encode(self)
    }
}

impl<A: Decode + Eq + Hash> Decode for HashSet<A> {
    fn decode(value: &Value) -> DecodeResult<Self> {
        SetCodec(Resolved::<A>::new()).decode(value)
    }
}

impl<A: Encode> Encode for HashSet<A> {
    fn encode(&self) -> Value {
        SetCodec(Resolved::<A>::new()).encode(self)
    }
}

// ════════════════════════════════════════════════════════════════
//  String-keyed maps
// ════════════════════════════════════════════════════════════════

fn decode_entries<A, C, D>(inner: &D, value: &Value) -> DecodeResult<C>
where
    D: Decoder<A>,
    C: FromIterator<(String, A)>,
{
    let doc = value
        .as_document()
        .ok_or_else(|| mismatch(value, Kind::Document))?;
    accumulate(doc.iter().map(|(key, item)| {
        inner
            .decode(item)
            .map(|v| (key.to_string(), v))
            .map_err(|e| e.in_field(key))
    }))
}

fn encode_entries<'a, A: 'a, E: Encoder<A>>(
    inner: &E,
    entries: impl Iterator<Item = (&'a String, &'a A)>,
) -> Value {
    let mut doc = Document::new();
    for (key, item) in entries {
        doc.insert(key.as_str(), inner.encode(item));
    }
    Value::Document(doc)
}

/// Document with arbitrary keys, all values of one type.
///
/// `HashMap` encodes in its own iteration order; use `BTreeMap` for
/// reproducible output.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapCodec<C>(pub C);

impl<A, C: Decoder<A>> Decoder<BTreeMap<String, A>> for MapCodec<C> {
    fn decode(&self, value: &Value) -> DecodeResult<BTreeMap<String, A>> {
        decode_entries(&self.0, value)
    }
}

impl<A, C: Encoder<A>> Encoder<BTreeMap<String, A>> for MapCodec<C> {
    fn encode(&self, value: &BTreeMap<String, A>) -> Value {
        encode_entries(&self.0, value.iter())
    }
}

impl<A, C: Decoder<A>> Decoder<HashMap<String, A>> for MapCodec<C> {
    fn decode(&self, value: &Value) -> DecodeResult<HashMap<String, A>> {
        decode_entries(&self.0, value)
    }
}

impl<A, C: Encoder<A>> Encoder<HashMap<String, A>> for MapCodec<C> {
    fn encode(&self, value: &HashMap<String, A>) -> Value {
        encode_entries(&self.0, value.iter())
    }
}

impl<A: Decode> Decode for BTreeMap<String, A> {
    const DOCUMENT: bool = true;

    fn decode(value: &Value) -> DecodeResult<Self> {
        MapCodec(Resolved::<A>::new()).decode(value)
    }
}

impl<A: Encode> Encode for BTreeMap<String, A> {
    const DOCUMENT: bool = true;

    fn encode(&self) -> Value {
        MapCodec(Resolved::<A>::new()).encode(self)
    }
}

impl<A: Decode> Decode for HashMap<String, A> {
    const DOCUMENT: bool = true;

    fn decode(value: &Value) -> DecodeResult<Self> {
        MapCodec(Resolved::<A>::new()).decode(value)
    }
}

impl<A: Encode> Encode for HashMap<String, A> {
    const DOCUMENT: bool = true;

    fn encode(&self) -> Value {
        MapCodec(Resolved::<A>::new()).encode(self)
    }
}

// ════════════════════════════════════════════════════════════════
//  Indirection
// ════════════════════════════════════════════════════════════════

// Box and Arc are transparent. Box is how recursive types hold themselves.

impl<A: Decode> Decode for Box<A> {
    const DOCUMENT: bool = A::DOCUMENT;
    const NULLABLE: bool = A::NULLABLE;

    fn decode(value: &Value) -> DecodeResult<Self> {
        A::decode(value).map(Box::new)
    }

    fn default_value() -> Option<Self> {
        A::default_value().map(Box::new)
    }
}

impl<A: Encode + ?Sized> Encode for Box<A> {
    const DOCUMENT: bool = A::DOCUMENT;
    const NULLABLE: bool = A::NULLABLE;

    fn encode(&self) -> Value {
        (**self).encode()
    }
}

impl<A: Encode + ?Sized> Encode for &A {
    const DOCUMENT: bool = A::DOCUMENT;
    const NULLABLE: bool = A::NULLABLE;

    fn encode(&self) -> Value {
        (**self).encode()
    }
}

impl<A: Decode> Decode for Arc<A> {
    const DOCUMENT: bool = A::DOCUMENT;
    const NULLABLE: bool = A::NULLABLE;

    fn decode(value: &Value) -> DecodeResult<Self> {
        A::decode(value).map(Arc::new)
    }

    fn default_value() -> Option<Self> {
        A::default_value().map(Arc::new)
    }
}

impl<A: Encode + ?Sized> Encode for Arc<A> {
    const DOCUMENT: bool = A::DOCUMENT;
    const NULLABLE: bool = A::NULLABLE;

    fn encode(&self) -> Value {
        (**self).encode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode, encode};
    use crate::error::{DecodeError, Segment};
    use crate::scalar::Int32Codec;

    #[test]
    fn optional_null_is_absent() {
        assert_eq!(decode::<Option<i32>>(&Value::Null).unwrap(), None);
        assert_eq!(decode::<Option<i32>>(&Value::Int32(3)).unwrap(), Some(3));
        assert_eq!(<Option<i32> as Decode>::default_value(), Some(None));
        assert_eq!(encode(&None::<i32>), Value::Null);
    }

    #[test]
    fn optional_inner_error_passes_through() {
        let errors = decode::<Option<i32>>(&Value::from("x")).unwrap_err();
        assert_eq!(
            errors.first().error,
            DecodeError::mismatch(Kind::String, Kind::Int32)
        );
    }

    #[test]
    fn partial_collection_failure_reports_only_bad_positions() {
        let source = Value::Array(vec![
            Value::Int32(0),
            Value::from("one"),
            Value::Int32(2),
            Value::Bool(true),
            Value::Int32(4),
        ]);
        let decoded: DecodeResult<Vec<i32>> = SeqCodec(Int32Codec).decode(&source);
        let errors = decoded.unwrap_err();

        assert_eq!(errors.len(), 2);
        let positions: Vec<_> = errors
            .iter()
            .map(|f| f.path.segments().to_vec())
            .collect();
        assert_eq!(
            positions,
            vec![vec![Segment::Index(1)], vec![Segment::Index(3)]]
        );
    }

    #[test]
    fn sequence_requires_array() {
        let errors = decode::<Vec<i32>>(&Value::Int32(1)).unwrap_err();
        assert_eq!(
            errors.first().error,
            DecodeError::mismatch(Kind::Int32, Kind::Array)
        );
    }

    #[test]
    fn sequence_keeps_order() {
        let items = vec![3, 1, 2];
        let encoded = encode(&items);
        assert_eq!(
            encoded,
            Value::Array(vec![Value::Int32(3), Value::Int32(1), Value::Int32(2)])
        );
        assert_eq!(decode::<Vec<i32>>(&encoded).unwrap(), items);
    }

    #[test]
    fn set_deduplicates() {
        let source = Value::Array(vec![
            Value::from("b"),
            Value::from("a"),
            Value::from("b"),
        ]);
        let set = decode::<BTreeSet<String>>(&source).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(
            encode(&set),
            Value::Array(vec![Value::from("a"), Value::from("b")])
        );
        assert_eq!(decode::<HashSet<String>>(&source).unwrap().len(), 2);
    }

    #[test]
    fn map_errors_are_keyed() {
        let source = Value::Document(
            Document::new()
                .with("ok", 1)
                .with("bad", "x")
                .with("worse", true),
        );
        let errors = decode::<BTreeMap<String, i32>>(&source).unwrap_err();
        let paths: Vec<_> = errors.iter().map(|f| f.path.to_string()).collect();
        assert_eq!(paths, ["bad", "worse"]);

        let map: BTreeMap<String, i32> = [("a".to_string(), 1), ("b".to_string(), 2)].into();
        assert_eq!(decode::<BTreeMap<String, i32>>(&encode(&map)).unwrap(), map);
    }

    #[test]
    fn nested_containers() {
        let nested = vec![Some(vec![1i64, 2]), None, Some(vec![])];
        let encoded = encode(&nested);
        assert_eq!(decode::<Vec<Option<Vec<i64>>>>(&encoded).unwrap(), nested);
    }

    #[test]
    fn boxed_is_transparent() {
        let boxed = Box::new(7i32);
        assert_eq!(encode(&boxed), Value::Int32(7));
        assert_eq!(decode::<Box<i32>>(&Value::Int32(7)).unwrap(), boxed);
    }

    #[test]
    fn hashed_and_queued_containers_round_trip() {
        let queue: VecDeque<i64> = [5, 3, 9].into();
        let encoded = encode(&queue);
        assert_eq!(encoded.as_array().map(|a| a.len()), Some(3));
        assert_eq!(decode::<VecDeque<i64>>(&encoded).unwrap(), queue);

        let set: HashSet<String> = ["x".to_string(), "y".to_string()].into();
        assert_eq!(decode::<HashSet<String>>(&encode(&set)).unwrap(), set);

        let map: HashMap<String, Vec<i32>> =
            [("a".to_string(), vec![1, 2]), ("b".to_string(), vec![])].into();
        let encoded = encode(&map);
        assert_eq!(encoded.kind(), Kind::Document);
        assert_eq!(decode::<HashMap<String, Vec<i32>>>(&encoded).unwrap(), map);
    }

    #[test]
    fn optional_is_nullable_and_its_inner_is_not() {
        assert!(<Option<String> as Decode>::NULLABLE);
        assert!(<Option<String> as Encode>::NULLABLE);
        assert!(!<Vec<Option<String>> as Decode>::NULLABLE);
        assert!(<Arc<Option<i32>> as Encode>::NULLABLE);

        let some = Some(vec![Some(1), None]);
        assert_eq!(decode::<Option<Vec<Option<i32>>>>(&encode(&some)).unwrap(), some);
    }
}
