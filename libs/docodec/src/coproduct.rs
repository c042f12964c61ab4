//! Runtime half of tagged-union derivation.
//!
//! An encoded alternative is a document carrying a discriminator entry
//! (`tag → label`) in front of the alternative's own content:
//!
//! - unit alternative: `{ _type: "Empty" }`
//! - record alternative: `{ _type: "Circle", radius: 1.0 }`
//! - alternative whose payload is not a document: `{ _type: "Count", value: 3 }`
//!
//! The tag and [`CONTENT_KEY`] are reserved. A document payload that
//! already holds either key is nested under [`CONTENT_KEY`] instead of
//! being merged, so `{ _type: "Wrap", value: { _type: "Inner", .. } }`.

use crate::codec::Decoder;
use crate::error::{DecodeError, DecodeErrors, DecodeResult};
use crate::product::{expect_document, field};
use crate::scalar::mismatch;
use crate::value::{Document, Kind, Value};

/// Discriminator key used when the union does not configure one.
pub const DEFAULT_TAG: &str = "_type";

/// Key holding a payload that is not merged into the tagged document.
pub const CONTENT_KEY: &str = "value";

/// A tagged document, borrowed, with its discriminator label read.
#[derive(Debug)]
pub struct Tagged<'a> {
    pub label: &'a str,
    pub doc: &'a Document,
    tag: &'a str,
}

impl Tagged<'_> {
    /// The document without its discriminator entry.
    pub fn content(&self) -> Document {
        self.doc
            .iter()
            .filter(|(key, _)| *key != self.tag)
            .map(|(key, value)| (key, value.clone()))
            .collect()
    }

    /// Payload of an alternative whose type always encodes to a document:
    /// nested under [`CONTENT_KEY`] when that key is present, merged
    /// otherwise.
    pub fn payload<A, D: Decoder<A>>(&self, decoder: &D) -> DecodeResult<A> {
        if self.doc.contains_key(CONTENT_KEY) {
            field(self.doc, CONTENT_KEY, decoder)
        } else {
            decoder.decode(&Value::Document(self.content()))
        }
    }
}

/// Read the discriminator of `value`.
///
/// Not a document: `TypeMismatch`. Tag absent: `MissingField(tag)`.
/// Tag not a string: `TypeMismatch`, located at the tag.
pub fn split<'a>(value: &'a Value, tag: &'a str) -> DecodeResult<Tagged<'a>> {
    let doc = expect_document(value)?;
    let label = match doc.get(tag) {
        None => return Err(DecodeErrors::single(DecodeError::missing(tag))),
        Some(raw) => raw
            .as_str()
            .ok_or_else(|| mismatch(raw, Kind::String).in_field(tag))?,
    };
    Ok(Tagged { label, doc, tag })
}

pub fn unknown<A>(type_name: &'static str, label: &str) -> DecodeResult<A> {
    tracing::trace!(coproduct = type_name, label, "unknown discriminator");
    Err(DecodeErrors::single(DecodeError::UnknownDiscriminator(
        label.to_string(),
    )))
}

/// Inject the discriminator into an encoded payload.
///
/// With `inline` set and a document payload holding neither the tag nor
/// [`CONTENT_KEY`], the tag goes in front of the payload's own entries.
/// Otherwise the payload is nested under [`CONTENT_KEY`].
pub fn tagged(tag: &str, label: &str, inline: bool, payload: Value) -> Value {
    match payload {
        Value::Document(mut doc)
            if inline && !doc.contains_key(tag) && !doc.contains_key(CONTENT_KEY) =>
        {
            doc.insert_first(tag, label);
            Value::Document(doc)
        }
        other => Value::Document(
            Document::with_capacity(2)
                .with(tag, label)
                .with(CONTENT_KEY, other),
        ),
    }
}

/// Document for an alternative without payload.
pub fn unit(tag: &str, label: &str) -> Value {
    Value::Document(Document::new().with(tag, label))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_reads_the_label() {
        let value = Value::Document(Document::new().with("r", 1.0).with("_type", "Circle"));
        let tagged = split(&value, DEFAULT_TAG).unwrap();
        assert_eq!(tagged.label, "Circle");
        assert_eq!(tagged.doc.len(), 2);
        assert_eq!(tagged.content(), Document::new().with("r", 1.0));
    }

    #[test]
    fn missing_tag_is_a_missing_field() {
        let value = Value::Document(Document::new().with("r", 1.0));
        let errors = split(&value, DEFAULT_TAG).unwrap_err();
        assert_eq!(errors.first().error, DecodeError::missing("_type"));
    }

    #[test]
    fn non_string_tag_is_a_mismatch_at_the_tag() {
        let value = Value::Document(Document::new().with("_type", 3));
        let errors = split(&value, DEFAULT_TAG).unwrap_err();
        assert_eq!(
            errors.first().error,
            DecodeError::mismatch(Kind::Int32, Kind::String)
        );
        assert_eq!(errors.first().path.to_string(), "_type");
    }

    #[test]
    fn tag_goes_first() {
        let payload = Value::Document(Document::new().with("side", 2.0));
        let encoded = tagged("kind", "Square", true, payload);
        let doc = encoded.as_document().unwrap();
        let keys: Vec<_> = doc.keys().collect();
        assert_eq!(keys, ["kind", "side"]);
    }

    #[test]
    fn scalar_payload_is_nested() {
        let encoded = tagged("kind", "Count", false, Value::Int32(3));
        assert_eq!(
            encoded,
            Value::Document(Document::new().with("kind", "Count").with("value", 3))
        );
    }

    #[test]
    fn payload_holding_a_reserved_key_is_nested() {
        let inner = Value::Document(Document::new().with("_type", "A").with("x", 1));
        let encoded = tagged("_type", "Wrap", true, inner.clone());
        assert_eq!(
            encoded,
            Value::Document(Document::new().with("_type", "Wrap").with("value", inner.clone()))
        );

        let content = Value::Document(Document::new().with("value", 2));
        let encoded = tagged("kind", "Boxed", true, content.clone());
        assert_eq!(encoded.as_document().and_then(|d| d.get("value")), Some(&content));
    }

    #[test]
    fn payload_reads_nested_or_merged_content() {
        use crate::codec::Resolved;
        use std::collections::BTreeMap;

        let decoder = Resolved::<BTreeMap<String, i32>>::new();

        let merged = Value::Document(Document::new().with("_type", "M").with("a", 1));
        let parts = split(&merged, DEFAULT_TAG).unwrap();
        assert_eq!(
            parts.payload(&decoder).unwrap(),
            BTreeMap::from([("a".to_string(), 1)])
        );

        let nested = Value::Document(
            Document::new()
                .with("_type", "M")
                .with("value", Document::new().with("_type", 5)),
        );
        let parts = split(&nested, DEFAULT_TAG).unwrap();
        assert_eq!(
            parts.payload(&decoder).unwrap(),
            BTreeMap::from([("_type".to_string(), 5)])
        );
    }
}
