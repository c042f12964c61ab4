use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::value::Kind;

// ════════════════════════════════════════════════════════════════
//  DecodeError
// ════════════════════════════════════════════════════════════════

/// A single decode failure. Errors are data: decoders return them, never
/// panic on malformed input.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize)]
#[serde(tag = "type", content = "detail", rename_all = "snake_case")]
pub enum DecodeError {
    /// Kind tag did not match. No coercion is attempted.
    #[error("type mismatch: found {actual}, expected {expected}")]
    TypeMismatch { actual: Kind, expected: Kind },

    /// Kind matched but the secondary conversion failed.
    #[error("cannot parse value: {0}")]
    FieldParseError(#[source] ParseCause),

    /// Required field (or discriminator) absent and no default applies.
    #[error("missing field '{0}'")]
    MissingField(String),

    /// Discriminator label is not among the declared alternatives.
    #[error("unknown discriminator '{0}'")]
    UnknownDiscriminator(String),
}

impl DecodeError {
    pub fn mismatch(actual: Kind, expected: Kind) -> Self {
        DecodeError::TypeMismatch { actual, expected }
    }

    pub fn parse(cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        DecodeError::FieldParseError(ParseCause::new(cause))
    }

    pub fn missing(name: impl Into<String>) -> Self {
        DecodeError::MissingField(name.into())
    }
}

/// Underlying cause of a [`DecodeError::FieldParseError`].
///
/// Shared so that error sets stay cheap to clone. Two causes are equal
/// when they render the same message.
#[derive(Clone)]
pub struct ParseCause(Arc<dyn std::error::Error + Send + Sync>);

impl ParseCause {
    pub fn new(cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self(Arc::new(cause))
    }

    /// Cause from a plain message, for conversions without an error type.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(Message(message.into()))
    }

    pub fn inner(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        &*self.0
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct Message(String);

impl fmt::Debug for ParseCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for ParseCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl std::error::Error for ParseCause {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl PartialEq for ParseCause {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.to_string() == other.to_string()
    }
}

impl Serialize for ParseCause {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ════════════════════════════════════════════════════════════════
//  Path
// ════════════════════════════════════════════════════════════════

/// One step into a value tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Field(String),
    Index(usize),
}

/// Location of a failure inside the decoded value, outermost step first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path(Vec<Segment>);

impl Path {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    fn prepend(&mut self, segment: Segment) {
        self.0.insert(0, segment);
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "$");
        }
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                Segment::Field(name) if i == 0 => write!(f, "{name}")?,
                Segment::Field(name) => write!(f, ".{name}")?,
                Segment::Index(idx) => write!(f, "[{idx}]")?,
            }
        }
        Ok(())
    }
}

impl Serialize for Path {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ════════════════════════════════════════════════════════════════
//  DecodeErrors
// ════════════════════════════════════════════════════════════════

/// A located [`DecodeError`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    pub path: Path,
    pub error: DecodeError,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.error)
    }
}

/// Non-empty ordered set of failures from one decode attempt.
///
/// Order is encounter order. Exact duplicates (same path and error) are
/// recorded once.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeErrors {
    head: Failure,
    tail: Vec<Failure>,
}

pub type DecodeResult<A> = Result<A, DecodeErrors>;

impl DecodeErrors {
    /// One failure at the root of the value being decoded.
    pub fn single(error: DecodeError) -> Self {
        Self::at(Path::root(), error)
    }

    pub fn at(path: Path, error: DecodeError) -> Self {
        Self {
            head: Failure { path, error },
            tail: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        1 + self.tail.len()
    }

    pub fn first(&self) -> &Failure {
        &self.head
    }

    pub fn iter(&self) -> impl Iterator<Item = &Failure> {
        std::iter::once(&self.head).chain(self.tail.iter())
    }

    /// The bare errors, without their paths.
    pub fn errors(&self) -> impl Iterator<Item = &DecodeError> {
        self.iter().map(|f| &f.error)
    }

    pub fn push(&mut self, failure: Failure) {
        if !self.iter().any(|f| f == &failure) {
            self.tail.push(failure);
        }
    }

    /// Append `other` after the failures already recorded.
    pub fn extend(&mut self, other: DecodeErrors) {
        for failure in other {
            self.push(failure);
        }
    }

    /// Locate every failure one step deeper, under `segment`.
    pub fn prefixed(mut self, segment: Segment) -> Self {
        self.head.path.prepend(segment.clone());
        for failure in &mut self.tail {
            failure.path.prepend(segment.clone());
        }
        self
    }

    pub fn in_field(self, name: impl Into<String>) -> Self {
        self.prefixed(Segment::Field(name.into()))
    }

    pub fn in_index(self, index: usize) -> Self {
        self.prefixed(Segment::Index(index))
    }
}

impl From<DecodeError> for DecodeErrors {
    fn from(error: DecodeError) -> Self {
        Self::single(error)
    }
}

impl IntoIterator for DecodeErrors {
    type Item = Failure;
    type IntoIter = std::iter::Chain<std::iter::Once<Failure>, std::vec::IntoIter<Failure>>;

    fn into_iter(self) -> Self::IntoIter {
        std::iter::once(self.head).chain(self.tail)
    }
}

impl fmt::Display for DecodeErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for DecodeErrors {}

impl Serialize for DecodeErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

// ════════════════════════════════════════════════════════════════
//  Accumulation
// ════════════════════════════════════════════════════════════════

/// Combine two independent decode attempts.
///
/// Both succeed: the pair. Otherwise every failing side's errors,
/// left side first. Never short-circuits on the first failure.
pub fn zip<A, B>(a: DecodeResult<A>, b: DecodeResult<B>) -> DecodeResult<(A, B)> {
    match (a, b) {
        (Ok(a), Ok(b)) => Ok((a, b)),
        (Err(mut left), Err(right)) => {
            left.extend(right);
            Err(left)
        }
        (Err(e), Ok(_)) | (Ok(_), Err(e)) => Err(e),
    }
}

/// Combine any number of independent decode attempts into a collection.
///
/// Every attempt is consumed; the errors of all failing attempts are
/// concatenated in encounter order.
pub fn accumulate<A, C, I>(attempts: I) -> DecodeResult<C>
where
    I: IntoIterator<Item = DecodeResult<A>>,
    C: FromIterator<A>,
{
    let mut values = Vec::new();
    let mut errors: Option<DecodeErrors> = None;
    for attempt in attempts {
        match attempt {
            Ok(v) => values.push(v),
            Err(e) => {
                errors = Some(match errors.take() {
                    Some(mut acc) => {
                        acc.extend(e);
                        acc
                    }
                    None => e,
                });
            }
        }
    }
    match errors {
        Some(e) => Err(e),
        None => Ok(values.into_iter().collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn missing(name: &str) -> DecodeErrors {
        DecodeErrors::single(DecodeError::missing(name))
    }

    #[test]
    fn zip_keeps_both_sides() {
        let r: DecodeResult<(i32, i32)> = zip(Err(missing("a")), Err(missing("b")));
        let errors = r.unwrap_err();
        let names: Vec<_> = errors.errors().cloned().collect();
        assert_eq!(
            names,
            vec![DecodeError::missing("a"), DecodeError::missing("b")]
        );
    }

    #[test]
    fn zip_success() {
        assert_eq!(zip::<_, _>(Ok(1), Ok("x")).unwrap(), (1, "x"));
    }

    #[test]
    fn accumulate_collects_every_failure() {
        let attempts = vec![
            Ok(1),
            Err(missing("x").in_index(1)),
            Ok(3),
            Err(missing("x").in_index(3)),
        ];
        let errors = accumulate::<i32, Vec<_>, _>(attempts).unwrap_err();
        assert_eq!(errors.len(), 2);
        let paths: Vec<_> = errors.iter().map(|f| f.path.to_string()).collect();
        assert_eq!(paths, ["[1]", "[3]"]);
    }

    #[test]
    fn duplicates_are_recorded_once() {
        let mut errors = missing("a");
        errors.extend(missing("a"));
        errors.extend(missing("a").in_field("inner"));
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn path_rendering() {
        let errors = missing("zip")
            .in_index(3)
            .in_field("lines")
            .in_field("address");
        assert_eq!(errors.first().path.to_string(), "address.lines[3]");
        assert_eq!(Path::root().to_string(), "$");
        assert_eq!(
            errors.to_string(),
            "address.lines[3]: missing field 'zip'"
        );
    }

    #[test]
    fn parse_cause_is_preserved() {
        let err = DecodeError::parse("x".parse::<i32>().unwrap_err());
        match &err {
            DecodeError::FieldParseError(cause) => {
                assert!(cause.to_string().contains("invalid digit"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(err, DecodeError::FieldParseError(ParseCause::msg("invalid digit found in string")));
    }

    #[test]
    fn report_serializes_with_paths() {
        let errors = DecodeErrors::single(DecodeError::mismatch(Kind::String, Kind::Int32))
            .in_field("age");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{
                "path": "age",
                "error": {
                    "type": "type_mismatch",
                    "detail": { "actual": "string", "expected": "int32" }
                }
            }])
        );
    }
}
