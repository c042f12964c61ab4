use std::sync::OnceLock;

use crate::codec::{Codec, Decoder, Encoder};
use crate::error::DecodeResult;
use crate::value::Value;

/// Deferred, memoized codec handle.
///
/// Built from `init` on first use, then cached for the process lifetime.
/// Hand-assembled codec graphs that refer back to themselves hold a
/// `&'static Deferred<A>` instead of the codec itself, so building the
/// graph never recurses:
///
/// ```ignore
/// static TREE: Deferred<Tree> = Deferred::new(tree_codec);
///
/// fn tree_codec() -> Codec<Tree> {
///     let children = SeqCodec(&TREE);
///     // ... field codecs referring to `children`
/// }
/// ```
///
/// `init` must only capture the handle, never decode or encode through it.
pub struct Deferred<A> {
    cell: OnceLock<Codec<A>>,
    init: fn() -> Codec<A>,
}

impl<A> Deferred<A> {
    pub const fn new(init: fn() -> Codec<A>) -> Self {
        Self {
            cell: OnceLock::new(),
            init,
        }
    }

    pub fn get(&self) -> &Codec<A> {
        self.cell.get_or_init(|| {
            tracing::debug!(codec = std::any::type_name::<A>(), "resolving deferred codec");
            (self.init)()
        })
    }

    pub fn is_resolved(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<A> Decoder<A> for Deferred<A> {
    fn decode(&self, value: &Value) -> DecodeResult<A> {
        self.get().decode(value)
    }

    fn default_value(&self) -> Option<A> {
        self.get().default_value()
    }
}

impl<A> Encoder<A> for Deferred<A> {
    fn encode(&self, value: &A) -> Value {
        self.get().encode(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decoder_fn, encoder_fn};
    use crate::container::{OptionCodec, SeqCodec};
    use crate::error::zip;
    use crate::product::{expect_document, field};
    use crate::scalar::{Int32Codec, StringCodec};
    use crate::value::Document;

    #[derive(Debug, Clone, PartialEq)]
    struct Tree {
        label: String,
        children: Vec<Tree>,
    }

    static TREE: Deferred<Tree> = Deferred::new(tree_codec);

    fn tree_codec() -> Codec<Tree> {
        let children = SeqCodec(&TREE);
        Codec::new(
            decoder_fn(move |value| {
                let doc = expect_document(value)?;
                let (label, children) = zip(
                    field::<String, _>(doc, "label", &StringCodec),
                    field::<Vec<Tree>, _>(doc, "children", &children),
                )?;
                Ok(Tree { label, children })
            }),
            encoder_fn(move |tree: &Tree| {
                Value::Document(
                    Document::new()
                        .with("label", StringCodec.encode(&tree.label))
                        .with("children", children.encode(&tree.children)),
                )
            }),
        )
    }

    fn leaf(label: &str) -> Tree {
        Tree {
            label: label.into(),
            children: Vec::new(),
        }
    }

    #[test]
    fn self_referential_graph_round_trips() {
        let tree = Tree {
            label: "root".into(),
            children: vec![
                Tree {
                    label: "a".into(),
                    children: vec![leaf("a1"), leaf("a2")],
                },
                leaf("b"),
            ],
        };

        let encoded = TREE.encode(&tree);
        assert!(TREE.is_resolved());
        assert_eq!(TREE.decode(&encoded).unwrap(), tree);
    }

    #[test]
    fn nested_errors_are_located() {
        let bad = Value::Document(
            Document::new().with("label", "root").with(
                "children",
                Value::Array(vec![Value::Document(
                    Document::new().with("label", 1).with("children", Value::Array(vec![])),
                )]),
            ),
        );
        let errors = TREE.decode(&bad).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.first().path.to_string(), "children[0].label");
    }

    #[derive(Debug, PartialEq)]
    struct Chain {
        n: i32,
        next: Option<Box<Chain>>,
    }

    static CHAIN: Deferred<Chain> = Deferred::new(chain_codec);

    fn chain_codec() -> Codec<Chain> {
        let next = OptionCodec(&CHAIN);
        Codec::new(
            decoder_fn(move |value| {
                let doc = expect_document(value)?;
                let (n, next) = zip(
                    field::<i32, _>(doc, "n", &Int32Codec),
                    field::<Option<Chain>, _>(doc, "next", &next),
                )?;
                Ok(Chain {
                    n,
                    next: next.map(Box::new),
                })
            }),
            encoder_fn(move |chain: &Chain| {
                let tail = chain.next.as_deref().map(|c| CHAIN.encode(c));
                Value::Document(
                    Document::new()
                        .with("n", Int32Codec.encode(&chain.n))
                        .with("next", tail.unwrap_or(Value::Null)),
                )
            }),
        )
    }

    #[test]
    fn absent_link_uses_optional_default() {
        let source = Value::Document(
            Document::new()
                .with("n", 1)
                .with("next", Value::Document(Document::new().with("n", 2))),
        );
        let chain = CHAIN.decode(&source).unwrap();
        assert_eq!(
            chain,
            Chain {
                n: 1,
                next: Some(Box::new(Chain { n: 2, next: None })),
            }
        );
        assert_eq!(CHAIN.decode(&CHAIN.encode(&chain)).unwrap(), chain);
    }
}
