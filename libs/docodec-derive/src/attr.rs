use syn::ext::IdentExt;
use syn::{Attribute, Ident, LitStr};

/// `#[docodec(rename_all = "...")]` rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameRule {
    Lower,
    Upper,
    Pascal,
    Camel,
    Snake,
    ScreamingSnake,
    Kebab,
}

impl RenameRule {
    fn parse(lit: &LitStr) -> Result<Self, syn::Error> {
        match lit.value().as_str() {
            "lowercase" => Ok(RenameRule::Lower),
            "UPPERCASE" => Ok(RenameRule::Upper),
            "PascalCase" => Ok(RenameRule::Pascal),
            "camelCase" => Ok(RenameRule::Camel),
            "snake_case" => Ok(RenameRule::Snake),
            "SCREAMING_SNAKE_CASE" => Ok(RenameRule::ScreamingSnake),
            "kebab-case" => Ok(RenameRule::Kebab),
            other => Err(syn::Error::new_spanned(
                lit,
                format!(
                    "unknown rename rule '{other}' (expected lowercase, UPPERCASE, PascalCase, \
                     camelCase, snake_case, SCREAMING_SNAKE_CASE or kebab-case)"
                ),
            )),
        }
    }

    /// Rename a snake_case field identifier.
    pub fn apply_to_field(self, field: &str) -> String {
        match self {
            RenameRule::Lower | RenameRule::Snake => field.to_string(),
            RenameRule::Upper | RenameRule::ScreamingSnake => field.to_ascii_uppercase(),
            RenameRule::Kebab => field.replace('_', "-"),
            RenameRule::Pascal | RenameRule::Camel => {
                let mut out = String::with_capacity(field.len());
                let mut upper = self == RenameRule::Pascal;
                for ch in field.chars() {
                    if ch == '_' {
                        upper = true;
                    } else if upper {
                        out.push(ch.to_ascii_uppercase());
                        upper = false;
                    } else {
                        out.push(ch);
                    }
                }
                out
            }
        }
    }

    /// Rename a PascalCase variant identifier.
    pub fn apply_to_variant(self, variant: &str) -> String {
        match self {
            RenameRule::Pascal => variant.to_string(),
            RenameRule::Lower => variant.to_ascii_lowercase(),
            RenameRule::Upper => variant.to_ascii_uppercase(),
            RenameRule::Camel => {
                let mut chars = variant.chars();
                match chars.next() {
                    Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
                    None => String::new(),
                }
            }
            RenameRule::Snake | RenameRule::ScreamingSnake | RenameRule::Kebab => {
                let mut snake = String::with_capacity(variant.len() + 4);
                for (i, ch) in variant.char_indices() {
                    if ch.is_uppercase() && i > 0 {
                        snake.push('_');
                    }
                    snake.push(ch.to_ascii_lowercase());
                }
                match self {
                    RenameRule::ScreamingSnake => snake.to_ascii_uppercase(),
                    RenameRule::Kebab => snake.replace('_', "-"),
                    _ => snake,
                }
            }
        }
    }
}

/// Options on the struct or enum itself.
#[derive(Default)]
pub struct ContainerAttrs {
    pub tag: Option<LitStr>,
    pub rename_all: Option<RenameRule>,
}

/// How an absent field is filled in.
pub enum FieldDefault {
    /// The field decoder's own default (e.g. `None` for `Option`).
    Decoder,
    /// `Default::default()`.
    Trait,
    /// A user function.
    Path(syn::ExprPath),
}

pub struct FieldAttrs {
    pub rename: Option<String>,
    pub default: FieldDefault,
    pub skip: bool,
}

pub struct VariantAttrs {
    pub rename: Option<String>,
}

fn docodec_attrs(attrs: &[Attribute]) -> impl Iterator<Item = &Attribute> {
    attrs.iter().filter(|a| a.path().is_ident("docodec"))
}

pub fn container(attrs: &[Attribute]) -> Result<ContainerAttrs, syn::Error> {
    let mut out = ContainerAttrs::default();
    for attr in docodec_attrs(attrs) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("tag") {
                let value: LitStr = meta.value()?.parse()?;
                if value.value().is_empty() {
                    return Err(meta.error("tag must not be empty"));
                }
                out.tag = Some(value);
            } else if meta.path.is_ident("rename_all") {
                let value: LitStr = meta.value()?.parse()?;
                out.rename_all = Some(RenameRule::parse(&value)?);
            } else {
                return Err(meta.error("unknown docodec container attribute"));
            }
            Ok(())
        })?;
    }
    Ok(out)
}

pub fn field(attrs: &[Attribute]) -> Result<FieldAttrs, syn::Error> {
    let mut out = FieldAttrs {
        rename: None,
        default: FieldDefault::Decoder,
        skip: false,
    };
    for attr in docodec_attrs(attrs) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let value: LitStr = meta.value()?.parse()?;
                out.rename = Some(value.value());
            } else if meta.path.is_ident("default") {
                out.default = if meta.input.peek(syn::Token![=]) {
                    let value: LitStr = meta.value()?.parse()?;
                    FieldDefault::Path(value.parse()?)
                } else {
                    FieldDefault::Trait
                };
            } else if meta.path.is_ident("skip") {
                out.skip = true;
            } else {
                return Err(meta.error("unknown docodec field attribute"));
            }
            Ok(())
        })?;
    }
    Ok(out)
}

pub fn variant(attrs: &[Attribute]) -> Result<VariantAttrs, syn::Error> {
    let mut out = VariantAttrs { rename: None };
    for attr in docodec_attrs(attrs) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let value: LitStr = meta.value()?.parse()?;
                out.rename = Some(value.value());
            } else {
                return Err(meta.error("unknown docodec variant attribute"));
            }
            Ok(())
        })?;
    }
    Ok(out)
}

/// Identifier as written, without the `r#` prefix.
pub fn ident_name(ident: &Ident) -> String {
    ident.unraw().to_string()
}
