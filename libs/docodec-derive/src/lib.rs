mod attr;

use std::collections::HashSet;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, parse_quote, Data, DataEnum, DeriveInput, Fields, FieldsNamed, Generics,
    Ident, LitStr, Type,
};

use attr::{ContainerAttrs, FieldDefault, RenameRule};

/// Derive `docodec::Decode`.
///
/// - struct with named fields: a document, one entry per field. Every
///   field is attempted; failures accumulate.
/// - newtype struct: transparent, decodes as its single field.
/// - unit struct: any document.
/// - enum: a document tagged with the variant label under the
///   discriminator key (`_type` unless `#[docodec(tag = "...")]`).
///
/// Attributes:
///
/// ```ignore
/// #[derive(Decode, Encode)]
/// #[docodec(tag = "kind", rename_all = "snake_case")]
/// enum Shape {
///     Circle { radius: f64 },
///     #[docodec(rename = "sq")]
///     Square(Square),
///     Empty,
/// }
///
/// #[derive(Decode, Encode)]
/// struct Square {
///     #[docodec(rename = "s")]
///     side: f64,
///     #[docodec(default)]
///     rotated: bool,
///     #[docodec(default = "default_color")]
///     color: String,
///     #[docodec(skip)]
///     cache: Option<f64>,
/// }
/// ```
#[proc_macro_derive(Decode, attributes(docodec))]
pub fn derive_decode(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match decode_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

/// Derive `docodec::Encode`. Layout mirrors [`derive_decode`]; fields are
/// written in declaration order.
#[proc_macro_derive(Encode, attributes(docodec))]
pub fn derive_encode(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match encode_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

// ════════════════════════════════════════════════════════════════
//  Shape analysis
// ════════════════════════════════════════════════════════════════

/// A named field with its resolved document key.
struct FieldSpec<'a> {
    ident: &'a Ident,
    ty: &'a Type,
    key: String,
    default: FieldDefault,
    skip: bool,
}

fn named_fields<'a>(
    fields: &'a FieldsNamed,
    rename_all: Option<RenameRule>,
) -> Result<Vec<FieldSpec<'a>>, syn::Error> {
    let mut specs = Vec::with_capacity(fields.named.len());
    let mut seen = HashSet::new();
    for field in &fields.named {
        let ident = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new_spanned(field, "expected named field"))?;
        let attrs = attr::field(&field.attrs)?;
        let key = match attrs.rename {
            Some(key) => key,
            None => {
                let name = attr::ident_name(ident);
                match rename_all {
                    Some(rule) => rule.apply_to_field(&name),
                    None => name,
                }
            }
        };
        if !attrs.skip && !seen.insert(key.clone()) {
            return Err(syn::Error::new_spanned(
                ident,
                format!("duplicate document key '{key}'"),
            ));
        }
        specs.push(FieldSpec {
            ident,
            ty: &field.ty,
            key,
            default: attrs.default,
            skip: attrs.skip,
        });
    }
    Ok(specs)
}

/// The single field of a newtype struct or variant.
fn newtype_field<'a>(fields: &'a Fields, what: &str) -> Result<Option<&'a Type>, syn::Error> {
    match fields {
        Fields::Unnamed(unnamed) if unnamed.unnamed.len() == 1 => Ok(Some(&unnamed.unnamed[0].ty)),
        Fields::Unnamed(unnamed) => Err(syn::Error::new_spanned(
            unnamed,
            format!("{what} must have exactly one unnamed field; use named fields instead"),
        )),
        _ => Ok(None),
    }
}

/// `tag` only means something on enums.
fn reject_struct_tag(input: &DeriveInput, container: &ContainerAttrs) -> Result<(), syn::Error> {
    match (&input.data, &container.tag) {
        (Data::Struct(_), Some(tag)) => Err(syn::Error::new_spanned(
            tag,
            "`tag` applies to enums only; a struct encodes without a discriminator",
        )),
        _ => Ok(()),
    }
}

fn bounded(generics: &Generics, bound: TokenStream2) -> Generics {
    let mut generics = generics.clone();
    let params: Vec<Ident> = generics.type_params().map(|p| p.ident.clone()).collect();
    let where_clause = generics.make_where_clause();
    for param in params {
        where_clause.predicates.push(parse_quote!(#param: #bound));
    }
    generics
}

// ════════════════════════════════════════════════════════════════
//  Decode
// ════════════════════════════════════════════════════════════════

fn decode_impl(input: &DeriveInput) -> Result<TokenStream2, syn::Error> {
    let name = &input.ident;
    let container = attr::container(&input.attrs)?;
    reject_struct_tag(input, &container)?;

    let (consts, body) = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => {
                let specs = named_fields(fields, container.rename_all)?;
                let record = decode_record(&specs, &name.to_string(), quote!(Self), quote!(__doc));
                (
                    quote!(const DOCUMENT: bool = true;),
                    quote! {
                        let __doc = ::docodec::product::expect_document(__value)?;
                        #record
                    },
                )
            }
            Fields::Unnamed(_) => {
                let ty = newtype_field(&data.fields, "tuple structs")?
                    .ok_or_else(|| syn::Error::new_spanned(name, "expected one field"))?;
                (
                    quote! {
                        const DOCUMENT: bool = <#ty as ::docodec::Decode>::DOCUMENT;
                        const NULLABLE: bool = <#ty as ::docodec::Decode>::NULLABLE;
                    },
                    quote! {
                        <#ty as ::docodec::Decode>::decode(__value).map(|__inner| Self(__inner))
                    },
                )
            }
            Fields::Unit => (
                quote!(const DOCUMENT: bool = true;),
                quote! {
                    ::docodec::product::expect_document(__value)?;
                    ::core::result::Result::Ok(Self)
                },
            ),
        },
        Data::Enum(data) => (
            quote!(const DOCUMENT: bool = true;),
            decode_union(name, &container, data)?,
        ),
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                name,
                "Decode cannot be derived for unions",
            ));
        }
    };

    // Newtypes keep their inner type's default (e.g. `Option`).
    let default_value = match &input.data {
        Data::Struct(data) => match newtype_field(&data.fields, "tuple structs")? {
            Some(ty) => quote! {
                fn default_value() -> ::core::option::Option<Self> {
                    <#ty as ::docodec::Decode>::default_value().map(|__inner| Self(__inner))
                }
            },
            None => quote!(),
        },
        _ => quote!(),
    };

    let generics = bounded(&input.generics, quote!(::docodec::Decode));
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::docodec::Decode for #name #ty_generics #where_clause {
            #consts

            fn decode(__value: &::docodec::Value) -> ::docodec::DecodeResult<Self> {
                #body
            }

            #default_value
        }
    })
}

/// Decode every field of a record from `doc` and build it with `ctor`.
///
/// Field results are folded with `zip`, giving the nested tuple
/// `(((), f0), f1)…` which the final closure destructures.
fn decode_record(
    specs: &[FieldSpec<'_>],
    type_name: &str,
    ctor: TokenStream2,
    doc: TokenStream2,
) -> TokenStream2 {
    let mut fold = quote! {
        ::core::result::Result::<(), ::docodec::DecodeErrors>::Ok(())
    };
    let mut pattern = quote!(());
    let mut inits = Vec::with_capacity(specs.len());

    for (i, spec) in specs.iter().enumerate() {
        let ident = spec.ident;
        let ty = spec.ty;
        let key = &spec.key;

        if spec.skip {
            let value = match &spec.default {
                FieldDefault::Path(path) => quote!(#path()),
                _ => quote!(::core::default::Default::default()),
            };
            inits.push(quote!(#ident: #value));
            continue;
        }

        let var = format_ident!("__f{}", i);
        let decoder = quote!(&::docodec::Resolved::<#ty>::new());
        let attempt = match &spec.default {
            FieldDefault::Decoder => quote! {
                ::docodec::product::field::<#ty, _>(#doc, #key, #decoder)
            },
            FieldDefault::Trait => quote! {
                ::docodec::product::field_or_else::<#ty, _, _>(
                    #doc, #key, #decoder, ::core::default::Default::default,
                )
            },
            FieldDefault::Path(path) => quote! {
                ::docodec::product::field_or_else::<#ty, _, _>(#doc, #key, #decoder, #path)
            },
        };
        fold = quote!(::docodec::error::zip(#fold, #attempt));
        pattern = quote!((#pattern, #var));
        inits.push(quote!(#ident: #var));
    }

    quote! {
        ::docodec::product::finish(
            #type_name,
            #fold.map(|#pattern| #ctor { #(#inits),* }),
        )
    }
}

fn variant_label(
    variant: &syn::Variant,
    rename_all: Option<RenameRule>,
) -> Result<String, syn::Error> {
    let attrs = attr::variant(&variant.attrs)?;
    Ok(match attrs.rename {
        Some(label) => label,
        None => {
            let name = attr::ident_name(&variant.ident);
            match rename_all {
                Some(rule) => rule.apply_to_variant(&name),
                None => name,
            }
        }
    })
}

fn union_tag(container: &ContainerAttrs) -> LitStr {
    container
        .tag
        .clone()
        .unwrap_or_else(|| LitStr::new("_type", proc_macro2::Span::call_site()))
}

/// Labels must be unique and struct-variant keys must not shadow the tag.
fn check_union(
    name: &Ident,
    container: &ContainerAttrs,
    data: &DataEnum,
) -> Result<Vec<String>, syn::Error> {
    let tag = union_tag(container).value();
    let mut labels = Vec::with_capacity(data.variants.len());
    let mut seen = HashSet::new();
    for variant in &data.variants {
        let label = variant_label(variant, container.rename_all)?;
        if !seen.insert(label.clone()) {
            return Err(syn::Error::new_spanned(
                &variant.ident,
                format!("duplicate discriminator label '{label}' in {name}"),
            ));
        }
        if let Fields::Named(fields) = &variant.fields {
            for spec in named_fields(fields, None)? {
                if !spec.skip && spec.key == tag {
                    return Err(syn::Error::new_spanned(
                        spec.ident,
                        format!("field key '{tag}' collides with the discriminator key"),
                    ));
                }
            }
        }
        labels.push(label);
    }
    Ok(labels)
}

fn decode_union(
    name: &Ident,
    container: &ContainerAttrs,
    data: &DataEnum,
) -> Result<TokenStream2, syn::Error> {
    let tag = union_tag(container);
    let labels = check_union(name, container, data)?;
    let type_name = name.to_string();

    let mut arms = Vec::with_capacity(data.variants.len());
    for (variant, label) in data.variants.iter().zip(&labels) {
        let ident = &variant.ident;
        let arm = match &variant.fields {
            Fields::Unit => quote! {
                #label => ::core::result::Result::Ok(Self::#ident),
            },
            Fields::Named(fields) => {
                let specs = named_fields(fields, None)?;
                let record = decode_record(
                    &specs,
                    &format!("{type_name}::{ident}"),
                    quote!(Self::#ident),
                    quote!(__tagged.doc),
                );
                quote! {
                    #label => { #record }
                }
            }
            Fields::Unnamed(_) => {
                let ty = newtype_field(&variant.fields, "enum variants")?
                    .ok_or_else(|| syn::Error::new_spanned(ident, "expected one field"))?;
                quote! {
                    #label => {
                        let __decoder = ::docodec::Resolved::<#ty>::new();
                        let __payload = if <#ty as ::docodec::Decode>::DOCUMENT {
                            __tagged.payload(&__decoder)
                        } else {
                            ::docodec::product::field::<#ty, _>(
                                __tagged.doc,
                                ::docodec::coproduct::CONTENT_KEY,
                                &__decoder,
                            )
                        };
                        __payload.map(Self::#ident)
                    }
                }
            }
        };
        arms.push(arm);
    }

    Ok(quote! {
        let __tagged = ::docodec::coproduct::split(__value, #tag)?;
        match __tagged.label {
            #(#arms)*
            __other => ::docodec::coproduct::unknown(#type_name, __other),
        }
    })
}

// ════════════════════════════════════════════════════════════════
//  Encode
// ════════════════════════════════════════════════════════════════

fn encode_impl(input: &DeriveInput) -> Result<TokenStream2, syn::Error> {
    let name = &input.ident;
    let container = attr::container(&input.attrs)?;
    reject_struct_tag(input, &container)?;

    let (consts, body) = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => {
                let specs = named_fields(fields, container.rename_all)?;
                let bindings: Vec<TokenStream2> = specs
                    .iter()
                    .map(|spec| {
                        let ident = spec.ident;
                        quote!(&self.#ident)
                    })
                    .collect();
                let record = encode_record(&specs, &bindings, None);
                (quote!(const DOCUMENT: bool = true;), record)
            }
            Fields::Unnamed(_) => {
                let ty = newtype_field(&data.fields, "tuple structs")?
                    .ok_or_else(|| syn::Error::new_spanned(name, "expected one field"))?;
                (
                    quote! {
                        const DOCUMENT: bool = <#ty as ::docodec::Encode>::DOCUMENT;
                        const NULLABLE: bool = <#ty as ::docodec::Encode>::NULLABLE;
                    },
                    quote!(::docodec::Encode::encode(&self.0)),
                )
            }
            Fields::Unit => (
                quote!(const DOCUMENT: bool = true;),
                quote!(::docodec::Value::Document(::docodec::Document::new())),
            ),
        },
        Data::Enum(data) => (
            quote!(const DOCUMENT: bool = true;),
            encode_union(name, &container, data)?,
        ),
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                name,
                "Encode cannot be derived for unions",
            ));
        }
    };

    let generics = bounded(&input.generics, quote!(::docodec::Encode));
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::docodec::Encode for #name #ty_generics #where_clause {
            #consts

            fn encode(&self) -> ::docodec::Value {
                #body
            }
        }
    })
}

/// Build a fresh document, optionally led by a discriminator entry, then
/// one entry per non-skipped field in declaration order.
fn encode_record(
    specs: &[FieldSpec<'_>],
    bindings: &[TokenStream2],
    tag: Option<(&LitStr, &str)>,
) -> TokenStream2 {
    let inserts: Vec<TokenStream2> = specs
        .iter()
        .zip(bindings)
        .filter(|(spec, _)| !spec.skip)
        .map(|(spec, binding)| {
            let key = &spec.key;
            quote! {
                __doc.insert(#key, ::docodec::Encode::encode(#binding));
            }
        })
        .collect();
    let capacity = inserts.len() + usize::from(tag.is_some());
    let head = tag.map(|(tag, label)| quote!(__doc.insert(#tag, #label);));

    quote! {
        let mut __doc = ::docodec::Document::with_capacity(#capacity);
        #head
        #(#inserts)*
        ::docodec::Value::Document(__doc)
    }
}

fn encode_union(
    name: &Ident,
    container: &ContainerAttrs,
    data: &DataEnum,
) -> Result<TokenStream2, syn::Error> {
    let tag = union_tag(container);
    let labels = check_union(name, container, data)?;

    let mut arms = Vec::with_capacity(data.variants.len());
    for (variant, label) in data.variants.iter().zip(&labels) {
        let ident = &variant.ident;
        let arm = match &variant.fields {
            Fields::Unit => quote! {
                Self::#ident => ::docodec::coproduct::unit(#tag, #label),
            },
            Fields::Named(fields) => {
                let specs = named_fields(fields, None)?;
                let vars: Vec<Ident> = (0..specs.len()).map(|i| format_ident!("__f{}", i)).collect();
                let idents: Vec<&Ident> = specs.iter().map(|s| s.ident).collect();
                let bindings: Vec<TokenStream2> = vars.iter().map(|v| quote!(#v)).collect();
                let record = encode_record(&specs, &bindings, Some((&tag, label)));
                quote! {
                    #[allow(unused_variables)]
                    Self::#ident { #(#idents: #vars),* } => { #record }
                }
            }
            Fields::Unnamed(_) => {
                let ty = newtype_field(&variant.fields, "enum variants")?
                    .ok_or_else(|| syn::Error::new_spanned(ident, "expected one field"))?;
                quote! {
                    Self::#ident(__payload) => ::docodec::coproduct::tagged(
                        #tag,
                        #label,
                        <#ty as ::docodec::Encode>::DOCUMENT,
                        ::docodec::Encode::encode(__payload),
                    ),
                }
            }
        };
        arms.push(arm);
    }

    if arms.is_empty() {
        return Ok(quote!(match *self {}));
    }
    Ok(quote! {
        match self {
            #(#arms)*
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_on_a_struct_is_rejected() {
        let input: DeriveInput = parse_quote! {
            #[docodec(tag = "kind")]
            struct Point { x: i32 }
        };
        let err = decode_impl(&input).unwrap_err();
        assert!(err.to_string().contains("enums only"));
        assert!(encode_impl(&input).is_err());
    }

    #[test]
    fn tag_on_an_enum_is_accepted() {
        let input: DeriveInput = parse_quote! {
            #[docodec(tag = "kind")]
            enum Shape { Empty }
        };
        assert!(decode_impl(&input).is_ok());
        assert!(encode_impl(&input).is_ok());
    }

    #[test]
    fn newtype_forwards_nullability() {
        let input: DeriveInput = parse_quote! {
            struct MaybeName(Option<String>);
        };
        let tokens = encode_impl(&input).unwrap().to_string();
        assert!(tokens.contains("NULLABLE"));
    }
}
