use proc_macro2::Ident;
use syn::{Attribute, Field, GenericArgument, Lit, LitStr, Meta, MetaNameValue, NestedMeta, PathArguments, Type};

const ORDERS: [(&str, &str); 5] = [
    ("first", "First"),
    ("early", "Early"),
    ("normal", "Normal"),
    ("late", "Late"),
    ("last", "Last"),
];

/// Arguments of one `#[subscribe(..)]` attribute.
#[derive(Debug)]
pub(crate) struct SubscribeMeta {
    pub(crate) order: Option<Ident>,
    pub(crate) accept_cancelled: bool,
}

impl SubscribeMeta {
    pub(crate) fn parse(attr: &Attribute) -> syn::Result<Self> {
        let mut meta = SubscribeMeta {
            order: None,
            accept_cancelled: false,
        };
        match attr.parse_meta()? {
            Meta::Path(_) => {}
            Meta::List(list) => {
                for nested in list.nested {
                    match nested {
                        NestedMeta::Meta(Meta::Path(path)) if path.is_ident("accept_cancelled") => {
                            meta.accept_cancelled = true;
                        }
                        NestedMeta::Meta(Meta::NameValue(MetaNameValue { path, lit: Lit::Bool(value), .. })) if path.is_ident("accept_cancelled") => {
                            meta.accept_cancelled = value.value;
                        }
                        NestedMeta::Meta(Meta::NameValue(MetaNameValue { path, lit: Lit::Str(value), .. })) if path.is_ident("order") => {
                            meta.order = Some(order_variant(&value)?);
                        }
                        other => {
                            return Err(syn::Error::new_spanned(other, "expected `order = \"first|early|normal|late|last\"` or `accept_cancelled`"));
                        }
                    }
                }
            }
            other => {
                return Err(syn::Error::new_spanned(other, "expected #[subscribe] or #[subscribe(..)]"));
            }
        }
        Ok(meta)
    }
}

fn order_variant(value: &LitStr) -> syn::Result<Ident> {
    let order = value.value();
    ORDERS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(&order))
        .map(|(_, variant)| Ident::new(variant, value.span()))
        .ok_or_else(|| syn::Error::new_spanned(value, format!("unknown order {}, expected first, early, normal, late or last", order)))
}

/// What a field of a `#[derive(Event)]` struct stands for.
#[derive(Debug, Default)]
pub(crate) struct FieldRoles {
    pub(crate) parent: bool,
    pub(crate) cancelled: bool,
    pub(crate) result: bool,
}

impl FieldRoles {
    pub(crate) fn parse(field: &Field) -> syn::Result<Self> {
        let mut roles = FieldRoles::default();
        for attr in field.attrs.iter().filter(|attr| attr.path.is_ident("event")) {
            let Meta::List(list) = attr.parse_meta()? else {
                return Err(syn::Error::new_spanned(attr, "expected #[event(parent)], #[event(cancelled)] or #[event(result)]"));
            };
            for nested in list.nested {
                match nested {
                    NestedMeta::Meta(Meta::Path(path)) if path.is_ident("parent") => roles.parent = true,
                    NestedMeta::Meta(Meta::Path(path)) if path.is_ident("cancelled") => roles.cancelled = true,
                    NestedMeta::Meta(Meta::Path(path)) if path.is_ident("result") => roles.result = true,
                    other => {
                        return Err(syn::Error::new_spanned(other, "expected `parent`, `cancelled` or `result`"));
                    }
                }
            }
        }
        Ok(roles)
    }
}

pub(crate) fn is_bool(ty: &Type) -> bool {
    matches!(ty, Type::Path(path) if path.qself.is_none() && path.path.is_ident("bool"))
}

/// `T` of an `Option<T>` field.
pub(crate) fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    let PathArguments::AngleBracketed(arguments) = &segment.arguments else {
        return None;
    };
    match arguments.args.first() {
        Some(GenericArgument::Type(inner)) if arguments.args.len() == 1 => Some(inner),
        _ => None,
    }
}
