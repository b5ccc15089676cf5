use proc_macro2::TokenStream;
use quote::quote;
use syn::{FnArg, ImplItem, ImplItemMethod, ItemImpl, ReturnType, Type, TypeReference};

use crate::metadata::SubscribeMeta;
use crate::with_crate;

pub(crate) fn expand(args: TokenStream, mut item: ItemImpl) -> syn::Result<TokenStream> {
    if !args.is_empty() {
        return Err(syn::Error::new_spanned(args, "#[listener] does not take arguments"));
    }
    if let Some((_, path, _)) = &item.trait_ {
        return Err(syn::Error::new_spanned(path, "#[listener] must be placed on an inherent impl block"));
    }
    let mut subscribers = vec![];
    for impl_item in item.items.iter_mut() {
        let ImplItem::Method(method) = impl_item else {
            continue;
        };
        let Some(position) = method.attrs.iter().position(|attr| attr.path.is_ident("subscribe")) else {
            continue;
        };
        let attr = method.attrs.remove(position);
        if let Some(duplicate) = method.attrs.iter().find(|attr| attr.path.is_ident("subscribe")) {
            return Err(syn::Error::new_spanned(duplicate, "duplicate #[subscribe] attribute"));
        }
        let meta = SubscribeMeta::parse(&attr)?;
        subscribers.push(expand_subscriber(method, meta)?);
    }

    let listener = with_crate(quote!(Listener));
    let generated = with_crate(quote!(GeneratedSubscriber));
    let self_ty = &item.self_ty;
    let (impl_generics, _, where_clause) = item.generics.split_for_impl();
    Ok(quote! {
        #item

        impl #impl_generics #listener for #self_ty #where_clause {
            fn subscriptions() -> ::std::vec::Vec<#generated<Self>> {
                ::std::vec![#(#subscribers),*]
            }
        }
    })
}

fn expand_subscriber(method: &ImplItemMethod, meta: SubscribeMeta) -> syn::Result<TokenStream> {
    let sig = &method.sig;
    let name = &sig.ident;
    if sig.asyncness.is_some() {
        return Err(syn::Error::new_spanned(sig, format!("subscriber {} cannot be async", name)));
    }
    let mut inputs = sig.inputs.iter();
    match inputs.next() {
        Some(FnArg::Receiver(receiver)) if receiver.reference.is_some() && receiver.mutability.is_none() => {}
        _ => return Err(syn::Error::new_spanned(sig, format!("subscriber {} must take &self", name))),
    }
    let params = inputs.collect::<Vec<_>>();
    let [FnArg::Typed(param)] = params.as_slice() else {
        return Err(syn::Error::new_spanned(&sig.inputs, format!("subscriber {} must take exactly one event parameter", name)));
    };
    let Type::Reference(TypeReference { mutability: Some(_), elem: event_ty, .. }) = &*param.ty else {
        return Err(syn::Error::new_spanned(&param.ty, format!("event parameter of subscriber {} must be `&mut EventType`", name)));
    };

    let call = match &sig.output {
        ReturnType::Default => quote! {
            listener.#name(event);
            ::core::result::Result::Ok(())
        },
        ReturnType::Type(..) => quote! {
            ::core::result::Result::map_err(listener.#name(event), ::core::convert::Into::into)
        },
    };
    let generated = with_crate(quote!(GeneratedSubscriber));
    let post_order = with_crate(quote!(PostOrder));
    let SubscribeMeta { order, accept_cancelled } = meta;
    let order = match order {
        Some(order) => quote!(::core::option::Option::Some(#post_order::#order)),
        None => quote!(::core::option::Option::None),
    };
    Ok(quote! {
        #generated::new::<#event_ty, _>(
            ::core::stringify!(#name),
            #order,
            #accept_cancelled,
            |listener: &Self, event: &mut #event_ty| { #call },
        )
    })
}
