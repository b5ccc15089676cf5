use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Index, Member, parse_quote, Type};

use crate::metadata::{FieldRoles, is_bool, option_inner};
use crate::with_crate;

pub(crate) fn expand(ast: &DeriveInput) -> syn::Result<TokenStream> {
    let Data::Struct(data) = &ast.data else {
        return Err(syn::Error::new_spanned(&ast.ident, "#[derive(Event)] only supports structs"));
    };
    let mut parents: Vec<(Member, &Type)> = vec![];
    let mut cancelled: Option<Member> = None;
    let mut result: Option<(Member, &Type)> = None;
    for (index, field) in data.fields.iter().enumerate() {
        let roles = FieldRoles::parse(field)?;
        let member = match &field.ident {
            Some(ident) => Member::Named(ident.clone()),
            None => Member::Unnamed(Index::from(index)),
        };
        if roles.parent {
            parents.push((member.clone(), &field.ty));
        }
        if roles.cancelled {
            if !is_bool(&field.ty) {
                return Err(syn::Error::new_spanned(&field.ty, "#[event(cancelled)] field must be a bool"));
            }
            if cancelled.replace(member.clone()).is_some() {
                return Err(syn::Error::new_spanned(field, "only one field can be #[event(cancelled)]"));
            }
        }
        if roles.result {
            let output = option_inner(&field.ty)
                .ok_or_else(|| syn::Error::new_spanned(&field.ty, "#[event(result)] field must be an Option<T>"))?;
            if result.replace((member, output)).is_some() {
                return Err(syn::Error::new_spanned(field, "only one field can be #[event(result)]"));
            }
        }
    }

    let mut generics = ast.generics.clone();
    for param in generics.type_params_mut() {
        param.bounds.push(parse_quote!(::core::marker::Send));
        param.bounds.push(parse_quote!(::core::marker::Sync));
        param.bounds.push(parse_quote!('static));
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
    let ident = &ast.ident;

    let event = with_crate(quote!(Event));
    let dyn_event = with_crate(quote!(DynEvent));
    let event_type = with_crate(quote!(EventType));
    let erased_type = with_crate(quote!(ErasedType));
    let resolution_error = with_crate(quote!(TypeResolutionError));
    let cancellable = with_crate(quote!(Cancellable));
    let result_event = with_crate(quote!(ResultEvent));

    let parent_members = parents.iter().map(|(member, _)| member).collect::<Vec<_>>();
    let parent_types = parents.iter().map(|(_, ty)| ty).collect::<Vec<_>>();
    let lineage = if parents.is_empty() {
        quote!()
    } else {
        quote! {
            fn parents() -> ::core::result::Result<::std::vec::Vec<::std::sync::Arc<#event_type>>, #resolution_error> {
                ::core::result::Result::Ok(::std::vec![#(#event_type::of::<#parent_types>()?),*])
            }

            fn upcast_mut(&mut self, target: #erased_type) -> ::core::option::Option<&mut dyn #dyn_event> {
                #(
                    if let ::core::option::Option::Some(view) = #dyn_event::view_mut(&mut self.#parent_members, target) {
                        return ::core::option::Option::Some(view);
                    }
                )*
                ::core::option::Option::None
            }
        }
    };
    let cancellable_fn = match &cancelled {
        Some(_) => quote! {
            fn cancellable(&self) -> ::core::option::Option<&dyn #cancellable> {
                ::core::option::Option::Some(self)
            }
        },
        None if !parents.is_empty() => quote! {
            fn cancellable(&self) -> ::core::option::Option<&dyn #cancellable> {
                #(
                    if let ::core::option::Option::Some(cancellable) = #dyn_event::as_cancellable(&self.#parent_members) {
                        return ::core::option::Option::Some(cancellable);
                    }
                )*
                ::core::option::Option::None
            }
        },
        None => quote!(),
    };
    let cancellable_impl = match &cancelled {
        Some(member) => quote! {
            impl #impl_generics #cancellable for #ident #ty_generics #where_clause {
                fn cancelled(&self) -> bool {
                    self.#member
                }

                fn set_cancelled(&mut self, cancelled: bool) {
                    self.#member = cancelled;
                }
            }
        },
        None => quote!(),
    };
    let result_impl = match &result {
        Some((member, output)) => quote! {
            impl #impl_generics #result_event for #ident #ty_generics #where_clause {
                type Output = #output;

                fn result(&self) -> ::core::option::Option<&Self::Output> {
                    ::core::option::Option::as_ref(&self.#member)
                }

                fn set_result(&mut self, result: Self::Output) {
                    self.#member = ::core::option::Option::Some(result);
                }

                fn take_result(&mut self) -> ::core::option::Option<Self::Output> {
                    ::core::option::Option::take(&mut self.#member)
                }
            }
        },
        None => quote!(),
    };

    Ok(quote! {
        impl #impl_generics #event for #ident #ty_generics #where_clause {
            #lineage

            #cancellable_fn
        }

        #cancellable_impl

        #result_impl
    })
}
