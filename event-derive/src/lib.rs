mod event;
mod listener;
mod metadata;

use proc_macro::TokenStream;
use proc_macro2::{Ident, Span};
use proc_macro_crate::{crate_name, FoundCrate};
use quote::quote;
use syn::{DeriveInput, ItemImpl, parse_macro_input};

const EVENT_CORE: &str = "event-core";

/// Implements `Event` for a struct.
///
/// Field attributes:
/// - `#[event(parent)]` the field is a supertype event, subscribers of its
///   type also receive this event;
/// - `#[event(cancelled)]` a `bool` field backing `Cancellable`;
/// - `#[event(result)]` an `Option<T>` field backing `ResultEvent<Output = T>`.
#[proc_macro_derive(Event, attributes(event))]
pub fn event_derive(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    event::expand(&ast).unwrap_or_else(|error| error.to_compile_error()).into()
}

/// Implements `Listener` for an inherent impl block. Every method marked
/// `#[subscribe]`, `#[subscribe(order = "early")]` or
/// `#[subscribe(accept_cancelled)]` becomes a generated subscriber.
#[proc_macro_attribute]
pub fn listener(args: TokenStream, input: TokenStream) -> TokenStream {
    let item = parse_macro_input!(input as ItemImpl);
    listener::expand(args.into(), item).unwrap_or_else(|error| error.to_compile_error()).into()
}

/// Path of `event-core` as seen from the crate being expanded.
pub(crate) fn with_crate(path: proc_macro2::TokenStream) -> proc_macro2::TokenStream {
    let name = match crate_name(EVENT_CORE) {
        Ok(FoundCrate::Name(name)) => Ident::new(&name, Span::call_site()),
        Ok(FoundCrate::Itself) | Err(_) => Ident::new("event_core", Span::call_site()),
    };
    quote!(::#name::#path)
}
