extern crate self as event_core;

pub use event_derive::{Event, listener};

pub use bus::EventBus;
pub use bus::fire_result::{FireResult, HandlerFailure};
pub use error::{DispatchError, RegistrationError, TypeResolutionError};
pub use event::{Cancellable, DynEvent, Event, ResultEvent};
pub use subscribe::{GeneratedSubscriber, Listener, Owner, PostOrder, SubscribeOptions, Subscriber, Subscription, SubscriptionId};
pub use types::{ErasedType, EventType, TypeArg, TypeToken, Wildcard};

pub mod bus;
pub mod config;
pub mod error;
pub mod event;
pub mod ext;
mod registry;
pub mod subscribe;
pub mod types;

pub const BUS_CONFIG: &'static str = include_str!("../bus.toml");

#[cfg(test)]
#[ctor::ctor]
fn init_test_logger() {
    let _ = ext::init_logger(tracing::Level::DEBUG);
}
