use thiserror::Error;

use crate::subscribe::SubscriptionId;
use crate::types::ErasedType;

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum TypeResolutionError {
    #[error("type {0} contains an anonymous type and cannot be used as an event type")]
    Anonymous(String),
    #[error("type {0} has unbalanced or empty generic arguments")]
    Malformed(String),
    #[error("event {event} inherits both {first} and {second}, which share one base type")]
    AmbiguousAncestor {
        event: &'static str,
        first: String,
        second: String,
    },
}

#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error(transparent)]
    TypeResolution(#[from] TypeResolutionError),
    #[error("subscriber {method} declares interest in {found} but its event parameter is {expected}")]
    SignatureMismatch {
        method: &'static str,
        expected: &'static str,
        found: String,
    },
    #[error("typed subscriber cannot listen to wildcard type {0}, subscribe it with subscribe_dyn")]
    WildcardInTypedSubscriber(String),
    #[error("listener {0} was dropped before its subscriber could be bound")]
    ListenerDropped(&'static str),
    #[error("subscription {0} is not registered")]
    NotRegistered(SubscriptionId),
    #[error("owner {0} has no registered subscribers")]
    UnknownOwner(String),
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] anyhow::Error),
    #[error("subscriber panicked: {0}")]
    Panicked(String),
    #[error("listener {0} was dropped")]
    ListenerDropped(&'static str),
    #[error("subscriber expects {expected} but received {found}")]
    ViewMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("event {event} has no view of {target}")]
    ViewUnavailable {
        event: &'static str,
        target: ErasedType,
    },
}
