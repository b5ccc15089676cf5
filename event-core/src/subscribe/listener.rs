use std::fmt::{Debug, Formatter};

use crate::error::{DispatchError, TypeResolutionError};
use crate::event::{DynEvent, Event};
use crate::subscribe::adapter::downcast;
use crate::subscribe::PostOrder;
use crate::types::TypeToken;

/// Implemented by `#[listener]` for impl blocks whose methods carry
/// `#[subscribe]`. Registered with [`EventBus::register`](crate::EventBus::register).
pub trait Listener: Send + Sync + 'static {
    fn subscriptions() -> Vec<GeneratedSubscriber<Self>> where Self: Sized;
}

type Invoke<L> = Box<dyn Fn(&L, &mut dyn DynEvent) -> Result<(), DispatchError> + Send + Sync>;

/// One generated adapter: a direct call into a listener method plus the
/// metadata its `#[subscribe]` attribute declared.
pub struct GeneratedSubscriber<L> {
    method: &'static str,
    interest: Result<TypeToken, TypeResolutionError>,
    parameter: Result<TypeToken, TypeResolutionError>,
    order: Option<PostOrder>,
    accept_cancelled: bool,
    invoke: Invoke<L>,
}

impl<L> GeneratedSubscriber<L> where L: 'static {
    pub fn new<E, F>(method: &'static str, order: Option<PostOrder>, accept_cancelled: bool, handler: F) -> Self
        where
            E: Event,
            F: Fn(&L, &mut E) -> anyhow::Result<()> + Send + Sync + 'static {
        let parameter = TypeToken::of::<E>();
        Self {
            method,
            interest: parameter.clone(),
            parameter,
            order,
            accept_cancelled,
            invoke: Box::new(move |listener: &L, event: &mut dyn DynEvent| -> Result<(), DispatchError> {
                let event = downcast::<E>(event)?;
                handler(listener, event).map_err(DispatchError::Handler)
            }),
        }
    }

    /// Overrides the interest type, which defaults to the method's parameter.
    pub fn with_interest(mut self, interest: TypeToken) -> Self {
        self.interest = Ok(interest);
        self
    }

    pub fn method(&self) -> &'static str {
        self.method
    }

    pub fn interest(&self) -> Result<TypeToken, TypeResolutionError> {
        self.interest.clone()
    }

    pub fn parameter(&self) -> Result<TypeToken, TypeResolutionError> {
        self.parameter.clone()
    }

    /// The declared order, `None` when the bus default applies.
    pub fn order(&self) -> Option<PostOrder> {
        self.order
    }

    pub fn accept_cancelled(&self) -> bool {
        self.accept_cancelled
    }

    pub fn invoke(&self, listener: &L, event: &mut dyn DynEvent) -> Result<(), DispatchError> {
        (self.invoke)(listener, event)
    }
}

impl<L> Debug for GeneratedSubscriber<L> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratedSubscriber")
            .field("method", &self.method)
            .field("interest", &self.interest)
            .field("order", &self.order)
            .field("accept_cancelled", &self.accept_cancelled)
            .finish_non_exhaustive()
    }
}
