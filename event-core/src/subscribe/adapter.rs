use std::any::type_name;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};

use crate::error::{DispatchError, RegistrationError};
use crate::event::{DynEvent, Event};
use crate::subscribe::listener::GeneratedSubscriber;

/// The single entry point the bus calls on every subscriber. The view passed
/// in is already narrowed to the subscriber's interest type.
pub trait Invocable: Send + Sync + 'static {
    fn invoke(&self, event: &mut dyn DynEvent) -> Result<(), DispatchError>;
}

pub(crate) fn downcast<E>(event: &mut dyn DynEvent) -> Result<&mut E, DispatchError> where E: Event {
    let found = event.event_name();
    event.downcast_mut::<E>().ok_or(DispatchError::ViewMismatch {
        expected: type_name::<E>(),
        found,
    })
}

struct TypedHandler<E, F> {
    handler: F,
    _event: PhantomData<fn(&mut E)>,
}

impl<E, F> Invocable for TypedHandler<E, F>
    where
        E: Event,
        F: Fn(&mut E) -> anyhow::Result<()> + Send + Sync + 'static {
    fn invoke(&self, event: &mut dyn DynEvent) -> Result<(), DispatchError> {
        let event = downcast::<E>(event)?;
        (self.handler)(event).map_err(DispatchError::Handler)
    }
}

struct DynHandler<F> {
    handler: F,
}

impl<F> Invocable for DynHandler<F> where F: Fn(&mut dyn DynEvent) -> anyhow::Result<()> + Send + Sync + 'static {
    fn invoke(&self, event: &mut dyn DynEvent) -> Result<(), DispatchError> {
        (self.handler)(event).map_err(DispatchError::Handler)
    }
}

struct MethodHandler<L, E> {
    listener: Arc<L>,
    method: fn(&L, &mut E) -> anyhow::Result<()>,
}

impl<L, E> Invocable for MethodHandler<L, E> where L: Send + Sync + 'static, E: Event {
    fn invoke(&self, event: &mut dyn DynEvent) -> Result<(), DispatchError> {
        let event = downcast::<E>(event)?;
        (self.method)(&self.listener, event).map_err(DispatchError::Handler)
    }
}

struct WeakMethodHandler<L, E> {
    listener: Weak<L>,
    method: fn(&L, &mut E) -> anyhow::Result<()>,
}

impl<L, E> Invocable for WeakMethodHandler<L, E> where L: Send + Sync + 'static, E: Event {
    fn invoke(&self, event: &mut dyn DynEvent) -> Result<(), DispatchError> {
        let listener = self.listener.upgrade().ok_or(DispatchError::ListenerDropped(type_name::<L>()))?;
        let event = downcast::<E>(event)?;
        (self.method)(&listener, event).map_err(DispatchError::Handler)
    }
}

struct GeneratedHandler<L> {
    listener: Arc<L>,
    subscriber: GeneratedSubscriber<L>,
}

impl<L> Invocable for GeneratedHandler<L> where L: Send + Sync + 'static {
    fn invoke(&self, event: &mut dyn DynEvent) -> Result<(), DispatchError> {
        self.subscriber.invoke(&self.listener, event)
    }
}

pub fn typed<E, F>(handler: F) -> Arc<dyn Invocable>
    where
        E: Event,
        F: Fn(&mut E) -> anyhow::Result<()> + Send + Sync + 'static {
    Arc::new(TypedHandler { handler, _event: PhantomData })
}

pub fn dynamic<F>(handler: F) -> Arc<dyn Invocable> where F: Fn(&mut dyn DynEvent) -> anyhow::Result<()> + Send + Sync + 'static {
    Arc::new(DynHandler { handler })
}

pub fn method<L, E>(listener: &Arc<L>, method: fn(&L, &mut E) -> anyhow::Result<()>) -> Arc<dyn Invocable>
    where
        L: Send + Sync + 'static,
        E: Event {
    Arc::new(MethodHandler { listener: listener.clone(), method })
}

/// Binds `method` without keeping the listener alive. Fails when the
/// listener is already gone; a later drop is reported on each dispatch.
pub fn weak_method<L, E>(listener: &Weak<L>, method: fn(&L, &mut E) -> anyhow::Result<()>) -> Result<Arc<dyn Invocable>, RegistrationError>
    where
        L: Send + Sync + 'static,
        E: Event {
    if listener.strong_count() == 0 {
        return Err(RegistrationError::ListenerDropped(type_name::<L>()));
    }
    Ok(Arc::new(WeakMethodHandler { listener: listener.clone(), method }))
}

/// Wraps a subscriber written by `#[listener]`. Its declared interest must
/// share the erased base of the parameter it was generated for.
pub fn generated<L>(listener: &Arc<L>, subscriber: GeneratedSubscriber<L>) -> Result<Arc<dyn Invocable>, RegistrationError> where L: Send + Sync + 'static {
    let interest = subscriber.interest()?;
    let parameter = subscriber.parameter()?;
    if interest.erased() != parameter.erased() {
        return Err(RegistrationError::SignatureMismatch {
            method: subscriber.method(),
            expected: parameter.erased().name(),
            found: interest.to_string(),
        });
    }
    if interest.has_wildcard() {
        return Err(RegistrationError::WildcardInTypedSubscriber(interest.to_string()));
    }
    Ok(Arc::new(GeneratedHandler { listener: listener.clone(), subscriber }))
}
