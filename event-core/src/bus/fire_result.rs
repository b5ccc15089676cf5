use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

use crate::error::DispatchError;
use crate::subscribe::Subscriber;

/// A subscriber that returned an error or panicked during one dispatch.
pub struct HandlerFailure<O = ()> {
    subscriber: Arc<Subscriber<O>>,
    error: DispatchError,
}

impl<O> HandlerFailure<O> {
    pub(crate) fn new(subscriber: Arc<Subscriber<O>>, error: DispatchError) -> Self {
        Self { subscriber, error }
    }

    pub fn subscriber(&self) -> &Arc<Subscriber<O>> {
        &self.subscriber
    }

    pub fn error(&self) -> &DispatchError {
        &self.error
    }

    pub fn into_error(self) -> DispatchError {
        self.error
    }
}

impl<O> Debug for HandlerFailure<O> where O: Debug {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerFailure")
            .field("subscriber", &self.subscriber)
            .field("error", &self.error)
            .finish()
    }
}

impl<O> Display for HandlerFailure<O> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failed: {}", self.subscriber, self.error)
    }
}

/// Outcome of a dispatch: the event as the last subscriber left it and every
/// failure in invocation order.
pub struct FireResult<E, O = ()> {
    event: E,
    failures: Vec<HandlerFailure<O>>,
}

impl<E, O> FireResult<E, O> {
    pub(crate) fn new(event: E, failures: Vec<HandlerFailure<O>>) -> Self {
        Self { event, failures }
    }

    pub fn success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn event(&self) -> &E {
        &self.event
    }

    pub fn event_mut(&mut self) -> &mut E {
        &mut self.event
    }

    pub fn into_event(self) -> E {
        self.event
    }

    pub fn failures(&self) -> &[HandlerFailure<O>] {
        &self.failures
    }

    pub fn into_parts(self) -> (E, Vec<HandlerFailure<O>>) {
        (self.event, self.failures)
    }
}

impl<E, O> Debug for FireResult<E, O> where E: Debug, O: Debug {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FireResult")
            .field("event", &self.event)
            .field("failures", &self.failures)
            .finish()
    }
}
