use std::any::{type_name, Any};
use std::sync::Arc;

use crate::error::TypeResolutionError;
use crate::types::{ErasedType, EventType};

pub use cancellable::Cancellable;
pub use result::ResultEvent;

pub mod cancellable;
pub mod result;

/// A value that can be fired on an [`EventBus`](crate::EventBus).
///
/// Supertypes are expressed by composition: an event embeds its parent event
/// as a field and exposes it through [`Event::upcast_mut`]. Subscribers of the
/// parent then receive the embedded value. `#[derive(Event)]` writes all of
/// this from `#[event(parent)]`, `#[event(cancelled)]` and `#[event(result)]`
/// field attributes.
pub trait Event: Any + Send + Sync {
    fn parents() -> Result<Vec<Arc<EventType>>, TypeResolutionError> where Self: Sized {
        Ok(Vec::new())
    }

    #[allow(unused_variables)]
    fn upcast_mut(&mut self, target: ErasedType) -> Option<&mut dyn DynEvent> {
        None
    }

    fn cancellable(&self) -> Option<&dyn Cancellable> {
        None
    }
}

/// Object safe face of every [`Event`].
pub trait DynEvent: Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn event_type(&self) -> Result<Arc<EventType>, TypeResolutionError>;

    /// The part of this event whose erased type is `target`: the event itself
    /// or one of its embedded ancestors.
    fn view_mut(&mut self, target: ErasedType) -> Option<&mut dyn DynEvent>;

    fn as_cancellable(&self) -> Option<&dyn Cancellable>;

    fn event_name(&self) -> &'static str;
}

impl<E> DynEvent for E where E: Event {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn event_type(&self) -> Result<Arc<EventType>, TypeResolutionError> {
        EventType::of::<E>()
    }

    fn view_mut(&mut self, target: ErasedType) -> Option<&mut dyn DynEvent> {
        let is_self = EventType::of::<E>()
            .map(|event_type| event_type.token().erased() == target)
            .unwrap_or(false);
        if is_self {
            Some(self)
        } else {
            self.upcast_mut(target)
        }
    }

    fn as_cancellable(&self) -> Option<&dyn Cancellable> {
        self.cancellable()
    }

    fn event_name(&self) -> &'static str {
        type_name::<E>()
    }
}

impl dyn DynEvent {
    pub fn is<E>(&self) -> bool where E: Event {
        self.as_any().is::<E>()
    }

    pub fn downcast_ref<E>(&self) -> Option<&E> where E: Event {
        self.as_any().downcast_ref::<E>()
    }

    pub fn downcast_mut<E>(&mut self) -> Option<&mut E> where E: Event {
        self.as_any_mut().downcast_mut::<E>()
    }

    pub fn is_cancelled(&self) -> bool {
        self.as_cancellable().map(Cancellable::cancelled).unwrap_or(false)
    }
}
