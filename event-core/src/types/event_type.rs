use std::any::{type_name, TypeId};
use std::fmt::{Debug, Display, Formatter};
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use tracing::trace;

use crate::error::TypeResolutionError;
use crate::event::Event;
use crate::types::{ErasedType, TypeToken};

static EVENT_TYPES: OnceLock<DashMap<TypeId, Arc<EventType>>> = OnceLock::new();

/// Runtime type of an event: its own token plus every declared supertype.
/// Resolved once per Rust type and shared afterwards.
pub struct EventType {
    token: TypeToken,
    name: &'static str,
    parents: Vec<Arc<EventType>>,
    lineage: Vec<TypeToken>,
}

impl EventType {
    pub fn of<E>() -> Result<Arc<EventType>, TypeResolutionError> where E: Event {
        let types = EVENT_TYPES.get_or_init(DashMap::new);
        let id = TypeId::of::<E>();
        if let Some(event_type) = types.get(&id) {
            return Ok(event_type.value().clone());
        }
        // parents resolve recursively, so no shard guard may be held here
        let event_type = Arc::new(EventType::new(TypeToken::of::<E>()?, type_name::<E>(), E::parents()?)?);
        trace!("resolve event type {:?}", event_type);
        let event_type = types.entry(id).or_insert(event_type).value().clone();
        Ok(event_type)
    }

    /// Views are selected by erased base, so an ancestor may appear with only
    /// one parameterization; a diamond over the same token is fine.
    fn new(token: TypeToken, name: &'static str, parents: Vec<Arc<EventType>>) -> Result<Self, TypeResolutionError> {
        let mut lineage = vec![token.clone()];
        for parent in &parents {
            for ancestor in &parent.lineage {
                match lineage.iter().find(|known| known.erased() == ancestor.erased()) {
                    None => lineage.push(ancestor.clone()),
                    Some(known) if known == ancestor => {}
                    Some(known) => {
                        return Err(TypeResolutionError::AmbiguousAncestor {
                            event: name,
                            first: known.to_string(),
                            second: ancestor.to_string(),
                        });
                    }
                }
            }
        }
        Ok(Self {
            token,
            name,
            parents,
            lineage,
        })
    }

    pub fn token(&self) -> &TypeToken {
        &self.token
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn parents(&self) -> &[Arc<EventType>] {
        &self.parents
    }

    /// Itself first, then every ancestor once, nearest first.
    pub fn lineage(&self) -> &[TypeToken] {
        &self.lineage
    }

    pub fn resolve(&self, erased: ErasedType) -> Option<&TypeToken> {
        self.lineage.iter().find(|token| token.erased() == erased)
    }

    pub fn is_subtype_of(&self, erased: ErasedType) -> bool {
        self.resolve(erased).is_some()
    }
}

impl Debug for EventType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventType")
            .field("token", &self.token)
            .field("lineage", &self.lineage)
            .finish_non_exhaustive()
    }
}

impl Display for EventType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.token)
    }
}
