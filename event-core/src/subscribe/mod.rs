use std::borrow::Cow;
use std::fmt::{Debug, Display, Formatter};
use std::hash::Hash;
use std::sync::Arc;

use typed_builder::TypedBuilder;

use crate::subscribe::adapter::Invocable;
use crate::types::TypeToken;

pub use listener::{GeneratedSubscriber, Listener};
pub use post_order::PostOrder;

pub mod adapter;
pub mod listener;
pub mod post_order;

/// Groups subscriptions so they can be torn down together with
/// [`EventBus::unregister_all`](crate::EventBus::unregister_all).
pub trait Owner: Debug + Clone + Eq + Hash + Send + Sync + 'static {}

impl<T> Owner for T where T: Debug + Clone + Eq + Hash + Send + Sync + 'static {}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct SubscriptionId(pub(crate) u64);

impl SubscriptionId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl Display for SubscriptionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle returned on registration, consumed by
/// [`EventBus::unsubscribe`](crate::EventBus::unsubscribe).
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Subscription {
    id: SubscriptionId,
    interest: TypeToken,
}

impl Subscription {
    pub(crate) fn new(id: SubscriptionId, interest: TypeToken) -> Self {
        Self { id, interest }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn interest(&self) -> &TypeToken {
        &self.interest
    }
}

impl Display for Subscription {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "subscription {} on {}", self.id, self.interest)
    }
}

#[derive(Debug, Clone, TypedBuilder)]
pub struct SubscribeOptions<O> {
    /// Falls back to the bus `default-order` when unset.
    #[builder(default, setter(strip_option))]
    pub order: Option<PostOrder>,
    #[builder(default)]
    pub accept_cancelled: bool,
    #[builder(default, setter(strip_option))]
    pub owner: Option<O>,
}

impl<O> Default for SubscribeOptions<O> {
    fn default() -> Self {
        Self {
            order: None,
            accept_cancelled: false,
            owner: None,
        }
    }
}

/// A registered subscriber. Immutable once it is in the registry.
pub struct Subscriber<O> {
    pub(crate) id: SubscriptionId,
    pub(crate) interest: TypeToken,
    pub(crate) order: PostOrder,
    pub(crate) accept_cancelled: bool,
    pub(crate) owner: Option<O>,
    pub(crate) name: Cow<'static, str>,
    pub(crate) handler: Arc<dyn Invocable>,
}

impl<O> Subscriber<O> {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn interest(&self) -> &TypeToken {
        &self.interest
    }

    pub fn order(&self) -> PostOrder {
        self.order
    }

    pub fn accept_cancelled(&self) -> bool {
        self.accept_cancelled
    }

    pub fn owner(&self) -> Option<&O> {
        self.owner.as_ref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handler(&self) -> &Arc<dyn Invocable> {
        &self.handler
    }
}

impl<O> Debug for Subscriber<O> where O: Debug {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("interest", &self.interest)
            .field("order", &self.order)
            .field("accept_cancelled", &self.accept_cancelled)
            .field("owner", &self.owner)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<O> Display for Subscriber<O> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "subscriber {} {}", self.id, self.name)
    }
}

/// A subscriber that has not been given its id yet.
pub(crate) struct PendingSubscriber<O> {
    pub(crate) interest: TypeToken,
    pub(crate) order: PostOrder,
    pub(crate) accept_cancelled: bool,
    pub(crate) owner: Option<O>,
    pub(crate) name: Cow<'static, str>,
    pub(crate) handler: Arc<dyn Invocable>,
}

impl<O> PendingSubscriber<O> {
    pub(crate) fn into_subscriber(self, id: SubscriptionId) -> Subscriber<O> {
        let Self { interest, order, accept_cancelled, owner, name, handler } = self;
        Subscriber {
            id,
            interest,
            order,
            accept_cancelled,
            owner,
            name,
            handler,
        }
    }
}
