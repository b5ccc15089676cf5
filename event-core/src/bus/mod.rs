use std::any::{type_name, Any};
use std::borrow::Cow;
use std::fmt::{Debug, Formatter};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use tracing::{debug, error, trace, warn};

use crate::config::bus_config::BusConfig;
use crate::error::{DispatchError, RegistrationError, TypeResolutionError};
use crate::event::{DynEvent, Event};
use crate::registry::Registry;
use crate::subscribe::{adapter, Listener, Owner, PendingSubscriber, SubscribeOptions, Subscriber, Subscription};
use crate::subscribe::adapter::Invocable;
use crate::types::{ErasedType, EventType, TypeToken};

use self::fire_result::{FireResult, HandlerFailure};

pub mod fire_result;

/// Synchronous publish/subscribe bus keyed by event type.
///
/// Subscribers are matched against the runtime type of each fired event and
/// every declared supertype of it, then run in [`PostOrder`](crate::PostOrder)
/// on the calling thread. Registration publishes a new snapshot, so a
/// dispatch only ever sees the subscribers present when it started and
/// handlers may freely register, unsubscribe or fire from inside a dispatch.
///
/// `O` is the owner type used to group subscriptions for
/// [`unregister_all`](EventBus::unregister_all).
pub struct EventBus<O = ()> {
    registry: Registry<O>,
    config: BusConfig,
}

impl<O> EventBus<O> where O: Owner {
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    pub fn with_config(config: BusConfig) -> Self {
        Self {
            registry: Registry::new(config.cache_candidates),
            config,
        }
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    pub fn subscribe<E, F>(&self, handler: F) -> Result<Subscription, RegistrationError>
        where
            E: Event,
            F: Fn(&mut E) -> anyhow::Result<()> + Send + Sync + 'static {
        self.subscribe_with(SubscribeOptions::default(), handler)
    }

    pub fn subscribe_with<E, F>(&self, options: SubscribeOptions<O>, handler: F) -> Result<Subscription, RegistrationError>
        where
            E: Event,
            F: Fn(&mut E) -> anyhow::Result<()> + Send + Sync + 'static {
        let interest = typed_interest::<E>()?;
        Ok(self.insert_one(interest, options, Cow::Borrowed(type_name::<F>()), adapter::typed::<E, F>(handler)))
    }

    /// Subscribes to a raw or wildcard interest such as `PayloadEvent<?>`.
    /// The handler receives the part of the event whose erased type is the
    /// interest's base.
    pub fn subscribe_dyn<F>(&self, interest: TypeToken, options: SubscribeOptions<O>, handler: F) -> Subscription
        where
            F: Fn(&mut dyn DynEvent) -> anyhow::Result<()> + Send + Sync + 'static {
        self.insert_one(interest, options, Cow::Borrowed(type_name::<F>()), adapter::dynamic(handler))
    }

    pub fn subscribe_method<L, E>(&self, listener: &Arc<L>, method: fn(&L, &mut E) -> anyhow::Result<()>, options: SubscribeOptions<O>) -> Result<Subscription, RegistrationError>
        where
            L: Send + Sync + 'static,
            E: Event {
        let interest = typed_interest::<E>()?;
        Ok(self.insert_one(interest, options, Cow::Borrowed(type_name::<L>()), adapter::method(listener, method)))
    }

    /// Like [`subscribe_method`](EventBus::subscribe_method) but does not keep
    /// the listener alive. Once it is dropped every dispatch reports
    /// [`DispatchError::ListenerDropped`] for this subscriber.
    pub fn subscribe_weak<L, E>(&self, listener: &Weak<L>, method: fn(&L, &mut E) -> anyhow::Result<()>, options: SubscribeOptions<O>) -> Result<Subscription, RegistrationError>
        where
            L: Send + Sync + 'static,
            E: Event {
        let interest = typed_interest::<E>()?;
        let handler = adapter::weak_method(listener, method)?;
        Ok(self.insert_one(interest, options, Cow::Borrowed(type_name::<L>()), handler))
    }

    /// Registers every `#[subscribe]` method of a `#[listener]` under `owner`.
    /// Either all of them are registered or, on error, none.
    pub fn register<L>(&self, owner: O, listener: Arc<L>) -> Result<Vec<Subscription>, RegistrationError> where L: Listener {
        let mut pending = vec![];
        for subscriber in L::subscriptions() {
            let interest = subscriber.interest()?;
            let order = subscriber.order().unwrap_or(self.config.default_order);
            let accept_cancelled = subscriber.accept_cancelled();
            let name = Cow::Owned(format!("{}::{}", type_name::<L>(), subscriber.method()));
            let handler = adapter::generated(&listener, subscriber)?;
            pending.push(PendingSubscriber {
                interest,
                order,
                accept_cancelled,
                owner: Some(owner.clone()),
                name,
                handler,
            });
        }
        let subscriptions = self.registry.insert(pending);
        debug!("register listener {} of {:?} with {} subscribers", type_name::<L>(), owner, subscriptions.len());
        Ok(subscriptions)
    }

    pub fn unsubscribe(&self, subscription: &Subscription) -> Result<(), RegistrationError> {
        match self.registry.remove(subscription.id()) {
            Some(subscriber) => {
                debug!("{} unsubscribe {}", subscriber, subscriber.interest());
                Ok(())
            }
            None => Err(RegistrationError::NotRegistered(subscription.id())),
        }
    }

    /// Removes every subscriber registered under `owner` and returns how many
    /// were removed.
    pub fn unregister_all(&self, owner: &O) -> Result<usize, RegistrationError> {
        let removed = self.registry.remove_owner(owner)?;
        debug!("unregister {} subscribers of {:?}", removed.len(), owner);
        Ok(removed.len())
    }

    pub fn clear(&self) {
        let removed = self.registry.clear();
        debug!("clear {} subscribers", removed);
    }

    /// Subscribers registered on the erased base of `E`, in registration order.
    pub fn subscribers<E>(&self) -> Result<Vec<Arc<Subscriber<O>>>, TypeResolutionError> where E: Event {
        Ok(self.subscribers_of(ErasedType::of::<E>()?))
    }

    pub fn subscribers_of(&self, erased: ErasedType) -> Vec<Arc<Subscriber<O>>> {
        self.registry.subscribers(erased)
    }

    pub fn is_subscribed(&self, subscription: &Subscription) -> bool {
        self.registry.contains(subscription.id())
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dispatches `event` and logs every failure at `error` level when
    /// `log-failures` is enabled.
    pub fn fire<E>(&self, mut event: E) -> FireResult<E, O> where E: Event {
        let failures = self.dispatch(&mut event);
        self.log_failures(event.event_name(), &failures);
        FireResult::new(event, failures)
    }

    pub fn fire_silently<E>(&self, mut event: E) -> FireResult<E, O> where E: Event {
        let failures = self.dispatch(&mut event);
        FireResult::new(event, failures)
    }

    pub fn fire_ref<'a, E>(&self, event: &'a mut E) -> FireResult<&'a mut E, O> where E: Event {
        let failures = self.dispatch(event);
        self.log_failures(event.event_name(), &failures);
        FireResult::new(event, failures)
    }

    pub fn fire_dyn(&self, event: &mut dyn DynEvent) -> Vec<HandlerFailure<O>> {
        let failures = self.dispatch(event);
        self.log_failures(event.event_name(), &failures);
        failures
    }

    fn insert_one(&self, interest: TypeToken, options: SubscribeOptions<O>, name: Cow<'static, str>, handler: Arc<dyn Invocable>) -> Subscription {
        let SubscribeOptions { order, accept_cancelled, owner } = options;
        let pending = PendingSubscriber {
            interest,
            order: order.unwrap_or(self.config.default_order),
            accept_cancelled,
            owner,
            name,
            handler,
        };
        self.registry.insert_one(pending)
    }

    fn dispatch(&self, event: &mut dyn DynEvent) -> Vec<HandlerFailure<O>> {
        let event_name = event.event_name();
        let event_type = match event.event_type() {
            Ok(event_type) => event_type,
            Err(error) => {
                warn!("event {} cannot be dispatched: {}", event_name, error);
                return Vec::new();
            }
        };
        let candidates = self.registry.candidates(&event_type);
        let mut failures = Vec::new();
        for subscriber in candidates.iter() {
            if !subscriber.accept_cancelled() && event.is_cancelled() {
                trace!("skip {} for cancelled event {}", subscriber, event_type);
                continue;
            }
            let target = subscriber.interest().erased();
            let result = match event.view_mut(target) {
                Some(view) => self.invoke(subscriber, view),
                None => Err(DispatchError::ViewUnavailable { event: event_name, target }),
            };
            trace!("{} handle event {}", subscriber, event_type);
            if let Err(error) = result {
                failures.push(HandlerFailure::new(subscriber.clone(), error));
            }
        }
        failures
    }

    fn invoke(&self, subscriber: &Subscriber<O>, view: &mut dyn DynEvent) -> Result<(), DispatchError> {
        if !self.config.catch_panics {
            return subscriber.handler().invoke(view);
        }
        match panic::catch_unwind(AssertUnwindSafe(|| subscriber.handler().invoke(view))) {
            Ok(result) => result,
            Err(payload) => Err(DispatchError::Panicked(panic_message(payload))),
        }
    }

    fn log_failures(&self, event_name: &str, failures: &[HandlerFailure<O>]) {
        if self.config.log_failures {
            for failure in failures {
                error!("unable to fire event {} to {}: {:#}", event_name, failure.subscriber(), failure.error());
            }
        }
    }
}

fn typed_interest<E>() -> Result<TypeToken, RegistrationError> where E: Event {
    let event_type = EventType::of::<E>()?;
    let interest = event_type.token().clone();
    if interest.has_wildcard() {
        return Err(RegistrationError::WildcardInTypedSubscriber(interest.to_string()));
    }
    Ok(interest)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non string panic payload".to_string()
    }
}

impl<O> Default for EventBus<O> where O: Owner {
    fn default() -> Self {
        Self::new()
    }
}

impl<O> Debug for EventBus<O> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Weak};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use anyhow::anyhow;
    use parking_lot::Mutex;

    use crate::{Cancellable, DynEvent, Event, EventBus, listener, PostOrder, ResultEvent, SubscribeOptions};
    use crate::config::bus_config::BusConfig;
    use crate::error::{DispatchError, RegistrationError};
    use crate::types::{TypeToken, Wildcard};

    type Trail = Arc<Mutex<Vec<&'static str>>>;

    #[derive(Event, Default)]
    struct FooEvent;

    #[derive(Event, Default)]
    struct TestEvent {
        #[event(cancelled)]
        cancelled: bool,
        #[event(result)]
        answer: Option<&'static str>,
    }

    #[derive(Event, Default)]
    struct PayloadEvent<T> {
        payload: T,
    }

    #[derive(Event, Default)]
    struct BaseEvent {
        #[event(cancelled)]
        cancelled: bool,
        hits: u32,
    }

    #[derive(Event, Default)]
    struct ChildEvent {
        #[event(parent)]
        base: BaseEvent,
        hits: u32,
    }

    #[derive(Event, Default)]
    struct PlainEvent;

    #[derive(Event, Default)]
    struct ComboEvent {
        #[event(parent)]
        plain: PlainEvent,
        #[event(parent)]
        base: BaseEvent,
    }

    #[derive(Event, Default)]
    struct WrappedEvent<T> {
        #[event(parent)]
        inner: PayloadEvent<T>,
    }

    fn options(order: PostOrder) -> SubscribeOptions<()> {
        SubscribeOptions::builder().order(order).build()
    }

    fn record<E>(bus: &EventBus, trail: &Trail, order: PostOrder, name: &'static str) -> anyhow::Result<crate::Subscription> where E: Event {
        let trail = trail.clone();
        let subscription = bus.subscribe_with(options(order), move |_: &mut E| {
            trail.lock().push(name);
            Ok(())
        })?;
        Ok(subscription)
    }

    fn drain(trail: &Trail) -> Vec<&'static str> {
        std::mem::take(&mut *trail.lock())
    }

    #[test]
    fn test_unsubscribe_between_dispatches() -> anyhow::Result<()> {
        let bus = EventBus::new();
        let trail = Trail::default();
        let s1 = record::<FooEvent>(&bus, &trail, PostOrder::Early, "s1")?;
        record::<FooEvent>(&bus, &trail, PostOrder::Normal, "s2")?;
        let result = bus.fire(FooEvent);
        assert!(result.success());
        assert!(result.failures().is_empty());
        assert_eq!(drain(&trail), vec!["s1", "s2"]);
        bus.unsubscribe(&s1)?;
        assert!(bus.fire(FooEvent).success());
        assert_eq!(drain(&trail), vec!["s2"]);
        Ok(())
    }

    #[test]
    fn test_order_and_ties() -> anyhow::Result<()> {
        let bus = EventBus::new();
        let trail = Trail::default();
        record::<FooEvent>(&bus, &trail, PostOrder::Last, "last")?;
        record::<FooEvent>(&bus, &trail, PostOrder::Normal, "normal-1")?;
        record::<FooEvent>(&bus, &trail, PostOrder::First, "first")?;
        record::<FooEvent>(&bus, &trail, PostOrder::Late, "late")?;
        record::<FooEvent>(&bus, &trail, PostOrder::Normal, "normal-2")?;
        record::<FooEvent>(&bus, &trail, PostOrder::Early, "early")?;
        bus.fire(FooEvent);
        assert_eq!(drain(&trail), vec!["first", "early", "normal-1", "normal-2", "late", "last"]);
        Ok(())
    }

    #[test]
    fn test_default_order_from_config() -> anyhow::Result<()> {
        let config = BusConfig {
            default_order: PostOrder::Late,
            ..BusConfig::default()
        };
        let bus = EventBus::<()>::with_config(config);
        let trail = Trail::default();
        let recorder = trail.clone();
        bus.subscribe(move |_: &mut FooEvent| {
            recorder.lock().push("default");
            Ok(())
        })?;
        record::<FooEvent>(&bus, &trail, PostOrder::Normal, "normal")?;
        bus.register((), Arc::new(DefaultOrderListener { trail: trail.clone() }))?;
        bus.fire(FooEvent);
        assert_eq!(drain(&trail), vec!["normal", "default", "generated"]);
        Ok(())
    }

    struct DefaultOrderListener {
        trail: Trail,
    }

    #[listener]
    impl DefaultOrderListener {
        #[subscribe]
        fn on_foo(&self, _event: &mut FooEvent) {
            self.trail.lock().push("generated");
        }
    }

    #[test]
    fn test_cancel_through_second_parent() -> anyhow::Result<()> {
        let bus = EventBus::<()>::new();
        bus.subscribe_with(options(PostOrder::First), |event: &mut BaseEvent| {
            event.cancel();
            Ok(())
        })?;
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        bus.subscribe_with(options(PostOrder::Last), move |_: &mut ComboEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })?;
        let result = bus.fire(ComboEvent::default());
        assert!(result.success());
        assert!(result.event().base.cancelled());
        assert!((result.event() as &dyn DynEvent).is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        Ok(())
    }

    #[derive(Default)]
    struct CancelListener {
        calls: AtomicUsize,
    }

    #[listener]
    impl CancelListener {
        #[subscribe(order = "first")]
        fn first_cancels(&self, event: &mut TestEvent) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            anyhow::ensure!(!event.cancelled(), "event cancelled before first subscriber");
            event.set_cancelled(true);
            Ok(())
        }

        #[subscribe(order = "early")]
        fn early_is_skipped(&self, _event: &mut TestEvent) -> anyhow::Result<()> {
            Err(anyhow!("subscriber that does not accept cancelled events was called"))
        }

        #[subscribe(accept_cancelled)]
        fn normal_un_cancels(&self, event: &mut TestEvent) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            anyhow::ensure!(event.cancelled(), "event should still be cancelled");
            event.set_cancelled(false);
            Ok(())
        }

        #[subscribe(order = "late")]
        fn late_cancels_again(&self, event: &mut TestEvent) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            anyhow::ensure!(!event.cancelled(), "event should have been un-cancelled");
            event.cancel();
            Ok(())
        }

        #[subscribe(order = "last")]
        fn last_is_skipped(&self, _event: &mut TestEvent) -> anyhow::Result<()> {
            Err(anyhow!("subscriber that does not accept cancelled events was called"))
        }
    }

    #[test]
    fn test_cancellation() -> anyhow::Result<()> {
        let bus = EventBus::new();
        let listener = Arc::new(CancelListener::default());
        let subscriptions = bus.register((), listener.clone())?;
        assert_eq!(subscriptions.len(), 5);
        let result = bus.fire(TestEvent::default());
        assert!(result.success(), "{:?}", result.failures().iter().map(ToString::to_string).collect::<Vec<_>>());
        assert_eq!(listener.calls.load(Ordering::SeqCst), 3);
        assert!(result.event().cancelled());
        Ok(())
    }

    #[test]
    fn test_cancelled_before_dispatch() -> anyhow::Result<()> {
        let bus = EventBus::new();
        let trail = Trail::default();
        record::<TestEvent>(&bus, &trail, PostOrder::Normal, "skipped")?;
        let recorder = trail.clone();
        bus.subscribe_with(SubscribeOptions::builder().accept_cancelled(true).build(), move |_: &mut TestEvent| {
            recorder.lock().push("accepting");
            Ok(())
        })?;
        let event = TestEvent { cancelled: true, ..Default::default() };
        assert!(bus.fire(event).success());
        assert_eq!(drain(&trail), vec!["accepting"]);
        Ok(())
    }

    #[test]
    fn test_last_result_wins() -> anyhow::Result<()> {
        let bus = EventBus::<()>::new();
        bus.subscribe_with(options(PostOrder::Early), |event: &mut TestEvent| {
            event.set_result("early");
            Ok(())
        })?;
        bus.subscribe_with(options(PostOrder::Late), |event: &mut TestEvent| {
            event.set_result("late");
            Ok(())
        })?;
        let mut event = bus.fire(TestEvent::default()).into_event();
        assert_eq!(event.take_result(), Some("late"));
        Ok(())
    }

    #[test]
    fn test_parameterized_isolation() -> anyhow::Result<()> {
        let bus = EventBus::new();
        let trail = Trail::default();
        record::<PayloadEvent<String>>(&bus, &trail, PostOrder::Normal, "string")?;
        record::<PayloadEvent<i32>>(&bus, &trail, PostOrder::Normal, "int")?;
        let recorder = trail.clone();
        bus.subscribe_dyn(TypeToken::of::<PayloadEvent<Wildcard>>()?, options(PostOrder::Last), move |event| {
            anyhow::ensure!(!event.is::<FooEvent>(), "wildcard subscriber received {}", event.event_name());
            recorder.lock().push("any");
            Ok(())
        });
        bus.fire(PayloadEvent { payload: "steve".to_string() });
        assert_eq!(drain(&trail), vec!["string", "any"]);
        bus.fire(PayloadEvent { payload: 7 });
        assert_eq!(drain(&trail), vec!["int", "any"]);
        bus.fire(PayloadEvent { payload: 7u8 });
        assert_eq!(drain(&trail), vec!["any"]);
        Ok(())
    }

    #[test]
    fn test_wildcard_in_typed_subscriber() {
        let bus = EventBus::<()>::new();
        let result = bus.subscribe(|_: &mut PayloadEvent<Wildcard>| Ok(()));
        assert!(matches!(result, Err(RegistrationError::WildcardInTypedSubscriber(_))));
        assert!(bus.is_empty());
    }

    #[test]
    fn test_supertype_delivery() -> anyhow::Result<()> {
        let bus = EventBus::<()>::new();
        bus.subscribe(|event: &mut BaseEvent| {
            event.hits += 1;
            Ok(())
        })?;
        bus.subscribe(|event: &mut ChildEvent| {
            event.hits += 1;
            Ok(())
        })?;
        let child = bus.fire(ChildEvent::default()).into_event();
        assert_eq!((child.hits, child.base.hits), (1, 1));
        let base = bus.fire(BaseEvent::default()).into_event();
        assert_eq!(base.hits, 1);
        Ok(())
    }

    #[test]
    fn test_cancel_through_parent() -> anyhow::Result<()> {
        let bus = EventBus::<()>::new();
        bus.subscribe_with(options(PostOrder::First), |event: &mut ChildEvent| {
            event.base.cancel();
            Ok(())
        })?;
        bus.subscribe(|event: &mut BaseEvent| {
            event.hits += 1;
            Ok(())
        })?;
        let child = bus.fire(ChildEvent::default()).into_event();
        assert_eq!(child.base.hits, 0);
        assert!((&child as &dyn DynEvent).is_cancelled());
        Ok(())
    }

    #[test]
    fn test_parameterized_supertype() -> anyhow::Result<()> {
        let bus = EventBus::new();
        let trail = Trail::default();
        record::<PayloadEvent<String>>(&bus, &trail, PostOrder::Normal, "payload")?;
        bus.fire(WrappedEvent { inner: PayloadEvent { payload: "steve".to_string() } });
        assert_eq!(drain(&trail), vec!["payload"]);
        bus.fire(WrappedEvent { inner: PayloadEvent { payload: 1u64 } });
        assert!(drain(&trail).is_empty());
        Ok(())
    }

    #[test]
    fn test_failure_isolation() -> anyhow::Result<()> {
        let bus = EventBus::new();
        let trail = Trail::default();
        record::<FooEvent>(&bus, &trail, PostOrder::First, "before")?;
        let failing = bus.subscribe(|_: &mut FooEvent| Err(anyhow!("broken subscriber")))?;
        bus.subscribe(|_: &mut FooEvent| -> anyhow::Result<()> { panic!("panicking subscriber") })?;
        record::<FooEvent>(&bus, &trail, PostOrder::Last, "after")?;
        let result = bus.fire_silently(FooEvent);
        assert_eq!(drain(&trail), vec!["before", "after"]);
        assert!(!result.success());
        let failures = result.failures();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].subscriber().id(), failing.id());
        assert_eq!(failures[0].error().to_string(), "broken subscriber");
        assert!(matches!(failures[1].error(), DispatchError::Panicked(message) if message == "panicking subscriber"));
        Ok(())
    }

    #[test]
    fn test_round_trip() -> anyhow::Result<()> {
        let bus = EventBus::new();
        let trail = Trail::default();
        let subscription = record::<FooEvent>(&bus, &trail, PostOrder::Normal, "once")?;
        assert!(bus.is_subscribed(&subscription));
        bus.unsubscribe(&subscription)?;
        assert!(!bus.is_subscribed(&subscription));
        assert!(bus.fire(FooEvent).success());
        assert!(drain(&trail).is_empty());
        assert!(matches!(bus.unsubscribe(&subscription), Err(RegistrationError::NotRegistered(id)) if id == subscription.id()));
        assert!(bus.subscribers::<FooEvent>()?.is_empty());
        Ok(())
    }

    #[derive(Default)]
    struct PluginListener {
        seen: AtomicUsize,
    }

    #[listener]
    impl PluginListener {
        #[subscribe]
        fn on_foo(&self, _event: &mut FooEvent) {
            self.seen.fetch_add(1, Ordering::SeqCst);
        }

        #[subscribe(order = "late")]
        fn on_payload(&self, event: &mut PayloadEvent<String>) {
            event.payload.push('!');
            self.seen.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_owner_teardown() -> anyhow::Result<()> {
        let bus = EventBus::<&'static str>::new();
        let plugin = Arc::new(PluginListener::default());
        bus.register("plugin", plugin.clone())?;
        bus.subscribe_with(SubscribeOptions::builder().owner("core").build(), |_: &mut FooEvent| Ok(()))?;
        assert_eq!(bus.len(), 3);
        let event = bus.fire(PayloadEvent { payload: "hi".to_string() }).into_event();
        assert_eq!(event.payload, "hi!");
        assert_eq!(bus.unregister_all(&"plugin")?, 2);
        bus.fire(FooEvent);
        assert_eq!(plugin.seen.load(Ordering::SeqCst), 1);
        assert_eq!(bus.subscribers::<FooEvent>()?.len(), 1);
        assert!(matches!(bus.unregister_all(&"plugin"), Err(RegistrationError::UnknownOwner(_))));
        bus.clear();
        assert!(bus.is_empty());
        Ok(())
    }

    #[derive(Default)]
    struct Greeter {
        greeted: AtomicUsize,
    }

    impl Greeter {
        fn greet(&self, _event: &mut FooEvent) -> anyhow::Result<()> {
            self.greeted.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_method_subscribers() -> anyhow::Result<()> {
        let bus = EventBus::<()>::new();
        let strong = Arc::new(Greeter::default());
        bus.subscribe_method(&strong, Greeter::greet, SubscribeOptions::default())?;
        let weak = Arc::new(Greeter::default());
        bus.subscribe_weak(&Arc::downgrade(&weak), Greeter::greet, SubscribeOptions::default())?;
        assert!(bus.fire(FooEvent).success());
        assert_eq!(weak.greeted.load(Ordering::SeqCst), 1);
        drop(weak);
        let result = bus.fire_silently(FooEvent);
        assert_eq!(strong.greeted.load(Ordering::SeqCst), 2);
        assert!(matches!(result.failures()[0].error(), DispatchError::ListenerDropped(_)));
        assert!(matches!(
            bus.subscribe_weak(&Weak::<Greeter>::new(), Greeter::greet, SubscribeOptions::default()),
            Err(RegistrationError::ListenerDropped(_))
        ));
        Ok(())
    }

    #[test]
    fn test_dispatch_uses_snapshot() -> anyhow::Result<()> {
        let bus = Arc::new(EventBus::<()>::new());
        let trail = Trail::default();
        let late = record::<FooEvent>(&bus, &trail, PostOrder::Late, "late")?;
        let handle = Arc::downgrade(&bus);
        let recorder = trail.clone();
        let added = trail.clone();
        bus.subscribe_with(options(PostOrder::First), move |_: &mut FooEvent| {
            recorder.lock().push("first");
            let bus = handle.upgrade().ok_or_else(|| anyhow!("bus dropped"))?;
            if bus.is_subscribed(&late) {
                bus.unsubscribe(&late)?;
                let added = added.clone();
                bus.subscribe_with(options(PostOrder::Normal), move |_: &mut FooEvent| {
                    added.lock().push("added");
                    Ok(())
                })?;
            }
            Ok(())
        })?;
        assert!(bus.fire(FooEvent).success());
        assert_eq!(drain(&trail), vec!["first", "late"]);
        assert!(bus.fire(FooEvent).success());
        assert_eq!(drain(&trail), vec!["first", "added"]);
        Ok(())
    }

    #[test]
    fn test_concurrent_dispatch() -> anyhow::Result<()> {
        let bus = EventBus::<()>::new();
        let counter = Arc::new(AtomicUsize::new(0));
        for order in PostOrder::ALL {
            let counter = counter.clone();
            bus.subscribe_with(options(order), move |event: &mut PayloadEvent<Vec<PostOrder>>| {
                event.payload.push(order);
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })?;
        }
        thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..50 {
                        let event = bus.fire(PayloadEvent { payload: Vec::new() }).into_event();
                        assert!(event.payload.starts_with(&PostOrder::ALL));
                    }
                });
            }
            scope.spawn(|| {
                for _ in 0..50 {
                    if let Ok(subscription) = bus.subscribe(|_: &mut PayloadEvent<Vec<PostOrder>>| Ok(())) {
                        let _ = bus.unsubscribe(&subscription);
                    }
                }
            });
        });
        assert_eq!(counter.load(Ordering::SeqCst), 4 * 50 * PostOrder::ALL.len());
        assert_eq!(bus.len(), PostOrder::ALL.len());
        Ok(())
    }
}
