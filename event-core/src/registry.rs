use std::collections::hash_map::Entry;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use ahash::HashMap;
use arc_swap::ArcSwap;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::RegistrationError;
use crate::subscribe::{Owner, PendingSubscriber, Subscriber, Subscription, SubscriptionId};
use crate::types::{ErasedType, EventType, TypeToken};
use crate::types::matcher;

pub(crate) type Candidates<O> = Arc<[Arc<Subscriber<O>>]>;

/// Immutable view of every subscriber, replaced as a whole on each write.
struct Snapshot<O> {
    buckets: HashMap<ErasedType, Candidates<O>>,
    sorted: DashMap<TypeToken, Candidates<O>>,
}

impl<O> Snapshot<O> {
    fn new(buckets: HashMap<ErasedType, Candidates<O>>) -> Self {
        Self {
            buckets,
            sorted: DashMap::new(),
        }
    }
}

/// Writer side bookkeeping, only touched under the registry mutex.
struct Book<O> {
    next_id: u64,
    owners: HashMap<O, Vec<SubscriptionId>>,
    locations: HashMap<SubscriptionId, ErasedType>,
}

pub(crate) struct Registry<O> {
    snapshot: ArcSwap<Snapshot<O>>,
    book: Mutex<Book<O>>,
    cache_candidates: bool,
}

impl<O> Registry<O> where O: Owner {
    pub(crate) fn new(cache_candidates: bool) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(Snapshot::new(HashMap::default())),
            book: Mutex::new(Book {
                next_id: 0,
                owners: HashMap::default(),
                locations: HashMap::default(),
            }),
            cache_candidates,
        }
    }

    /// Inserts every pending subscriber in one published snapshot, so a
    /// dispatch sees either all of them or none.
    pub(crate) fn insert(&self, pending: Vec<PendingSubscriber<O>>) -> Vec<Subscription> {
        let mut book = self.book.lock();
        let mut buckets = self.snapshot.load().buckets.clone();
        let subscriptions = pending
            .into_iter()
            .map(|pending| attach(&mut book, &mut buckets, pending))
            .collect();
        self.snapshot.store(Arc::new(Snapshot::new(buckets)));
        subscriptions
    }

    pub(crate) fn insert_one(&self, pending: PendingSubscriber<O>) -> Subscription {
        let mut book = self.book.lock();
        let mut buckets = self.snapshot.load().buckets.clone();
        let subscription = attach(&mut book, &mut buckets, pending);
        self.snapshot.store(Arc::new(Snapshot::new(buckets)));
        subscription
    }

    pub(crate) fn remove(&self, id: SubscriptionId) -> Option<Arc<Subscriber<O>>> {
        let mut book = self.book.lock();
        let erased = book.locations.remove(&id)?;
        let mut buckets = self.snapshot.load().buckets.clone();
        let removed = detach(&mut buckets, erased, &[id]).pop();
        if let Some(owner) = removed.as_ref().and_then(|subscriber| subscriber.owner()) {
            if let Entry::Occupied(mut entry) = book.owners.entry(owner.clone()) {
                entry.get_mut().retain(|owned| *owned != id);
                if entry.get().is_empty() {
                    entry.remove();
                }
            }
        }
        self.snapshot.store(Arc::new(Snapshot::new(buckets)));
        removed
    }

    pub(crate) fn remove_owner(&self, owner: &O) -> Result<Vec<Arc<Subscriber<O>>>, RegistrationError> {
        let mut book = self.book.lock();
        let ids = book.owners.remove(owner).ok_or_else(|| RegistrationError::UnknownOwner(format!("{:?}", owner)))?;
        let mut grouped: HashMap<ErasedType, Vec<SubscriptionId>> = HashMap::default();
        for id in ids {
            if let Some(erased) = book.locations.remove(&id) {
                grouped.entry(erased).or_default().push(id);
            }
        }
        let mut buckets = self.snapshot.load().buckets.clone();
        let mut removed = vec![];
        for (erased, ids) in grouped {
            removed.extend(detach(&mut buckets, erased, &ids));
        }
        removed.sort_by_key(|subscriber| subscriber.id());
        self.snapshot.store(Arc::new(Snapshot::new(buckets)));
        Ok(removed)
    }

    pub(crate) fn clear(&self) -> usize {
        let mut book = self.book.lock();
        let removed = book.locations.len();
        book.owners.clear();
        book.locations.clear();
        self.snapshot.store(Arc::new(Snapshot::new(HashMap::default())));
        removed
    }

    /// Subscribers that receive an event of `event_type`, in dispatch order.
    /// The result belongs to the snapshot current at the time of the call.
    pub(crate) fn candidates(&self, event_type: &EventType) -> Candidates<O> {
        let snapshot = self.snapshot.load_full();
        if self.cache_candidates {
            if let Some(cached) = snapshot.sorted.get(event_type.token()) {
                return cached.value().clone();
            }
        }
        let mut candidates = vec![];
        for runtime in event_type.lineage() {
            if let Some(bucket) = snapshot.buckets.get(&runtime.erased()) {
                candidates.extend(bucket.iter().filter(|subscriber| matcher::matches(subscriber.interest(), runtime)).cloned());
            }
        }
        candidates.sort_by_key(|subscriber| (subscriber.order(), subscriber.id()));
        trace!("event {} has {} candidates", event_type, candidates.len());
        let candidates: Candidates<O> = candidates.into();
        if self.cache_candidates {
            snapshot.sorted.insert(event_type.token().clone(), candidates.clone());
        }
        candidates
    }

    pub(crate) fn subscribers(&self, erased: ErasedType) -> Vec<Arc<Subscriber<O>>> {
        self.snapshot.load().buckets.get(&erased).map(|bucket| bucket.to_vec()).unwrap_or_default()
    }

    pub(crate) fn contains(&self, id: SubscriptionId) -> bool {
        self.book.lock().locations.contains_key(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.snapshot.load().buckets.values().map(|bucket| bucket.len()).sum()
    }
}

fn attach<O>(book: &mut Book<O>, buckets: &mut HashMap<ErasedType, Candidates<O>>, pending: PendingSubscriber<O>) -> Subscription where O: Owner {
    let id = SubscriptionId(book.next_id);
    book.next_id += 1;
    let subscriber = Arc::new(pending.into_subscriber(id));
    let erased = subscriber.interest().erased();
    let mut bucket = buckets.get(&erased).map(|bucket| bucket.to_vec()).unwrap_or_default();
    bucket.push(subscriber.clone());
    buckets.insert(erased, bucket.into());
    book.locations.insert(id, erased);
    if let Some(owner) = subscriber.owner() {
        book.owners.entry(owner.clone()).or_default().push(id);
    }
    debug!("{} subscribe {} with order {}", subscriber, subscriber.interest(), subscriber.order());
    Subscription::new(id, subscriber.interest().clone())
}

fn detach<O>(buckets: &mut HashMap<ErasedType, Candidates<O>>, erased: ErasedType, ids: &[SubscriptionId]) -> Vec<Arc<Subscriber<O>>> {
    let Some(bucket) = buckets.get(&erased) else {
        return vec![];
    };
    let (removed, kept): (Vec<_>, Vec<_>) = bucket.iter().cloned().partition(|subscriber| ids.contains(&subscriber.id()));
    if kept.is_empty() {
        buckets.remove(&erased);
    } else {
        buckets.insert(erased, kept.into());
    }
    removed
}

impl<O> Debug for Registry<O> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot.load();
        f.debug_struct("Registry")
            .field("buckets", &snapshot.buckets.len())
            .field("cached", &snapshot.sorted.len())
            .field("cache_candidates", &self.cache_candidates)
            .finish()
    }
}
