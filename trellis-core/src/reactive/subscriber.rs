//! Subscriber types for the reactive system.
//!
//! A subscriber is a plain callback attached to a signal with [`Signal::on`],
//! optionally gated by a liveness [`Condition`]. Subscribers are stored in an
//! insertion-ordered [`SubscriberList`]. A notification pass walks a
//! snapshot of the list, so the stored list stays in place while callbacks
//! run: a callback may subscribe, unsubscribe or write the signal again, and
//! a nested pass reaches every subscriber still attached. A subscriber whose
//! condition has turned false is removed by the first pass that reaches it.
//!
//! [`Signal::on`]: super::Signal::on

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use smallvec::SmallVec;

/// Unique identifier for a subscriber.
///
/// Plain callbacks, effects and computed values all get one. Closures have
/// no identity of their own, so the id is the handle used to detach them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// A liveness predicate. While it returns true the subscription (or effect)
/// it guards stays attached.
pub type Condition = Rc<dyn Fn() -> bool>;

/// A callback that receives the committed value of a signal.
pub(crate) type Callback<T> = Rc<dyn Fn(&T)>;

/// A callback attached to a signal together with its liveness condition.
pub(crate) struct Subscriber<T> {
    pub(crate) callback: Callback<T>,
    pub(crate) condition: Option<Condition>,
}

impl<T> Subscriber<T> {
    pub(crate) fn new(callback: Callback<T>, condition: Option<Condition>) -> Self {
        Self {
            callback,
            condition,
        }
    }

    /// Whether the subscriber should still receive values.
    pub(crate) fn is_live(&self) -> bool {
        self.condition.as_ref().map_or(true, |condition| condition())
    }
}

/// Subscribers visited by one pass, in insertion order.
type Snapshot<T> = SmallVec<[(SubscriberId, Rc<Subscriber<T>>); 8]>;

/// Insertion-ordered subscriber storage.
///
/// The list lives behind a `RefCell` owned by the signal. A pass never holds
/// the borrow while user code runs.
pub(crate) struct SubscriberList<T> {
    entries: IndexMap<SubscriberId, Rc<Subscriber<T>>>,
}

impl<T> Default for SubscriberList<T> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }
}

impl<T> SubscriberList<T> {
    pub(crate) fn insert(&mut self, id: SubscriberId, subscriber: Subscriber<T>) {
        self.entries.insert(id, Rc::new(subscriber));
    }

    pub(crate) fn contains(&self, id: SubscriberId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Detach a subscriber. Returns whether it was attached.
    pub(crate) fn remove(&mut self, id: SubscriberId) -> bool {
        self.entries.shift_remove(&id).is_some()
    }

    /// Drop every subscriber. Running passes skip the ones they have not
    /// reached yet.
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    fn snapshot(list: &RefCell<Self>) -> Snapshot<T> {
        list.borrow()
            .entries
            .iter()
            .map(|(id, subscriber)| (*id, subscriber.clone()))
            .collect()
    }

    /// Run one notification pass.
    ///
    /// Every subscriber attached when the pass starts is handed to `deliver`
    /// in insertion order, unless it was detached by an earlier callback.
    /// Subscribers whose condition fails are removed instead. Subscribers
    /// attached during the pass are kept but not delivered to. Returns the
    /// number of subscribers attached after the pass.
    pub(crate) fn notify(list: &RefCell<Self>, mut deliver: impl FnMut(&Subscriber<T>)) -> usize {
        let mut dropped = 0usize;
        for (id, subscriber) in Self::snapshot(list) {
            if !list.borrow().contains(id) {
                continue;
            }
            if !subscriber.is_live() {
                list.borrow_mut().remove(id);
                dropped += 1;
                continue;
            }
            deliver(&subscriber);
        }

        let remaining = list.borrow().len();
        if dropped > 0 {
            tracing::trace!(dropped, remaining, "compacted subscribers");
        }
        remaining
    }

    /// Evaluate every condition without delivering a value, dropping the
    /// subscribers whose condition fails. Returns the number that remain.
    pub(crate) fn sweep(list: &RefCell<Self>) -> usize {
        for (id, subscriber) in Self::snapshot(list) {
            if !subscriber.is_live() {
                list.borrow_mut().remove(id);
            }
        }
        list.borrow().len()
    }
}
