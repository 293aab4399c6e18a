//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value, a list
//! of plain subscribers, and (through the [`Runtime`]) a set of dependent
//! effects.
//!
//! # Write Contract
//!
//! [`Signal::set`] applies the guard, then compares against the current
//! value with the signal's equality. Equal writes are no-ops. A changed
//! write then, in this order:
//!
//! 1. looks up the dependent effects and runs their pending cleanups, while
//!    the old value is still stored,
//! 2. commits the new value,
//! 3. runs a notification pass over the plain subscribers,
//! 4. re-runs every dependent effect.
//!
//! Everything happens synchronously on the caller's stack. Writes made from
//! inside a callback or effect recurse; the nesting depth is bounded by
//! [`RuntimeConfig::max_depth`](crate::config::RuntimeConfig::max_depth).
//!
//! # Memory Layout
//!
//! Each signal handle is a single `Rc` to shared state:
//! - A unique ID
//! - The value
//! - Equality, optional guard and optional formatter
//! - The insertion-ordered subscriber list

use std::cell::RefCell;
use std::fmt::{self, Debug, Display};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::context::DepthGuard;
use super::runtime::Runtime;
use super::subscriber::{Condition, Subscriber, SubscriberId, SubscriberList};
use crate::error::ReactiveError;

/// Counter for generating unique signal IDs.
static SIGNAL_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique signal ID.
fn next_signal_id() -> u64 {
    SIGNAL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Equality used to decide whether a write changes a signal.
pub type Equality<T> = Rc<dyn Fn(&T, &T) -> bool>;

/// Transform applied to every incoming value before the equality check.
/// Receives the incoming value and the current one.
pub type Guard<T> = Rc<dyn Fn(T, &T) -> T>;

/// Turns a value into display text.
pub type Formatter<T> = Rc<dyn Fn(&T) -> String>;

/// Equality that never reports two values as equal, so every write
/// notifies. Use it for values mutated in place.
pub fn always<T>(_: &T, _: &T) -> bool {
    false
}

/// Anything an effect can depend on.
pub trait Trackable {
    /// Id of the signal whose writes should trigger the dependent.
    fn signal_id(&self) -> u64;
}

/// Anything plain subscribers can attach to.
///
/// Lets glue code such as reconciler bindings accept a signal or a computed
/// value alike.
pub trait Observable {
    type Value;

    /// Subscribe `callback` for as long as `condition` holds. See
    /// [`Signal::on_while`].
    fn observe_while(
        &self,
        callback: impl Fn(&Self::Value) + 'static,
        condition: impl Fn() -> bool + 'static,
    ) -> SubscriberId;
}

struct SignalInner<T> {
    id: u64,
    name: RefCell<Option<String>>,
    value: RefCell<T>,
    equality: Equality<T>,
    guard: RefCell<Option<Guard<T>>>,
    formatter: RefCell<Option<Formatter<T>>>,
    subscribers: RefCell<SubscriberList<T>>,
}

impl<T> Drop for SignalInner<T> {
    fn drop(&mut self) {
        Runtime::forget(self.id);
    }
}

/// A reactive signal holding a value of type T.
///
/// Cloning a signal creates a new handle to the same state.
///
/// # Example
///
/// ```rust
/// use trellis_core::reactive::Signal;
///
/// let count = Signal::new(0);
/// count.set(5);
/// assert_eq!(count.get(), 5);
/// ```
pub struct Signal<T: 'static> {
    inner: Rc<SignalInner<T>>,
}

impl<T: Clone + PartialEq + 'static> Signal<T> {
    /// Create a new signal that compares values with `PartialEq`.
    pub fn new(value: T) -> Self {
        Self::with_equality(value, |a: &T, b: &T| a == b)
    }
}

impl<T: Clone + 'static> Signal<T> {
    /// Create a new signal with a custom equality.
    pub fn with_equality(value: T, equality: impl Fn(&T, &T) -> bool + 'static) -> Self {
        Self {
            inner: Rc::new(SignalInner {
                id: next_signal_id(),
                name: RefCell::new(None),
                value: RefCell::new(value),
                equality: Rc::new(equality),
                guard: RefCell::new(None),
                formatter: RefCell::new(None),
                subscribers: RefCell::new(SubscriberList::default()),
            }),
        }
    }

    /// Create a signal that notifies on every write, even of an equal value.
    pub fn always(value: T) -> Self {
        Self::with_equality(value, always::<T>)
    }

    /// Attach a debug name, used in log events.
    pub fn named(self, name: impl Into<String>) -> Self {
        *self.inner.name.borrow_mut() = Some(name.into());
        self
    }

    /// Set the formatter used when the signal is rendered as text.
    pub fn with_formatter(self, formatter: impl Fn(&T) -> String + 'static) -> Self {
        *self.inner.formatter.borrow_mut() = Some(Rc::new(formatter));
        self
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Debug name, if one was given.
    pub fn name(&self) -> Option<String> {
        self.inner.name.borrow().clone()
    }

    /// Get a clone of the current value.
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Read the current value by reference.
    ///
    /// The value is borrowed for the duration of `f`; writing to this
    /// signal from inside `f` panics.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Check the current value against `other` with the signal's equality.
    pub fn equals(&self, other: &T) -> bool {
        let equality = self.inner.equality.clone();
        let current = self.get();
        equality(&current, other)
    }

    /// Install a guard. Every write is passed through it before the
    /// equality check, and its result is what gets written.
    pub fn set_guard(&self, guard: impl Fn(T, &T) -> T + 'static) {
        *self.inner.guard.borrow_mut() = Some(Rc::new(guard));
    }

    /// Remove the guard, if any.
    pub fn clear_guard(&self) {
        *self.inner.guard.borrow_mut() = None;
    }

    /// Write a new value, returning the value stored afterwards.
    ///
    /// A refused write (see [`try_set`](Self::try_set)) is logged and leaves
    /// the value unchanged.
    pub fn set(&self, value: T) -> T {
        match self.try_set(value) {
            Ok(stored) => stored,
            Err(error) => {
                tracing::error!(%error, signal = self.inner.id, "write refused");
                self.get()
            }
        }
    }

    /// Write a new value, returning the value stored afterwards.
    ///
    /// Fails without touching the value when notifications are already
    /// nested as deep as the runtime allows.
    pub fn try_set(&self, value: T) -> Result<T, ReactiveError> {
        let current = self.get();

        let guard = self.inner.guard.borrow().clone();
        let value = match guard {
            Some(guard) => guard(value, &current),
            None => value,
        };

        let equality = self.inner.equality.clone();
        if equality(&current, &value) {
            return Ok(current);
        }

        self.commit(value)?;
        Ok(self.get())
    }

    /// Write the result of `f` applied to the current value.
    pub fn update(&self, f: impl FnOnce(&T) -> T) -> T {
        let next = self.with(f);
        self.set(next)
    }

    /// Notify subscribers and dependents as if the value had changed.
    pub fn trigger(&self) {
        let value = self.get();
        self.trigger_with(value);
    }

    /// Commit `value` and notify, bypassing guard and equality.
    pub fn trigger_with(&self, value: T) {
        if let Err(error) = self.commit(value) {
            tracing::error!(%error, signal = self.inner.id, "trigger refused");
        }
    }

    fn commit(&self, value: T) -> Result<(), ReactiveError> {
        let _depth = DepthGuard::enter(Runtime::max_depth()).map_err(|depth| {
            ReactiveError::DepthExceeded {
                depth,
                name: self.name(),
            }
        })?;

        let dependents = Runtime::dependents(self.inner.id);
        tracing::trace!(
            signal = self.inner.id,
            name = self.inner.name.borrow().as_deref(),
            dependents = dependents.len(),
            "signal changed"
        );

        // Cleanups observe the old value.
        for reactive in &dependents {
            reactive.run_cleanups();
        }

        *self.inner.value.borrow_mut() = value;

        SubscriberList::notify(&self.inner.subscribers, |subscriber| {
            let current = self.get();
            (subscriber.callback)(&current);
        });

        for reactive in dependents {
            if !reactive.is_released() {
                reactive.notify();
            }
        }
        Ok(())
    }

    /// Subscribe `callback` to every change. It is called once right away
    /// with the current value.
    pub fn on(&self, callback: impl Fn(&T) + 'static) -> SubscriberId {
        self.subscribe(Rc::new(callback), None)
    }

    /// Subscribe `callback` for as long as `condition` holds.
    ///
    /// The condition is checked on writes, not reads. If it is already false
    /// the subscription is rejected: the returned id is never attached and
    /// the callback is not called.
    pub fn on_while(
        &self,
        callback: impl Fn(&T) + 'static,
        condition: impl Fn() -> bool + 'static,
    ) -> SubscriberId {
        self.subscribe(Rc::new(callback), Some(Rc::new(condition)))
    }

    fn subscribe(&self, callback: Rc<dyn Fn(&T)>, condition: Option<Condition>) -> SubscriberId {
        let id = SubscriberId::new();

        if let Some(condition) = &condition {
            if !condition() {
                tracing::debug!(signal = self.inner.id, "subscription rejected by its condition");
                return id;
            }
        }

        let current = self.get();
        callback(&current);

        self.inner
            .subscribers
            .borrow_mut()
            .insert(id, Subscriber::new(callback, condition));
        id
    }

    /// Detach a subscriber. Returns whether it was attached.
    pub fn off(&self, id: SubscriberId) -> bool {
        self.inner.subscribers.borrow_mut().remove(id)
    }

    /// Drop every subscriber and the signal's dependency set.
    pub fn release(&self) {
        self.inner.subscribers.borrow_mut().clear();
        Runtime::forget(self.inner.id);
    }

    /// Evaluate subscriber conditions without a write, dropping the dead
    /// ones. Returns the number of subscribers left.
    pub fn check(&self) -> usize {
        SubscriberList::sweep(&self.inner.subscribers)
    }

    /// Get the number of attached subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    /// Get the number of effects registered against this signal.
    pub fn dependent_count(&self) -> usize {
        Runtime::dependent_count(self.inner.id)
    }

    pub(crate) fn formatter(&self) -> Option<Formatter<T>> {
        self.inner.formatter.borrow().clone()
    }

    /// Render the current value with the signal's formatter, falling back
    /// to `fallback` when none was set.
    pub fn format_with(&self, fallback: impl FnOnce(&T) -> String) -> String {
        let formatter = self.inner.formatter.borrow().clone();
        let current = self.get();
        match formatter {
            Some(formatter) => formatter(&current),
            None => fallback(&current),
        }
    }
}

impl<T: Clone + Display + 'static> Signal<T> {
    /// Render the current value with the signal's formatter, or `Display`.
    pub fn format(&self) -> String {
        self.format_with(ToString::to_string)
    }
}

impl<T: 'static> Trackable for Signal<T> {
    fn signal_id(&self) -> u64 {
        self.inner.id
    }
}

impl<T: Clone + 'static> Observable for Signal<T> {
    type Value = T;

    fn observe_while(
        &self,
        callback: impl Fn(&T) + 'static,
        condition: impl Fn() -> bool + 'static,
    ) -> SubscriberId {
        self.on_while(callback, condition)
    }
}

impl<T: 'static> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Debug + 'static> Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name.borrow())
            .field("value", &self.inner.value.borrow())
            .field("subscriber_count", &self.inner.subscribers.borrow().len())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
