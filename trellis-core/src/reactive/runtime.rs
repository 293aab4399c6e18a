//! Reactive Runtime
//!
//! The runtime owns the dependency registry: the association from a signal
//! to the set of effects that must re-run when it changes, and the
//! per-thread [`RuntimeConfig`].
//!
//! # Ownership
//!
//! Neither side of the association is kept alive by it:
//!
//! - Sets are keyed by signal id. A signal removes its entry when its last
//!   handle is dropped (or on [`Signal::release`]).
//! - Set members are `Weak<dyn Reactive>`. Effects are owned by their
//!   handles; a dropped effect is skipped and pruned on the next notification.
//! - An effect keeps `Weak` references to the sets it joined, so releasing it
//!   does not resurrect a set whose signal is gone.
//!
//! [`Signal::release`]: super::Signal::release

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use smallvec::SmallVec;

use super::subscriber::SubscriberId;
use crate::config::RuntimeConfig;

/// A re-runnable unit of work that the registry can notify.
pub trait Reactive {
    /// Get the subscriber ID for this reactive value.
    fn subscriber_id(&self) -> SubscriberId;

    /// Run and clear pending cleanups. Called by a signal before it commits
    /// a new value.
    fn run_cleanups(&self);

    /// Re-run in response to a dependency write.
    fn notify(&self);

    /// Whether the reactive value has been released.
    fn is_released(&self) -> bool;
}

/// Effects depending on one signal, in join order.
pub(crate) type DependencySet = IndexMap<SubscriberId, Weak<dyn Reactive>>;

/// A shared dependency set. The registry holds the only strong reference.
pub(crate) type SharedDependencySet = Rc<RefCell<DependencySet>>;

/// Snapshot of the live dependents of a signal.
pub(crate) type Dependents = SmallVec<[Rc<dyn Reactive>; 4]>;

thread_local! {
    static REGISTRY: RefCell<HashMap<u64, SharedDependencySet>> = RefCell::new(HashMap::new());
    static CONFIG: RefCell<RuntimeConfig> = RefCell::new(RuntimeConfig::default());
}

/// The per-thread reactive runtime.
pub struct Runtime;

impl Runtime {
    /// Install `config` for the current thread.
    pub fn configure(config: RuntimeConfig) {
        tracing::debug!(?config, "runtime configured");
        CONFIG.with(|current| *current.borrow_mut() = config);
    }

    /// The config in effect on the current thread.
    pub fn config() -> RuntimeConfig {
        CONFIG.with(|config| config.borrow().clone())
    }

    pub(crate) fn max_depth() -> usize {
        CONFIG.with(|config| config.borrow().max_depth)
    }

    pub(crate) fn warn_on_duplicate_keys() -> bool {
        CONFIG.with(|config| config.borrow().warn_on_duplicate_keys)
    }

    /// Add `reactive` to the dependency set of `signal_id`, creating the set
    /// if absent. Returns a weak reference to the set for later release.
    pub(crate) fn join(
        signal_id: u64,
        subscriber_id: SubscriberId,
        reactive: Weak<dyn Reactive>,
    ) -> Weak<RefCell<DependencySet>> {
        REGISTRY.with(|registry| {
            let mut registry = registry.borrow_mut();
            let set = registry.entry(signal_id).or_default();
            set.borrow_mut().insert(subscriber_id, reactive);
            Rc::downgrade(set)
        })
    }

    /// Collect the live, unreleased dependents of `signal_id`, pruning
    /// members whose effect has been dropped.
    pub(crate) fn dependents(signal_id: u64) -> Dependents {
        let set = REGISTRY.with(|registry| registry.borrow().get(&signal_id).cloned());
        let Some(set) = set else {
            return Dependents::new();
        };

        let mut set = set.borrow_mut();
        let mut dependents = Dependents::new();
        set.retain(|_, weak| match weak.upgrade() {
            Some(reactive) => {
                if !reactive.is_released() {
                    dependents.push(reactive);
                }
                true
            }
            None => false,
        });
        dependents
    }

    /// Drop the dependency set of `signal_id`.
    pub(crate) fn forget(signal_id: u64) {
        // The registry may already be gone during thread teardown.
        let _ = REGISTRY.try_with(|registry| {
            registry.borrow_mut().remove(&signal_id);
        });
    }

    /// Number of effects registered against `signal_id`.
    pub fn dependent_count(signal_id: u64) -> usize {
        REGISTRY.with(|registry| {
            registry
                .borrow()
                .get(&signal_id)
                .map_or(0, |set| set.borrow().len())
        })
    }

    /// Whether `signal_id` has an entry in the registry.
    pub fn is_tracked(signal_id: u64) -> bool {
        REGISTRY.with(|registry| registry.borrow().contains_key(&signal_id))
    }
}
