//! Effect Implementation
//!
//! An Effect is a side-effecting computation that re-runs whenever one of
//! its declared dependencies is written.
//!
//! # How Effects Work
//!
//! 1. When created, the effect joins the dependency set of every signal in
//!    its dependency list, then runs once.
//!
//! 2. When a dependency changes, the signal first runs the effect's pending
//!    cleanups (the old value is still stored), commits, notifies its plain
//!    subscribers, and finally re-runs the effect.
//!
//! 3. Before each run the liveness condition, if any, is checked. An effect
//!    whose condition fails releases itself instead of running.
//!
//! # Cleanup
//!
//! The body registers cleanups with [`on_cleanup`](super::on_cleanup).
//! They run before the next run, or on [`Effect::release`].
//!
//! # Ownership
//!
//! The dependency registry only holds weak references, so an effect lives
//! as long as one of its handles does. Keep the handle around for as long as
//! the effect should stay subscribed.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use super::context::{Cleanups, ReactiveContext};
use super::runtime::{DependencySet, Reactive, Runtime};
use super::signal::Trackable;
use super::subscriber::{Condition, SubscriberId};

/// Options accepted by [`Effect::with_options`].
#[derive(Default, Clone)]
pub struct EffectOptions {
    /// Liveness condition, checked before every run.
    pub condition: Option<Condition>,

    /// Debug name, used in log events.
    pub name: Option<String>,
}

impl EffectOptions {
    pub fn condition(mut self, condition: impl Fn() -> bool + 'static) -> Self {
        self.condition = Some(Rc::new(condition));
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

struct EffectInner {
    id: SubscriberId,
    name: Option<String>,
    expression: Rc<dyn Fn()>,
    condition: Option<Condition>,
    cleanups: RefCell<Cleanups>,
    joined: RefCell<SmallVec<[Weak<RefCell<DependencySet>>; 4]>>,
    released: Cell<bool>,
    run_count: Cell<usize>,
    on_release: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl EffectInner {
    fn execute(&self) {
        if self.released.get() || !self.check() {
            return;
        }

        tracing::trace!(effect = ?self.id, name = self.name.as_deref(), "effect run");

        let ctx = ReactiveContext::enter(self.id);
        let expression = self.expression.clone();
        expression();
        let cleanups = ctx.take_cleanups();
        drop(ctx);

        *self.cleanups.borrow_mut() = cleanups;
        self.run_count.set(self.run_count.get() + 1);
    }

    fn check(&self) -> bool {
        if self.released.get() {
            return false;
        }
        if let Some(condition) = &self.condition {
            if !condition() {
                tracing::debug!(effect = ?self.id, name = self.name.as_deref(), "effect condition failed");
                self.release();
                return false;
            }
        }
        true
    }

    fn release(&self) {
        if self.released.replace(true) {
            return;
        }

        self.run_cleanups();
        self.leave_sets();

        let hook = self.on_release.borrow_mut().take();
        if let Some(hook) = hook {
            hook();
        }
    }

    fn leave_sets(&self) {
        let joined = std::mem::take(&mut *self.joined.borrow_mut());
        for set in joined {
            if let Some(set) = set.upgrade() {
                set.borrow_mut().shift_remove(&self.id);
            }
        }
    }
}

impl Reactive for EffectInner {
    fn subscriber_id(&self) -> SubscriberId {
        self.id
    }

    fn run_cleanups(&self) {
        let cleanups = std::mem::take(&mut *self.cleanups.borrow_mut());
        for cleanup in cleanups {
            cleanup();
        }
    }

    fn notify(&self) {
        self.execute();
    }

    fn is_released(&self) -> bool {
        self.released.get()
    }
}

impl Drop for EffectInner {
    fn drop(&mut self) {
        self.leave_sets();
    }
}

/// A side-effecting computation that runs when dependencies change.
///
/// # Example
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use trellis_core::reactive::{Effect, Signal};
///
/// let count = Signal::new(0);
/// let seen = Rc::new(Cell::new(0));
///
/// let (source, sink) = (count.clone(), seen.clone());
/// let _effect = Effect::new(move || sink.set(source.get()), &[&count]);
///
/// count.set(5);
/// assert_eq!(seen.get(), 5);
/// ```
#[derive(Clone)]
pub struct Effect {
    inner: Rc<EffectInner>,
}

impl Effect {
    /// Create an effect that re-runs when any of `dependencies` changes.
    /// It runs once before this returns.
    pub fn new(expression: impl Fn() + 'static, dependencies: &[&dyn Trackable]) -> Self {
        Self::with_options(expression, dependencies, EffectOptions::default())
    }

    /// Create an effect with a liveness condition and/or debug name.
    pub fn with_options(
        expression: impl Fn() + 'static,
        dependencies: &[&dyn Trackable],
        options: EffectOptions,
    ) -> Self {
        let effect = Self::detached(expression, options);
        effect.join(dependencies);
        effect.inner.execute();
        effect
    }

    fn detached(expression: impl Fn() + 'static, options: EffectOptions) -> Self {
        Self {
            inner: Rc::new(EffectInner {
                id: SubscriberId::new(),
                name: options.name,
                expression: Rc::new(expression),
                condition: options.condition,
                cleanups: RefCell::new(SmallVec::new()),
                joined: RefCell::new(SmallVec::new()),
                released: Cell::new(false),
                run_count: Cell::new(0),
                on_release: RefCell::new(None),
            }),
        }
    }

    fn join(&self, dependencies: &[&dyn Trackable]) {
        let strong: Rc<dyn Reactive> = self.inner.clone();
        let reactive = Rc::downgrade(&strong);
        let mut joined = self.inner.joined.borrow_mut();
        for dependency in dependencies {
            joined.push(Runtime::join(
                dependency.signal_id(),
                self.inner.id,
                reactive.clone(),
            ));
        }
    }

    /// Build an effect whose release also runs `hook`. Used by computed
    /// values to drop their inner signal's subscribers.
    pub(crate) fn with_release_hook(
        expression: impl Fn() + 'static,
        dependencies: &[&dyn Trackable],
        options: EffectOptions,
        hook: impl FnOnce() + 'static,
    ) -> Self {
        let effect = Self::detached(expression, options);
        *effect.inner.on_release.borrow_mut() = Some(Box::new(hook));
        effect.join(dependencies);
        effect.inner.execute();
        effect
    }

    /// Get the subscriber ID for this effect.
    pub fn subscriber_id(&self) -> SubscriberId {
        self.inner.id
    }

    /// Run the effect now, regardless of its dependencies. Pending cleanups
    /// run first.
    pub fn run(&self) {
        if self.inner.released.get() {
            return;
        }
        self.inner.run_cleanups();
        self.inner.execute();
    }

    /// Check the liveness condition, releasing the effect if it fails.
    /// Returns whether the effect is still live.
    pub fn check(&self) -> bool {
        self.inner.check()
    }

    /// Release the effect: run pending cleanups and leave every dependency
    /// set. Calling it again does nothing.
    pub fn release(&self) {
        self.inner.release();
    }

    /// Check if the effect has been released.
    pub fn is_released(&self) -> bool {
        self.inner.released.get()
    }

    /// Get the number of times the effect has run.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.get()
    }

    /// Number of dependency sets this effect is still a member of.
    pub fn dependency_count(&self) -> usize {
        self.inner
            .joined
            .borrow()
            .iter()
            .filter(|set| set.upgrade().is_some())
            .count()
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("released", &self.is_released())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
