//! Reactive Context
//!
//! The reactive context tracks which effect is currently running, so that
//! [`on_cleanup`] can attach a cleanup to it, and how deeply write
//! notifications are nested on this thread.
//!
//! # Implementation
//!
//! We use a thread-local stack of running effects. Running an effect pushes
//! an entry; cleanups registered while it runs are collected in that entry
//! and handed back to the effect before the entry is popped. Nested effects
//! (an effect whose body writes a signal that re-runs another effect) get
//! their own entries.
//!
//! The notification depth is a plain counter guarded by [`DepthGuard`].

use std::cell::{Cell, RefCell};

use smallvec::SmallVec;

use super::SubscriberId;

/// A cleanup registered by an effect body. Runs before the effect's next
/// run, or when the effect is released.
pub type Cleanup = Box<dyn FnOnce()>;

/// Cleanups pending on one effect, in registration order.
pub(crate) type Cleanups = SmallVec<[Cleanup; 1]>;

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<ContextEntry>> = const { RefCell::new(Vec::new()) };
    static NOTIFY_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// An entry in the reactive context stack.
struct ContextEntry {
    subscriber_id: SubscriberId,
    cleanups: Cleanups,
}

/// Guard that pops the context when dropped.
///
/// This keeps the stack balanced even if the effect body panics.
pub struct ReactiveContext {
    subscriber_id: SubscriberId,
}

impl ReactiveContext {
    /// Enter a new reactive context for the given effect.
    ///
    /// The context is exited when the returned guard is dropped.
    pub fn enter(subscriber_id: SubscriberId) -> Self {
        CONTEXT_STACK.with(|stack| {
            stack.borrow_mut().push(ContextEntry {
                subscriber_id,
                cleanups: SmallVec::new(),
            });
        });

        Self { subscriber_id }
    }

    /// Check if an effect is currently running.
    pub fn is_active() -> bool {
        CONTEXT_STACK.with(|stack| !stack.borrow().is_empty())
    }

    /// Get the id of the innermost running effect, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().map(|entry| entry.subscriber_id))
    }

    /// Take the cleanups registered so far in the current context.
    pub(crate) fn take_cleanups(&self) -> Cleanups {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow_mut()
                .last_mut()
                .map(|entry| std::mem::take(&mut entry.cleanups))
                .unwrap_or_default()
        })
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        let _ = CONTEXT_STACK.try_with(|stack| {
            let popped = stack.borrow_mut().pop();

            if let Some(entry) = popped {
                debug_assert_eq!(
                    entry.subscriber_id, self.subscriber_id,
                    "ReactiveContext mismatch: expected {:?}, got {:?}",
                    self.subscriber_id, entry.subscriber_id
                );
            }
        });
    }
}

/// Register `cleanup` on the running effect.
///
/// The cleanup runs before the effect's next run (for signal-driven runs,
/// before the triggering signal commits its new value) or when the effect
/// is released. Returns `false`, dropping the cleanup unrun, when no effect
/// is running.
pub fn on_cleanup(cleanup: impl FnOnce() + 'static) -> bool {
    let registered = CONTEXT_STACK.with(|stack| match stack.borrow_mut().last_mut() {
        Some(entry) => {
            entry.cleanups.push(Box::new(cleanup));
            true
        }
        None => false,
    });
    if !registered {
        tracing::warn!("on_cleanup called outside of a running effect; cleanup discarded");
    }
    registered
}

/// Current nesting depth of write notifications on this thread.
pub fn notify_depth() -> usize {
    NOTIFY_DEPTH.with(Cell::get)
}

/// Counts one level of write notification for as long as it lives.
pub(crate) struct DepthGuard(());

impl DepthGuard {
    /// Enter one more level, or return the current depth if that would
    /// exceed `max_depth`.
    pub(crate) fn enter(max_depth: usize) -> Result<Self, usize> {
        NOTIFY_DEPTH.with(|depth| {
            let current = depth.get();
            if current >= max_depth {
                return Err(current);
            }
            depth.set(current + 1);
            Ok(Self(()))
        })
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        let _ = NOTIFY_DEPTH.try_with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}
