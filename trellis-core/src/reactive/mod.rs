//! Reactive Primitives
//!
//! This module implements the update engine: signals, effects and computed
//! values. Everything is single-threaded and synchronous; a write runs every
//! cleanup, subscriber and dependent effect to completion before it returns.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state with an equality, an optional
//! guard, and a list of plain subscribers. Subscribers may carry a liveness
//! condition and are dropped at the first notification after it fails.
//!
//! ## Effects
//!
//! An Effect re-runs whenever one of the signals it was declared with is
//! written. Dependencies are explicit: reading a signal inside an effect body
//! does not subscribe to it.
//!
//! ## Computed values
//!
//! A Computed is a signal whose only writer is an effect.
//!
//! # Implementation Notes
//!
//! The runtime keeps a thread-local registry from signal id to the effects
//! depending on it. The registry holds no strong references: signals remove
//! their entry when dropped, and effects are owned by their handles.

mod computed;
mod context;
mod effect;
mod runtime;
mod signal;
mod subscriber;

pub use computed::Computed;
pub use context::{notify_depth, on_cleanup, Cleanup, ReactiveContext};
pub use effect::{Effect, EffectOptions};
pub use runtime::{Reactive, Runtime};
pub use signal::{always, Equality, Formatter, Guard, Observable, Signal, Trackable};
pub use subscriber::{Condition, SubscriberId};
