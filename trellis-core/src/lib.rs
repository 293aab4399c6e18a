//! Trellis Core
//!
//! This crate provides the update engine of the Trellis UI toolkit.
//! It implements:
//!
//! - Reactive primitives (signals, effects, computed values)
//! - Keyed list reconciliation over a persistent DOM region
//! - Text bindings and template slot assembly
//! - A small in-memory DOM the engine drives
//!
//! Everything is single-threaded and synchronous. A write runs every
//! cleanup, subscriber and dependent effect before it returns.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Signals, effects, computed values and the dependency registry
//! - `keyed`: Keyed reconcilers (map, set and list variants)
//! - `bind`: Text bindings and slot assembly
//! - `dom`: The node tree
//! - `config`: Per-thread runtime configuration
//! - `error`: Error types
//!
//! # Example
//!
//! ```rust
//! use trellis_core::bind::bind_text;
//! use trellis_core::dom::Node;
//! use trellis_core::reactive::{Computed, Effect, Signal};
//!
//! // Create a signal
//! let count = Signal::new(0);
//!
//! // Create a derived value
//! let doubled = Computed::from_signal(&count, |v| v * 2);
//!
//! // Render it
//! let label = Node::element("span");
//! label.append_child(&bind_text(&doubled)).unwrap();
//!
//! // Create an effect
//! let source = count.clone();
//! let _log = Effect::new(move || tracing::info!(count = source.get()), &[&count]);
//!
//! // Update the signal
//! count.set(5);
//! assert_eq!(label.to_html(), "<span>10</span>");
//! ```

pub mod bind;
pub mod config;
pub mod dom;
pub mod error;
pub mod keyed;
pub mod reactive;

pub use config::RuntimeConfig;
pub use error::{ConfigError, DomError, ReactiveError, ReconcileError, SlotError};
