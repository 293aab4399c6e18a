//! Error types shared across the crate.
//!
//! Most failure conditions in the update engine are non-fatal and are logged
//! rather than returned (duplicate keys, dropped slots). The types here cover
//! the operations that can refuse to do their work.

use thiserror::Error;

/// Errors raised by signal writes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReactiveError {
    /// A write was refused because notifications were already nested
    /// `depth` levels deep. Almost always a cycle in the reactive graph.
    #[error("notification depth {depth} exceeded while writing {}", name.as_deref().unwrap_or("<unnamed signal>"))]
    DepthExceeded {
        depth: usize,
        name: Option<String>,
    },
}

/// Errors raised by keyed reconcilers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// The reconciler was used from inside one of its own callbacks while a
    /// pass was running.
    #[error("reconciler is busy with a pass and cannot be re-entered")]
    Busy,
}

/// Errors found while assembling template slots.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SlotError {
    #[error("close bracket at slot {index} has no matching open bracket")]
    UnmatchedClose { index: usize },

    #[error("slot {index} opens a {kind} node, which cannot hold children")]
    NotAContainer { index: usize, kind: &'static str },

    #[error("{count} open bracket(s) were never closed")]
    Unclosed { count: usize },
}

/// Errors raised while loading [`RuntimeConfig`](crate::config::RuntimeConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid runtime config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("max_depth must be at least 1")]
    ZeroDepth,
}

/// Errors raised by DOM tree mutations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("reference node is not a child of the target node")]
    NotAChild,

    #[error("cannot insert a node into itself or one of its descendants")]
    Hierarchy,

    #[error("{0} nodes cannot have children")]
    Leaf(&'static str),
}
