//! In-memory DOM
//!
//! A small single-threaded node tree. Bindings write text into it and keyed
//! reconcilers move item subtrees around inside it.

mod node;

pub use node::{Node, NodeId, NodeKind, WeakNode};
