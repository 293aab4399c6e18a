//! Keyed Reconcilers
//!
//! A keyed reconciler maps an ordered key/value sequence onto item records,
//! each owning a few DOM nodes and some bound state. Passes reuse the
//! records of keys that persist, create records for new keys, remove the
//! rest, and move nodes only where the order changed.
//!
//! # Variants
//!
//! - [`reconcile_by_key`]: explicit keys, values may repeat.
//! - [`reconcile_by_set`]: each value is its own key.
//! - [`reconcile_by_index`]: the position is the key, so identity shifts on
//!   insert and remove.
//!
//! # Example
//!
//! ```rust
//! use trellis_core::dom::Node;
//! use trellis_core::keyed::{reconcile_by_key, ItemView};
//!
//! let todos = reconcile_by_key(|_id: &u32, title: &String| {
//!     let li = Node::element("li");
//!     li.append_child(&Node::text(title.clone())).unwrap();
//!     ItemView::from(li)
//! })
//! .wrapper(|anchor| {
//!     let ul = Node::element("ul");
//!     ul.append_child(anchor).unwrap();
//!     ul
//! })
//! .build();
//!
//! todos.assign([(1, "write".to_string()), (2, "test".to_string())]).unwrap();
//! assert_eq!(todos.root().to_html(), "<ul><li>write</li><li>test</li><!--keyed--></ul>");
//! ```

mod builder;
mod reconciler;
mod variants;

pub use builder::{reconcile_by_index, reconcile_by_key, reconcile_by_set, KeyedBuilder};
pub use reconciler::{
    ItemHook, ItemView, Keyed, PassStats, Region, Template, UpdateHook, Wrapper,
};
pub use variants::{KeyedList, KeyedMap, KeyedSet};
