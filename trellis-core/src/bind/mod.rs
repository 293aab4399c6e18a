//! Binding Glue
//!
//! The seam between templates and the reactive core. [`bind_text`] turns a
//! signal into a text node that stays current for as long as the node
//! lives; [`assemble`] builds a fragment from a flat list of [`Slot`]s.

mod slot;
mod text;

pub use slot::{assemble, Slot};
pub use text::{bind_text, bind_text_with, TextSource};
