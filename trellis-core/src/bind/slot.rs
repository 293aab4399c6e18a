use std::fmt::{self, Display};

use super::text::{bind_text, TextSource};
use crate::dom::{Node, NodeKind};
use crate::error::SlotError;
use crate::reactive::{Computed, Signal};

/// One interpolated piece of a template.
pub enum Slot {
    /// A reactive value, rendered into a bound text node.
    Text(Box<dyn TextSource>),

    /// Literal text.
    Static(String),

    /// A plain node. Fragments contribute their children.
    Node(Node),

    /// The root of a sub-component.
    Component(Node),

    /// Opens an element; following slots become its children until the
    /// matching [`Slot::Close`].
    Open(Node),

    Close,
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Text(_) => f.write_str("Text(..)"),
            Slot::Static(text) => f.debug_tuple("Static").field(text).finish(),
            Slot::Node(node) => f.debug_tuple("Node").field(node).finish(),
            Slot::Component(node) => f.debug_tuple("Component").field(node).finish(),
            Slot::Open(node) => f.debug_tuple("Open").field(&node.tag()).finish(),
            Slot::Close => f.write_str("Close"),
        }
    }
}

impl From<Node> for Slot {
    fn from(node: Node) -> Self {
        Slot::Node(node)
    }
}

impl From<&str> for Slot {
    fn from(text: &str) -> Self {
        Slot::Static(text.to_owned())
    }
}

impl From<String> for Slot {
    fn from(text: String) -> Self {
        Slot::Static(text)
    }
}

impl<T: Clone + Display + 'static> From<Signal<T>> for Slot {
    fn from(signal: Signal<T>) -> Self {
        Slot::Text(Box::new(signal))
    }
}

impl<T: Clone + Display + 'static> From<Computed<T>> for Slot {
    fn from(computed: Computed<T>) -> Self {
        Slot::Text(Box::new(computed))
    }
}

/// Build a fragment from `slots`.
///
/// Malformed slots are logged and dropped so the rest of the template still
/// renders: a close without an open is ignored, a leaf or fragment opened as
/// a container is skipped along with its close, and brackets still open at
/// the end are closed implicitly.
pub fn assemble(slots: impl IntoIterator<Item = Slot>) -> Node {
    let root = Node::fragment();
    // `None` marks an open bracket whose node was rejected.
    let mut open: Vec<Option<Node>> = Vec::new();

    for (index, slot) in slots.into_iter().enumerate() {
        let parent = match open.last() {
            Some(None) => None,
            Some(Some(node)) => Some(node.clone()),
            None => Some(root.clone()),
        };

        match slot {
            Slot::Close => {
                if open.pop().is_none() {
                    tracing::error!(error = %SlotError::UnmatchedClose { index }, "dropping slot");
                }
                continue;
            }
            Slot::Open(node) => {
                let kind = node.kind();
                if matches!(kind, NodeKind::Element) {
                    if let Some(parent) = &parent {
                        place(parent, &node, index);
                    }
                    open.push(Some(node));
                } else {
                    let error = SlotError::NotAContainer {
                        index,
                        kind: kind.as_str(),
                    };
                    tracing::error!(%error, "dropping slot");
                    open.push(None);
                }
                continue;
            }
            _ => {}
        }

        let Some(parent) = parent else {
            continue;
        };
        match slot {
            Slot::Text(source) => place(&parent, &bind_text(&*source), index),
            Slot::Static(text) => place(&parent, &Node::text(text), index),
            Slot::Node(node) => place(&parent, &node, index),
            Slot::Component(node) => {
                tracing::trace!(index, root = node.id().raw(), "component slot");
                place(&parent, &node, index)
            }
            Slot::Open(_) | Slot::Close => {}
        }
    }

    if !open.is_empty() {
        tracing::error!(error = %SlotError::Unclosed { count: open.len() }, "closing open brackets");
    }
    root
}

fn place(parent: &Node, node: &Node, index: usize) {
    if let Err(error) = parent.append_child(node) {
        tracing::error!(%error, index, "dropping slot");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(tag: &str) -> Slot {
        Slot::Open(Node::element(tag))
    }

    #[test]
    fn nests_open_and_close() {
        let name = Signal::new("world".to_string());
        let root = assemble([
            element("p"),
            "hello ".into(),
            element("b"),
            Slot::from(name.clone()),
            Slot::Close,
            Slot::Close,
            Slot::Component(Node::element("footer")),
        ]);

        let host = Node::element("div");
        host.append_child(&root).unwrap();
        assert_eq!(host.to_html(), "<div><p>hello <b>world</b></p><footer></footer></div>");

        name.set("there".to_string());
        assert_eq!(host.text_content(), "hello there");
    }

    #[test]
    fn unmatched_close_is_dropped() {
        let root = assemble([Slot::Close, "a".into(), element("i"), "b".into(), Slot::Close, Slot::Close]);
        assert_eq!(root.to_html(), "a<i>b</i>");
    }

    #[test]
    fn unclosed_open_is_closed() {
        let root = assemble([element("ul"), element("li"), "x".into()]);
        assert_eq!(root.to_html(), "<ul><li>x</li></ul>");
    }

    #[test]
    fn leaf_open_drops_its_contents() {
        let root = assemble([
            Slot::Open(Node::text("t")),
            "inside".into(),
            Slot::Close,
            "after".into(),
        ]);
        assert_eq!(root.to_html(), "after");
    }
}
