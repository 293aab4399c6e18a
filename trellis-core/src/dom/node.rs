//! DOM Nodes
//!
//! This module defines the node type that bindings and reconcilers mutate.
//!
//! Parents own their children; children point at their parent weakly. A
//! detached subtree with no outside handles is therefore dropped, which is
//! what [`WeakNode::is_alive`] observes.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use crate::error::DomError;

/// Unique identifier for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// The kind of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// An element with a tag name, attributes and children.
    Element,

    /// A text leaf.
    Text,

    /// A comment leaf. Reconcilers use comments as position markers.
    Comment,

    /// A parentless container. Inserting a fragment moves its children
    /// instead of the fragment itself.
    Fragment,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Element => "element",
            NodeKind::Text => "text",
            NodeKind::Comment => "comment",
            NodeKind::Fragment => "fragment",
        }
    }

    fn is_leaf(self) -> bool {
        matches!(self, NodeKind::Text | NodeKind::Comment)
    }
}

enum Content {
    Element {
        tag: String,
        attributes: IndexMap<String, String>,
    },
    Text(String),
    Comment(String),
    Fragment,
}

impl Content {
    fn kind(&self) -> NodeKind {
        match self {
            Content::Element { .. } => NodeKind::Element,
            Content::Text(_) => NodeKind::Text,
            Content::Comment(_) => NodeKind::Comment,
            Content::Fragment => NodeKind::Fragment,
        }
    }
}

struct NodeData {
    id: NodeId,
    content: RefCell<Content>,
    parent: RefCell<Weak<NodeData>>,
    children: RefCell<Vec<Node>>,
}

/// A handle to a node. Cloning shares the node.
#[derive(Clone)]
pub struct Node(Rc<NodeData>);

/// A non-owning handle to a node.
#[derive(Clone, Default)]
pub struct WeakNode(Weak<NodeData>);

impl Node {
    fn with_content(content: Content) -> Self {
        Self(Rc::new(NodeData {
            id: NodeId::new(),
            content: RefCell::new(content),
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
        }))
    }

    pub fn element(tag: impl Into<String>) -> Self {
        Self::with_content(Content::Element {
            tag: tag.into(),
            attributes: IndexMap::new(),
        })
    }

    pub fn text(data: impl Into<String>) -> Self {
        Self::with_content(Content::Text(data.into()))
    }

    pub fn comment(data: impl Into<String>) -> Self {
        Self::with_content(Content::Comment(data.into()))
    }

    pub fn fragment() -> Self {
        Self::with_content(Content::Fragment)
    }

    pub fn id(&self) -> NodeId {
        self.0.id
    }

    pub fn kind(&self) -> NodeKind {
        self.0.content.borrow().kind()
    }

    /// Whether both handles refer to the same node.
    pub fn ptr_eq(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn downgrade(&self) -> WeakNode {
        WeakNode(Rc::downgrade(&self.0))
    }

    /// Tag name of an element.
    pub fn tag(&self) -> Option<String> {
        match &*self.0.content.borrow() {
            Content::Element { tag, .. } => Some(tag.clone()),
            _ => None,
        }
    }

    /// Data of a text or comment node.
    pub fn text_data(&self) -> Option<String> {
        match &*self.0.content.borrow() {
            Content::Text(data) | Content::Comment(data) => Some(data.clone()),
            _ => None,
        }
    }

    /// Replace the data of a text or comment node. Other kinds are left
    /// untouched and `false` is returned.
    pub fn set_text(&self, data: impl Into<String>) -> bool {
        match &mut *self.0.content.borrow_mut() {
            Content::Text(current) | Content::Comment(current) => {
                *current = data.into();
                true
            }
            _ => false,
        }
    }

    /// Concatenated text of this node and its descendants. Comments do not
    /// contribute.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match &*self.0.content.borrow() {
            Content::Text(data) => out.push_str(data),
            Content::Comment(_) => {}
            Content::Element { .. } | Content::Fragment => {
                for child in self.0.children.borrow().iter() {
                    child.collect_text(out);
                }
            }
        }
    }

    pub fn set_attribute(&self, name: impl Into<String>, value: impl Into<String>) -> bool {
        match &mut *self.0.content.borrow_mut() {
            Content::Element { attributes, .. } => {
                attributes.insert(name.into(), value.into());
                true
            }
            _ => false,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        match &*self.0.content.borrow() {
            Content::Element { attributes, .. } => attributes.get(name).cloned(),
            _ => None,
        }
    }

    pub fn parent(&self) -> Option<Node> {
        self.0.parent.borrow().upgrade().map(Node)
    }

    pub fn children(&self) -> Vec<Node> {
        self.0.children.borrow().clone()
    }

    pub fn child_count(&self) -> usize {
        self.0.children.borrow().len()
    }

    pub fn first_child(&self) -> Option<Node> {
        self.0.children.borrow().first().cloned()
    }

    pub fn last_child(&self) -> Option<Node> {
        self.0.children.borrow().last().cloned()
    }

    pub fn next_sibling(&self) -> Option<Node> {
        let parent = self.parent()?;
        let siblings = parent.0.children.borrow();
        let index = siblings.iter().position(|child| child.ptr_eq(self))?;
        siblings.get(index + 1).cloned()
    }

    pub fn previous_sibling(&self) -> Option<Node> {
        let parent = self.parent()?;
        let siblings = parent.0.children.borrow();
        let index = siblings.iter().position(|child| child.ptr_eq(self))?;
        index.checked_sub(1).and_then(|i| siblings.get(i).cloned())
    }

    /// Whether `other` is this node or one of its descendants.
    pub fn contains(&self, other: &Node) -> bool {
        let mut cursor = Some(other.clone());
        while let Some(node) = cursor {
            if node.ptr_eq(self) {
                return true;
            }
            cursor = node.parent();
        }
        false
    }

    /// Append `child`, moving it from its current parent. A fragment moves
    /// its children instead.
    pub fn append_child(&self, child: &Node) -> Result<(), DomError> {
        self.insert_before(child, None)
    }

    /// Insert `child` before `reference` (or at the end when `None`),
    /// moving it from its current parent. A fragment moves its children
    /// instead.
    pub fn insert_before(&self, child: &Node, reference: Option<&Node>) -> Result<(), DomError> {
        let kind = self.kind();
        if kind.is_leaf() {
            return Err(DomError::Leaf(kind.as_str()));
        }
        if child.contains(self) {
            return Err(DomError::Hierarchy);
        }
        if let Some(reference) = reference {
            if reference.ptr_eq(child) {
                return Ok(());
            }
            if !reference.parent().is_some_and(|parent| parent.ptr_eq(self)) {
                return Err(DomError::NotAChild);
            }
        }

        let moving = if child.kind() == NodeKind::Fragment {
            std::mem::take(&mut *child.0.children.borrow_mut())
        } else {
            child.remove();
            vec![child.clone()]
        };

        for node in &moving {
            *node.0.parent.borrow_mut() = Rc::downgrade(&self.0);
        }

        let mut children = self.0.children.borrow_mut();
        let index = reference
            .and_then(|reference| children.iter().position(|c| c.ptr_eq(reference)))
            .unwrap_or(children.len());
        children.splice(index..index, moving);
        Ok(())
    }

    /// Detach this node from its parent. Does nothing when parentless.
    pub fn remove(&self) {
        let Some(parent) = self.parent() else {
            return;
        };
        parent.0.children.borrow_mut().retain(|child| !child.ptr_eq(self));
        *self.0.parent.borrow_mut() = Weak::new();
    }

    /// Serialize the subtree as markup. Fragments serialize their children.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        match &*self.0.content.borrow() {
            Content::Text(data) => escape_into(data, out),
            Content::Comment(data) => {
                out.push_str("<!--");
                out.push_str(data);
                out.push_str("-->");
            }
            Content::Fragment => {
                for child in self.0.children.borrow().iter() {
                    child.write_html(out);
                }
            }
            Content::Element { tag, attributes } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attributes {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    escape_into(value, out);
                    out.push('"');
                }
                out.push('>');
                for child in self.0.children.borrow().iter() {
                    child.write_html(out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

fn escape_into(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Node {}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.0.id.raw())
            .field("kind", &self.kind())
            .field("html", &self.to_html())
            .finish()
    }
}

impl WeakNode {
    pub fn upgrade(&self) -> Option<Node> {
        self.0.upgrade().map(Node)
    }

    /// Whether the node still exists.
    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl fmt::Debug for WeakNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WeakNode").field(&self.is_alive()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> Node {
        let ul = Node::element("ul");
        for item in items {
            let li = Node::element("li");
            li.append_child(&Node::text(*item)).unwrap();
            ul.append_child(&li).unwrap();
        }
        ul
    }

    #[test]
    fn node_ids_are_unique() {
        let id1 = NodeId::new();
        let id2 = NodeId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn append_and_serialize() {
        let ul = list(&["a", "b"]);
        ul.set_attribute("class", "items");
        assert_eq!(ul.to_html(), r#"<ul class="items"><li>a</li><li>b</li></ul>"#);
        assert_eq!(ul.text_content(), "ab");
    }

    #[test]
    fn insert_before_moves_existing_child() {
        let ul = list(&["a", "b", "c"]);
        let children = ul.children();

        ul.insert_before(&children[2], Some(&children[0])).unwrap();
        assert_eq!(ul.text_content(), "cab");
        assert!(children[2].parent().unwrap().ptr_eq(&ul));
    }

    #[test]
    fn insert_before_reparents_across_trees() {
        let from = list(&["a"]);
        let to = list(&["b"]);
        let moved = from.first_child().unwrap();

        to.insert_before(&moved, to.first_child().as_ref()).unwrap();
        assert_eq!(from.child_count(), 0);
        assert_eq!(to.text_content(), "ab");
    }

    #[test]
    fn fragments_move_their_children() {
        let fragment = Node::fragment();
        fragment.append_child(&Node::text("x")).unwrap();
        fragment.append_child(&Node::text("y")).unwrap();

        let div = Node::element("div");
        div.append_child(&fragment).unwrap();
        assert_eq!(fragment.child_count(), 0);
        assert_eq!(div.to_html(), "<div>xy</div>");
    }

    #[test]
    fn rejects_invalid_insertions() {
        let ul = list(&["a"]);
        let li = ul.first_child().unwrap();
        let stranger = Node::element("li");

        assert_eq!(li.append_child(&ul), Err(DomError::Hierarchy));
        assert_eq!(
            ul.insert_before(&Node::text("z"), Some(&stranger)),
            Err(DomError::NotAChild)
        );
        assert_eq!(
            Node::text("leaf").append_child(&stranger),
            Err(DomError::Leaf("text"))
        );
    }

    #[test]
    fn siblings_and_remove() {
        let ul = list(&["a", "b", "c"]);
        let b = ul.children()[1].clone();

        assert_eq!(b.previous_sibling().unwrap().text_content(), "a");
        assert_eq!(b.next_sibling().unwrap().text_content(), "c");

        b.remove();
        assert!(b.parent().is_none());
        assert_eq!(ul.text_content(), "ac");
        b.remove();
    }

    #[test]
    fn detached_nodes_are_dropped() {
        let ul = list(&["a"]);
        let weak = ul.first_child().unwrap().downgrade();
        assert!(weak.is_alive());

        ul.first_child().unwrap().remove();
        assert!(!weak.is_alive());
    }

    #[test]
    fn escapes_text() {
        let p = Node::element("p");
        p.append_child(&Node::text("<a & b>")).unwrap();
        p.append_child(&Node::comment("note")).unwrap();
        assert_eq!(p.to_html(), "<p>&lt;a &amp; b&gt;<!--note--></p>");
        assert_eq!(p.text_content(), "<a & b>");
    }
}
