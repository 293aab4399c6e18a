use std::fmt::Display;

use crate::dom::Node;
use crate::reactive::{Computed, Signal, SubscriberId};

/// A reactive value that can be rendered into a text node.
pub trait TextSource {
    /// Keep `node`'s text current. The subscription ends once the node has
    /// been dropped.
    fn attach(&self, node: &Node) -> SubscriberId;
}

impl<T: Clone + Display + 'static> TextSource for Signal<T> {
    fn attach(&self, node: &Node) -> SubscriberId {
        let formatter = self.formatter();
        attach_with(self, node, move |value| match &formatter {
            Some(formatter) => formatter(value),
            None => value.to_string(),
        })
    }
}

impl<T: Clone + Display + 'static> TextSource for Computed<T> {
    fn attach(&self, node: &Node) -> SubscriberId {
        self.signal().attach(node)
    }
}

fn attach_with<T: Clone + 'static>(
    signal: &Signal<T>,
    node: &Node,
    format: impl Fn(&T) -> String + 'static,
) -> SubscriberId {
    let target = node.downgrade();
    let alive = target.clone();
    signal.on_while(
        move |value| {
            if let Some(node) = target.upgrade() {
                node.set_text(format(value));
            }
        },
        move || alive.is_alive(),
    )
}

/// Create a text node that follows `source`.
pub fn bind_text<S: TextSource + ?Sized>(source: &S) -> Node {
    let node = Node::text("");
    source.attach(&node);
    node
}

/// Create a text node that follows `signal`, rendered with `formatter`.
pub fn bind_text_with<T: Clone + 'static>(
    signal: &Signal<T>,
    formatter: impl Fn(&T) -> String + 'static,
) -> Node {
    let node = Node::text("");
    attach_with(signal, &node, formatter);
    node
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_follows_signal() {
        let count = Signal::new(1);
        let node = bind_text(&count);
        assert_eq!(node.text_data().as_deref(), Some("1"));

        count.set(2);
        assert_eq!(node.text_data().as_deref(), Some("2"));
    }

    #[test]
    fn signal_formatter_is_used() {
        let price = Signal::new(5).with_formatter(|cents| format!("${cents}"));
        let node = bind_text(&price);
        assert_eq!(node.text_data().as_deref(), Some("$5"));
    }

    #[test]
    fn explicit_formatter_wins() {
        let price = Signal::new(5).with_formatter(|cents| format!("${cents}"));
        let node = bind_text_with(&price, |cents| format!("{cents}c"));
        assert_eq!(node.text_data().as_deref(), Some("5c"));
    }

    #[test]
    fn dropped_node_unsubscribes() {
        let count = Signal::new(0);
        let node = bind_text(&count);
        assert_eq!(count.subscriber_count(), 1);

        drop(node);
        count.set(1);
        assert_eq!(count.subscriber_count(), 0);
    }

    #[test]
    fn computed_sources_bind() {
        let base = Signal::new(2);
        let squared = Computed::from_signal(&base, |v| v * v);
        let node = bind_text(&squared);

        base.set(3);
        assert_eq!(node.text_data().as_deref(), Some("9"));
    }
}
