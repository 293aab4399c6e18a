//! The keyed reconciler core.
//!
//! # Algorithm
//!
//! Records live in two generation buffers. A pass walks the new sequence,
//! moving each record from `current` into `next`. Records whose previous
//! position still increases relative to the last stable record stay where
//! they are; everything else (new records included) goes on a move stack
//! that is flushed in front of the next stable record's first node, or in
//! front of the trailing anchor once the sequence ends. Whatever is left in
//! `current` afterwards was removed. The buffers are then swapped so the
//! next pass reuses the old allocation.
//!
//! This is a greedy single-pass heuristic. It always produces the target
//! order but is not move-minimal for arbitrary permutations.

use std::cell::RefCell;
use std::fmt::{self, Debug};
use std::hash::Hash;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::dom::{Node, NodeKind};
use crate::error::ReconcileError;
use crate::reactive::{Observable, Runtime, SubscriberId};

/// Builds the DOM nodes and bound state of a new item.
pub type Template<K, V, I> = Rc<dyn Fn(&K, &V) -> ItemView<I>>;

/// Builds the region root around the trailing anchor.
pub type Wrapper = Rc<dyn Fn(&Node) -> Node>;

/// Called with the region, the item's nodes, its state, key and value when
/// an item is created or removed.
pub type ItemHook<K, V, I> = Rc<dyn Fn(&Region, &[Node], &I, &K, &V)>;

/// Called with the item's state, key and value on every pass.
pub type UpdateHook<K, V, I> = Rc<dyn Fn(&I, &K, &V)>;

/// What an item template produces.
///
/// A fragment stands for its children: the reconciler tracks and moves the
/// nodes inside it, since the fragment itself is emptied on insertion.
pub struct ItemView<I> {
    pub nodes: Vec<Node>,
    pub state: I,
}

impl<I> ItemView<I> {
    pub fn new(node: Node, state: I) -> Self {
        Self::many(vec![node], state)
    }

    pub fn many(nodes: Vec<Node>, state: I) -> Self {
        Self {
            nodes: flatten(nodes),
            state,
        }
    }
}

/// Replace fragments by their children.
fn flatten(nodes: Vec<Node>) -> Vec<Node> {
    if nodes.iter().all(|node| node.kind() != NodeKind::Fragment) {
        return nodes;
    }
    let mut flat = Vec::with_capacity(nodes.len());
    for node in nodes {
        if node.kind() == NodeKind::Fragment {
            flat.extend(flatten(node.children()));
        } else {
            flat.push(node);
        }
    }
    flat
}

impl From<Node> for ItemView<()> {
    fn from(node: Node) -> Self {
        Self::new(node, ())
    }
}

/// The part of the document a reconciler manages.
///
/// Items are kept in front of the anchor comment, inside whatever parent
/// the anchor currently has. The root is what gets inserted into the
/// surrounding markup; when it is a fragment, inserting it moves the anchor
/// and the items out of it.
#[derive(Clone, Debug)]
pub struct Region {
    root: Node,
    anchor: Node,
}

impl Region {
    pub(crate) fn new(wrapper: Option<&Wrapper>) -> Self {
        let anchor = Node::comment("keyed");
        let root = match wrapper {
            Some(wrapper) => wrapper(&anchor),
            None => Node::fragment(),
        };
        if !root.contains(&anchor) {
            if let Err(error) = root.append_child(&anchor) {
                tracing::error!(%error, "could not place reconciler anchor in its wrapper");
            }
        }
        Self { root, anchor }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn anchor(&self) -> &Node {
        &self.anchor
    }

    /// The node items are inserted into.
    pub fn parent(&self) -> Option<Node> {
        self.anchor.parent()
    }
}

/// Counts from a single pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    pub created: usize,
    pub moved: usize,
    pub removed: usize,
}

pub(crate) struct Hooks<K, V, I> {
    pub(crate) template: Template<K, V, I>,
    pub(crate) on_append: Option<ItemHook<K, V, I>>,
    pub(crate) on_update: Option<UpdateHook<K, V, I>>,
    pub(crate) on_remove: Option<ItemHook<K, V, I>>,
}

struct Record<V, I> {
    value: V,
    state: I,
    nodes: Vec<Node>,
    position: usize,
}

struct Store<K, V, I> {
    current: IndexMap<K, Record<V, I>>,
    next: IndexMap<K, Record<V, I>>,
    stack: SmallVec<[Node; 8]>,
}

struct KeyedInner<K, V, I> {
    region: Region,
    hooks: Hooks<K, V, I>,
    store: RefCell<Store<K, V, I>>,
}

/// A reconciler keeping one DOM region in step with a keyed sequence.
///
/// Handles are cheap to clone and share the same store. The store is
/// borrowed for the whole of a pass, so reads made from inside a callback
/// see an empty reconciler and a nested [`assign`](Self::assign) fails with
/// [`ReconcileError::Busy`].
pub struct Keyed<K, V, I> {
    inner: Rc<KeyedInner<K, V, I>>,
}

impl<K, V, I> Keyed<K, V, I>
where
    K: Hash + Eq + Clone + Debug + 'static,
    V: Clone + 'static,
    I: 'static,
{
    pub(crate) fn new(hooks: Hooks<K, V, I>, wrapper: Option<&Wrapper>) -> Self {
        Self {
            inner: Rc::new(KeyedInner {
                region: Region::new(wrapper),
                hooks,
                store: RefCell::new(Store {
                    current: IndexMap::new(),
                    next: IndexMap::new(),
                    stack: SmallVec::new(),
                }),
            }),
        }
    }

    pub fn region(&self) -> &Region {
        &self.inner.region
    }

    /// The node to insert into the surrounding markup.
    pub fn root(&self) -> &Node {
        self.inner.region.root()
    }

    /// Reconcile the region against `items`, in order.
    ///
    /// Duplicate keys are skipped with a warning; the first occurrence wins.
    pub fn assign(
        &self,
        items: impl IntoIterator<Item = (K, V)>,
    ) -> Result<PassStats, ReconcileError> {
        let inner = &*self.inner;
        let mut store = inner.store.try_borrow_mut().map_err(|_| {
            tracing::error!("reconciler re-entered while a pass was running");
            ReconcileError::Busy
        })?;
        let Store {
            current,
            next,
            stack,
        } = &mut *store;

        let region = &inner.region;
        let hooks = &inner.hooks;
        let parent = region.parent();
        let warn_duplicates = Runtime::warn_on_duplicate_keys();

        let mut stats = PassStats::default();
        let mut previous: Option<usize> = None;

        for (key, value) in items {
            if next.contains_key(&key) {
                if warn_duplicates {
                    tracing::warn!(key = ?key, "keys must be unique, ignoring duplicate");
                }
                continue;
            }
            let position = next.len();

            let (mut record, created) = match current.swap_remove(&key) {
                Some(record) => (record, false),
                None => {
                    let ItemView { nodes, state } = (hooks.template)(&key, &value);
                    let nodes = flatten(nodes);
                    if let Some(on_append) = &hooks.on_append {
                        on_append(region, &nodes, &state, &key, &value);
                    }
                    stats.created += 1;
                    let record = Record {
                        value: value.clone(),
                        state,
                        nodes,
                        position,
                    };
                    (record, true)
                }
            };

            if let Some(on_update) = &hooks.on_update {
                on_update(&record.state, &key, &value);
            }
            record.value = value;

            let in_order = !created && previous.map_or(true, |p| record.position > p);
            if in_order {
                previous = Some(record.position);
                if let Some(first) = record.nodes.first() {
                    flush(parent.as_ref(), stack, first);
                }
            } else {
                if !created {
                    stats.moved += 1;
                }
                stack.extend(record.nodes.iter().cloned());
            }

            record.position = position;
            next.insert(key, record);
        }

        flush(parent.as_ref(), stack, region.anchor());

        // Leftovers go in their previous sequence order.
        current.sort_unstable_by(|_, a, _, b| a.position.cmp(&b.position));
        for (key, record) in current.drain(..) {
            stats.removed += 1;
            match &hooks.on_remove {
                Some(on_remove) => {
                    on_remove(region, &record.nodes, &record.state, &key, &record.value)
                }
                None => {
                    for node in &record.nodes {
                        node.remove();
                    }
                }
            }
        }

        std::mem::swap(current, next);

        tracing::debug!(
            created = stats.created,
            moved = stats.moved,
            removed = stats.removed,
            len = current.len(),
            "reconciled"
        );
        Ok(stats)
    }

    /// Keep the region in step with `source`, a signal or computed value.
    /// The subscription lasts as long as a handle to this reconciler does.
    pub fn bind<S, It>(
        &self,
        source: &S,
        project: impl Fn(&S::Value) -> It + 'static,
    ) -> SubscriberId
    where
        S: Observable,
        It: IntoIterator<Item = (K, V)>,
    {
        let target = Rc::downgrade(&self.inner);
        let alive = target.clone();
        source.observe_while(
            move |value| {
                if let Some(inner) = target.upgrade() {
                    let keyed = Keyed { inner };
                    if let Err(error) = keyed.assign(project(value)) {
                        tracing::error!(%error, "bound reconciliation failed");
                    }
                }
            },
            move || Weak::strong_count(&alive) > 0,
        )
    }

    fn read<R>(&self, default: R, f: impl FnOnce(&IndexMap<K, Record<V, I>>) -> R) -> R {
        match self.inner.store.try_borrow() {
            Ok(store) => f(&store.current),
            Err(_) => {
                tracing::error!("reconciler read while a pass was running");
                default
            }
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.read(None, |current| current.get(key).map(|r| r.value.clone()))
    }

    pub fn has(&self, key: &K) -> bool {
        self.read(false, |current| current.contains_key(key))
    }

    pub fn len(&self) -> usize {
        self.read(0, IndexMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys in sequence order.
    pub fn keys(&self) -> Vec<K> {
        self.read(Vec::new(), |current| current.keys().cloned().collect())
    }

    /// Key/value pairs in sequence order.
    pub fn entries(&self) -> Vec<(K, V)> {
        self.read(Vec::new(), |current| {
            current
                .iter()
                .map(|(k, r)| (k.clone(), r.value.clone()))
                .collect()
        })
    }

    /// Visit every item in sequence order.
    pub fn for_each(&self, mut f: impl FnMut(&K, &V, &I)) {
        self.read((), |current| {
            for (key, record) in current {
                f(key, &record.value, &record.state);
            }
        })
    }

    /// DOM nodes of the item under `key`.
    pub fn nodes(&self, key: &K) -> Option<Vec<Node>> {
        self.read(None, |current| current.get(key).map(|r| r.nodes.clone()))
    }
}

impl<K, V, I> Keyed<K, V, I>
where
    K: Hash + Eq + Clone + Debug + 'static,
    V: Clone + 'static,
    I: Clone + 'static,
{
    /// Clone of the bound state of the item under `key`.
    pub fn state(&self, key: &K) -> Option<I> {
        self.read(None, |current| current.get(key).map(|r| r.state.clone()))
    }
}

fn flush(parent: Option<&Node>, stack: &mut SmallVec<[Node; 8]>, reference: &Node) {
    if stack.is_empty() {
        return;
    }
    let Some(parent) = parent else {
        tracing::error!("reconciler anchor is detached, dropping pending moves");
        stack.clear();
        return;
    };
    for node in stack.drain(..) {
        if let Err(error) = parent.insert_before(&node, Some(reference)) {
            tracing::error!(%error, "could not move item node");
        }
    }
}

impl<K, V, I> Clone for Keyed<K, V, I> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<K: Debug, V, I> Debug for Keyed<K, V, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Keyed");
        s.field("region", &self.inner.region);
        match self.inner.store.try_borrow() {
            Ok(store) => s.field("keys", &store.current.keys().collect::<Vec<_>>()),
            Err(_) => s.field("keys", &"<busy>"),
        };
        s.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn label(key: &u32, value: &&'static str) -> ItemView<Node> {
        let li = Node::element("li");
        let text = Node::text(format!("{key}:{value}"));
        li.append_child(&text).unwrap();
        ItemView::new(li, text)
    }

    fn reconciler() -> (Keyed<u32, &'static str, Node>, Node) {
        let hooks = Hooks {
            template: Rc::new(label),
            on_append: None,
            on_update: Some(Rc::new(|text: &Node, key: &u32, value: &&'static str| {
                text.set_text(format!("{key}:{value}"));
            })),
            on_remove: None,
        };
        let keyed = Keyed::new(hooks, None);
        let ul = Node::element("ul");
        ul.append_child(keyed.root()).unwrap();
        (keyed, ul)
    }

    #[test]
    fn first_pass_creates_in_order() {
        let (keyed, ul) = reconciler();
        let stats = keyed.assign([(1, "a"), (2, "b"), (3, "c")]).unwrap();

        assert_eq!(stats, PassStats { created: 3, moved: 0, removed: 0 });
        assert_eq!(
            ul.to_html(),
            "<ul><li>1:a</li><li>2:b</li><li>3:c</li><!--keyed--></ul>"
        );
    }

    #[test]
    fn swap_reuses_records() {
        let (keyed, ul) = reconciler();
        keyed.assign([(1, "a"), (2, "b")]).unwrap();
        let first = keyed.nodes(&1).unwrap();

        let stats = keyed.assign([(2, "b2"), (1, "a")]).unwrap();
        assert_eq!(stats.created, 0);
        assert_eq!(stats.moved, 1);
        assert_eq!(ul.text_content(), "2:b21:a");
        assert!(keyed.nodes(&1).unwrap()[0].ptr_eq(&first[0]));
    }

    #[test]
    fn prepend_and_append_move_nothing() {
        let (keyed, ul) = reconciler();
        keyed.assign([(2, "b"), (3, "c")]).unwrap();

        let stats = keyed.assign([(1, "a"), (2, "b"), (3, "c"), (4, "d")]).unwrap();
        assert_eq!(stats, PassStats { created: 2, moved: 0, removed: 0 });
        assert_eq!(ul.text_content(), "1:a2:b3:c4:d");
    }

    #[test]
    fn reverse_produces_target_order() {
        let (keyed, ul) = reconciler();
        keyed.assign([(1, "a"), (2, "b"), (3, "c"), (4, "d")]).unwrap();

        let stats = keyed.assign([(4, "d"), (3, "c"), (2, "b"), (1, "a")]).unwrap();
        assert_eq!(stats.created, 0);
        assert_eq!(stats.moved, 3);
        assert_eq!(ul.text_content(), "4:d3:c2:b1:a");
    }

    #[test]
    fn missing_keys_are_detached() {
        let (keyed, ul) = reconciler();
        keyed.assign([(1, "a")]).unwrap();
        let old = keyed.nodes(&1).unwrap();

        let stats = keyed.assign([(2, "b")]).unwrap();
        assert_eq!(stats, PassStats { created: 1, moved: 0, removed: 1 });
        assert!(old[0].parent().is_none());
        assert_eq!(ul.text_content(), "2:b");
        assert!(!keyed.has(&1));
    }

    #[test]
    fn duplicate_keys_keep_first() {
        let (keyed, _ul) = reconciler();
        keyed.assign([(1, "a"), (1, "b")]).unwrap();

        assert_eq!(keyed.len(), 1);
        assert_eq!(keyed.get(&1), Some("a"));
    }

    #[test]
    fn update_hook_runs_for_every_item() {
        let (keyed, ul) = reconciler();
        keyed.assign([(1, "a"), (2, "b")]).unwrap();
        keyed.assign([(1, "x"), (2, "y")]).unwrap();
        assert_eq!(ul.text_content(), "1:x2:y");
        assert_eq!(keyed.entries(), vec![(1, "x"), (2, "y")]);
    }

    #[test]
    fn fragment_items_track_their_children() {
        let hooks = Hooks {
            template: Rc::new(|key: &u32, _: &()| {
                let fragment = Node::fragment();
                fragment.append_child(&Node::element("dt")).unwrap();
                fragment.append_child(&Node::text(key.to_string())).unwrap();
                ItemView::from(fragment)
            }),
            on_append: None,
            on_update: None,
            on_remove: None,
        };
        let keyed = Keyed::new(hooks, None);
        let dl = Node::element("dl");
        dl.append_child(keyed.root()).unwrap();

        keyed.assign([(1, ()), (2, ())]).unwrap();
        assert_eq!(keyed.nodes(&1).unwrap().len(), 2);

        keyed.assign([(2, ()), (1, ())]).unwrap();
        assert_eq!(dl.to_html(), "<dl><dt></dt>2<dt></dt>1<!--keyed--></dl>");

        keyed.assign([(1, ())]).unwrap();
        assert_eq!(dl.to_html(), "<dl><dt></dt>1<!--keyed--></dl>");
    }

    #[test]
    fn removals_follow_previous_order() {
        let removed = Rc::new(RefCell::new(Vec::new()));
        let log = removed.clone();
        let hooks = Hooks {
            template: Rc::new(|key: &u32, _: &()| ItemView::from(Node::text(key.to_string()))),
            on_append: None,
            on_update: None,
            on_remove: Some(Rc::new(move |_: &Region, nodes: &[Node], _: &(), key: &u32, _: &()| {
                log.borrow_mut().push(*key);
                nodes[0].remove();
            })),
        };
        let keyed = Keyed::new(hooks, None);

        keyed.assign((1..=5).map(|key| (key, ()))).unwrap();
        keyed.assign([(3, ())]).unwrap();
        assert_eq!(*removed.borrow(), vec![1, 2, 4, 5]);
    }

    #[test]
    fn reentrant_assign_is_refused() {
        let slot: Rc<RefCell<Option<Keyed<u32, u32, ()>>>> = Rc::new(RefCell::new(None));
        let failures = Rc::new(Cell::new(0));

        let (inner_slot, counter) = (slot.clone(), failures.clone());
        let hooks = Hooks {
            template: Rc::new(|_: &u32, _: &u32| ItemView::many(Vec::new(), ())),
            on_append: None,
            on_update: Some(Rc::new(move |_: &(), _: &u32, _: &u32| {
                if let Some(keyed) = inner_slot.borrow().as_ref() {
                    if keyed.assign([(9, 9)]) == Err(ReconcileError::Busy) {
                        counter.set(counter.get() + 1);
                    }
                    assert_eq!(keyed.len(), 0);
                }
            })),
            on_remove: None,
        };
        let keyed = Keyed::new(hooks, None);
        *slot.borrow_mut() = Some(keyed.clone());

        keyed.assign([(1, 1)]).unwrap();
        assert_eq!(failures.get(), 1);
        assert_eq!(keyed.keys(), vec![1]);
    }
}
