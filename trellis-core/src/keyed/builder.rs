use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;
use std::rc::Rc;

use super::reconciler::{Hooks, ItemHook, ItemView, Keyed, Region, Template, UpdateHook, Wrapper};
use super::variants::{KeyedList, KeyedMap, KeyedSet};
use crate::dom::Node;

/// Configures a reconciler before it is built.
///
/// `O` is the handle type [`build`](Self::build) returns.
pub struct KeyedBuilder<K, V, I, O> {
    template: Template<K, V, I>,
    wrapper: Option<Wrapper>,
    on_append: Option<ItemHook<K, V, I>>,
    on_update: Option<UpdateHook<K, V, I>>,
    on_remove: Option<ItemHook<K, V, I>>,
    _output: PhantomData<fn() -> O>,
}

impl<K, V, I, O> KeyedBuilder<K, V, I, O>
where
    K: Hash + Eq + Clone + Debug + 'static,
    V: Clone + 'static,
    I: 'static,
    O: From<Keyed<K, V, I>>,
{
    fn new(template: Template<K, V, I>) -> Self {
        Self {
            template,
            wrapper: None,
            on_append: None,
            on_update: None,
            on_remove: None,
            _output: PhantomData,
        }
    }

    /// Build the region root around the trailing anchor. The returned node
    /// should contain the anchor; if it does not, the anchor is appended.
    pub fn wrapper(mut self, wrapper: impl Fn(&Node) -> Node + 'static) -> Self {
        self.wrapper = Some(Rc::new(wrapper));
        self
    }

    /// Called once for every created item, before its nodes are placed.
    pub fn on_append(mut self, hook: impl Fn(&Region, &[Node], &I, &K, &V) + 'static) -> Self {
        self.on_append = Some(Rc::new(hook));
        self
    }

    /// Called for every item on every pass, new or reused.
    pub fn on_update(mut self, hook: impl Fn(&I, &K, &V) + 'static) -> Self {
        self.on_update = Some(Rc::new(hook));
        self
    }

    /// Called for every removed item. The hook owns disposal of the item's
    /// nodes; without one they are detached directly.
    pub fn on_remove(mut self, hook: impl Fn(&Region, &[Node], &I, &K, &V) + 'static) -> Self {
        self.on_remove = Some(Rc::new(hook));
        self
    }

    pub fn build(self) -> O {
        let hooks = Hooks {
            template: self.template,
            on_append: self.on_append,
            on_update: self.on_update,
            on_remove: self.on_remove,
        };
        O::from(Keyed::new(hooks, self.wrapper.as_ref()))
    }
}

/// Reconcile by explicit key. The template receives each key and value.
pub fn reconcile_by_key<K, V, I>(
    template: impl Fn(&K, &V) -> ItemView<I> + 'static,
) -> KeyedBuilder<K, V, I, KeyedMap<K, V, I>>
where
    K: Hash + Eq + Clone + Debug + 'static,
    V: Clone + 'static,
    I: 'static,
{
    KeyedBuilder::new(Rc::new(template))
}

/// Reconcile a set of values, each value being its own key.
pub fn reconcile_by_set<V, I>(
    template: impl Fn(&V) -> ItemView<I> + 'static,
) -> KeyedBuilder<V, (), I, KeyedSet<V, I>>
where
    V: Hash + Eq + Clone + Debug + 'static,
    I: 'static,
{
    KeyedBuilder::new(Rc::new(move |value: &V, _: &()| template(value)))
}

/// Reconcile a list by position. Inserting or removing shifts the identity
/// of every later item.
pub fn reconcile_by_index<V, I>(
    template: impl Fn(usize, &V) -> ItemView<I> + 'static,
) -> KeyedBuilder<usize, V, I, KeyedList<V, I>>
where
    V: Clone + 'static,
    I: 'static,
{
    KeyedBuilder::new(Rc::new(move |index: &usize, value: &V| template(*index, value)))
}
