//! Map, set and list front-ends over [`Keyed`].
//!
//! Incremental operations rebuild the sequence and run a full pass, so they
//! share the ordering algorithm with [`Keyed::assign`].

use std::fmt::{self, Debug};
use std::hash::Hash;
use std::ops::Deref;

use super::reconciler::{Keyed, PassStats};
use crate::error::ReconcileError;
use crate::reactive::{Observable, SubscriberId};

/// A reconciler keyed by an explicit key.
pub struct KeyedMap<K, V, I>(Keyed<K, V, I>);

impl<K, V, I> KeyedMap<K, V, I>
where
    K: Hash + Eq + Clone + Debug + 'static,
    V: Clone + 'static,
    I: 'static,
{
    /// Replace the value under `key`, or append it when the key is new.
    pub fn set(&self, key: K, value: V) -> Result<PassStats, ReconcileError> {
        let mut entries = self.0.entries();
        match entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => entries.push((key, value)),
        }
        self.0.assign(entries)
    }

    /// Remove `key`, returning its value.
    pub fn remove(&self, key: &K) -> Result<Option<V>, ReconcileError> {
        let mut entries = self.0.entries();
        let Some(index) = entries.iter().position(|(k, _)| k == key) else {
            return Ok(None);
        };
        let (_, value) = entries.remove(index);
        self.0.assign(entries)?;
        Ok(Some(value))
    }

    pub fn clear(&self) -> Result<PassStats, ReconcileError> {
        self.0.assign(std::iter::empty())
    }
}

/// A reconciler over a set of values.
pub struct KeyedSet<V, I>(Keyed<V, (), I>);

impl<V, I> KeyedSet<V, I>
where
    V: Hash + Eq + Clone + Debug + 'static,
    I: 'static,
{
    /// Reconcile against `values`. Repeated values are skipped.
    pub fn assign_values(
        &self,
        values: impl IntoIterator<Item = V>,
    ) -> Result<PassStats, ReconcileError> {
        self.0.assign(values.into_iter().map(|value| (value, ())))
    }

    /// Add `value` at the end. Returns `false` if it was already present.
    pub fn add(&self, value: V) -> Result<bool, ReconcileError> {
        if self.0.has(&value) {
            return Ok(false);
        }
        let mut values = self.0.keys();
        values.push(value);
        self.assign_values(values)?;
        Ok(true)
    }

    /// Remove `value`. Returns `false` if it was not present.
    pub fn remove(&self, value: &V) -> Result<bool, ReconcileError> {
        if !self.0.has(value) {
            return Ok(false);
        }
        let values = self.0.keys().into_iter().filter(|v| v != value);
        self.assign_values(values)?;
        Ok(true)
    }

    /// Keep the region in step with `source`, a signal or computed value.
    pub fn bind_values<S, It>(
        &self,
        source: &S,
        project: impl Fn(&S::Value) -> It + 'static,
    ) -> SubscriberId
    where
        S: Observable,
        It: IntoIterator<Item = V>,
    {
        self.0
            .bind(source, move |s| project(s).into_iter().map(|value| (value, ())))
    }
}

/// A reconciler over a list, keyed by position.
pub struct KeyedList<V, I>(Keyed<usize, V, I>);

impl<V, I> KeyedList<V, I>
where
    V: Clone + 'static,
    I: 'static,
{
    /// Reconcile against `values`, keyed by their index.
    pub fn assign_values(
        &self,
        values: impl IntoIterator<Item = V>,
    ) -> Result<PassStats, ReconcileError> {
        self.0.assign(values.into_iter().enumerate())
    }

    fn values(&self) -> Vec<V> {
        self.0.entries().into_iter().map(|(_, value)| value).collect()
    }

    pub fn push(&self, value: V) -> Result<PassStats, ReconcileError> {
        let mut values = self.values();
        values.push(value);
        self.assign_values(values)
    }

    /// Insert at `index`, clamped to the list length.
    pub fn insert(&self, index: usize, value: V) -> Result<PassStats, ReconcileError> {
        let mut values = self.values();
        let index = index.min(values.len());
        values.insert(index, value);
        self.assign_values(values)
    }

    /// Remove the value at `index`.
    pub fn remove(&self, index: usize) -> Result<Option<V>, ReconcileError> {
        let mut values = self.values();
        if index >= values.len() {
            return Ok(None);
        }
        let removed = values.remove(index);
        self.assign_values(values)?;
        Ok(Some(removed))
    }

    /// Replace the value at `index`. Out of range indices are ignored.
    pub fn set(&self, index: usize, value: V) -> Result<PassStats, ReconcileError> {
        let mut values = self.values();
        match values.get_mut(index) {
            Some(slot) => *slot = value,
            None => return Ok(PassStats::default()),
        }
        self.assign_values(values)
    }

    /// Keep the region in step with `source`, a signal or computed value.
    pub fn bind_values<S, It>(
        &self,
        source: &S,
        project: impl Fn(&S::Value) -> It + 'static,
    ) -> SubscriberId
    where
        S: Observable,
        It: IntoIterator<Item = V>,
    {
        self.0
            .bind(source, move |s| project(s).into_iter().enumerate())
    }
}

macro_rules! keyed_front {
    ($name:ident<$($param:ident),*> => $target:ty) => {
        impl<$($param),*> From<$target> for $name<$($param),*> {
            fn from(keyed: $target) -> Self {
                Self(keyed)
            }
        }

        impl<$($param),*> Deref for $name<$($param),*> {
            type Target = $target;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl<$($param),*> Clone for $name<$($param),*> {
            fn clone(&self) -> Self {
                Self(self.0.clone())
            }
        }

        impl<$($param),*> Debug for $name<$($param),*>
        where
            $target: Debug,
        {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.0).finish()
            }
        }
    };
}

keyed_front!(KeyedMap<K, V, I> => Keyed<K, V, I>);
keyed_front!(KeyedSet<V, I> => Keyed<V, (), I>);
keyed_front!(KeyedList<V, I> => Keyed<usize, V, I>);

#[cfg(test)]
mod tests {
    use crate::dom::Node;
    use crate::keyed::{reconcile_by_index, reconcile_by_key, reconcile_by_set, ItemView};

    fn mount(root: &Node) -> Node {
        let div = Node::element("div");
        div.append_child(root).unwrap();
        div
    }

    #[test]
    fn map_set_and_remove() {
        let map = reconcile_by_key(|key: &&'static str, value: &u32| {
            ItemView::from(Node::text(format!("{key}={value} ")))
        })
        .build();
        let div = mount(map.root());

        map.set("a", 1).unwrap();
        map.set("b", 2).unwrap();
        map.set("a", 3).unwrap();
        assert_eq!(map.get(&"a"), Some(3));
        assert_eq!(map.keys(), vec!["a", "b"]);

        assert_eq!(map.remove(&"a").unwrap(), Some(3));
        assert_eq!(map.remove(&"a").unwrap(), None);
        assert_eq!(div.text_content(), "b=2 ");
    }

    #[test]
    fn set_rejects_repeated_values() {
        let set = reconcile_by_set(|value: &char| ItemView::from(Node::text(value.to_string())))
            .build();
        let div = mount(set.root());

        assert!(set.add('x').unwrap());
        assert!(set.add('y').unwrap());
        assert!(!set.add('x').unwrap());
        assert_eq!(div.text_content(), "xy");

        set.assign_values(['y', 'z', 'y']).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(div.text_content(), "yz");

        assert!(set.remove(&'y').unwrap());
        assert!(!set.remove(&'y').unwrap());
        assert_eq!(div.text_content(), "z");
    }

    #[test]
    fn list_identity_follows_index() {
        let list = reconcile_by_index(|index, value: &String| {
            let text = Node::text(format!("{index}:{value}|"));
            ItemView::new(text.clone(), text)
        })
        .on_update(|text: &Node, index: &usize, value: &String| {
            text.set_text(format!("{index}:{value}|"));
        })
        .build();
        let div = mount(list.root());

        list.push("a".to_string()).unwrap();
        list.push("c".to_string()).unwrap();
        let stats = list.insert(1, "b".to_string()).unwrap();

        // Index 1 is reused for "b" and index 2 is created for "c".
        assert_eq!(stats.created, 1);
        assert_eq!(div.text_content(), "0:a|1:b|2:c|");

        assert_eq!(list.remove(0).unwrap(), Some("a".to_string()));
        assert_eq!(div.text_content(), "0:b|1:c|");

        list.set(1, "d".to_string()).unwrap();
        list.set(9, "z".to_string()).unwrap();
        assert_eq!(list.get(&1), Some("d".to_string()));
        assert_eq!(list.len(), 2);
    }
}
