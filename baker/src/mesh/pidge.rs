use std::marker::PhantomData;

pub trait Key: Into<usize> + From<usize> + Copy {}

impl<T> Key for T where T: Into<usize> + From<usize> + Copy {}

/// A `Pidge` is a form of slotmap without key generations.
/// Very useful for 'Object Soups', where we want a low cost layer of indirection for object references.
///
/// Slots are filled once while building, then only ever wiped, so a key is never reused for a different value.
/// Compaction is left to the owner, which rebuilds a fresh pidge with dense keys.
#[derive(Debug, Clone, PartialEq)]
pub struct Pidge<K: Key, V> {
    data: Vec<Option<V>>,
    len: usize,
    _k: PhantomData<K>,
}

impl<K: Key, V> Default for Pidge<K, V> {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl<K: Key, V> Pidge<K, V> {
    pub fn with_capacity(capacity: usize) -> Self {
        let mut data = Vec::with_capacity(capacity);
        data.resize_with(capacity, || None);

        Pidge {
            data,
            len: 0,
            _k: PhantomData,
        }
    }

    /// Number of filled slots
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots, filled or not
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Fill slot `key`, growing if needed. Returns the previous value.
    pub fn insert(&mut self, key: K, val: V) -> Option<V> {
        let id = key.into();
        if id >= self.data.len() {
            self.data.resize_with(id + 1, || None);
        }

        let old = self.data[id].replace(val);
        if old.is_none() {
            self.len += 1;
        }
        old
    }

    /// Empty slot `key`, returning what it held
    pub fn wipe(&mut self, key: K) -> Option<V> {
        let old = self.data.get_mut(key.into())?.take();
        if old.is_some() {
            self.len -= 1;
        }
        old
    }

    /// Panics if the slot is empty
    pub fn get(&self, key: K) -> &V {
        let id = key.into();
        match self.data.get(id) {
            Some(Some(v)) => v,
            _ => panic!("Pidge slot {id} is empty"),
        }
    }

    /// Panics if the slot is empty
    pub fn get_mut(&mut self, key: K) -> &mut V {
        let id = key.into();
        match self.data.get_mut(id) {
            Some(Some(v)) => v,
            _ => panic!("Pidge slot {id} is empty"),
        }
    }

    pub fn try_get(&self, key: K) -> Option<&V> {
        self.data.get(key.into())?.as_ref()
    }

    pub fn try_get_mut(&mut self, key: K) -> Option<&mut V> {
        self.data.get_mut(key.into())?.as_mut()
    }

    pub fn slot_full(&self, key: K) -> bool {
        self.try_get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &V> + '_ {
        self.data.iter().filter_map(|p| p.as_ref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut V> + '_ {
        self.data.iter_mut().filter_map(|p| p.as_mut())
    }

    pub fn iter_items(&self) -> impl Iterator<Item = (K, &V)> + '_ {
        self.data
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.as_ref().map(|v| (K::from(i), v)))
    }

    pub fn iter_items_mut(&mut self) -> impl Iterator<Item = (K, &mut V)> + '_ {
        self.data
            .iter_mut()
            .enumerate()
            .filter_map(|(i, p)| p.as_mut().map(|v| (K::from(i), v)))
    }

    pub fn iter_keys(&self) -> impl Iterator<Item = K> + '_ {
        self.data
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.as_ref().map(|_| K::from(i)))
    }
}
