//! An ordered map built on [`SearchTree`].

extern crate alloc;

use alloc::boxed::Box;
use core::{
    borrow::Borrow,
    fmt,
    iter::FusedIterator,
    marker::PhantomPinned,
    mem,
    ops::Index,
    ptr::{self, NonNull},
};

use cordyceps::Linked;

use crate::{iter, Avl, Balance, KeyNotFound, Links, SearchTree, TreeNode, Unbalanced};

/// An ordered map based on a [`SearchTree`] with the rebalancing strategy `B`.
///
/// Each entry lives in its own heap allocation which never moves while the entry is in the map.
pub struct SearchMap<K: Ord, V, B: Balance = Avl> {
    tree: SearchTree<MapNode<K, V>, B>,
}

/// An ordered map based on an [AVL tree].
///
/// [AVL tree]: https://en.wikipedia.org/wiki/AVL_tree
pub type AvlMap<K, V> = SearchMap<K, V, Avl>;

/// An ordered map based on a plain binary search tree.
///
/// Lookups, insertions and removals take time proportional to the height of the tree, which is
/// linear in the worst case. Prefer [`AvlMap`] unless the shape of the tree matters.
pub type BstMap<K, V> = SearchMap<K, V, Unbalanced>;

struct MapNode<K, V> {
    links: Links<MapNode<K, V>>,
    key: K,
    value: V,
    _unpin: PhantomPinned,
}

impl<K, V> MapNode<K, V> {
    fn boxed(key: K, value: V) -> Box<Self> {
        Box::new(MapNode {
            links: Links::new(),
            key,
            value,
            _unpin: PhantomPinned,
        })
    }

    fn into_entry(self: Box<Self>) -> (K, V) {
        let MapNode { key, value, .. } = *self;
        (key, value)
    }
}

unsafe impl<K, V> Linked<Links<MapNode<K, V>>> for MapNode<K, V> {
    type Handle = Box<Self>;

    fn into_ptr(r: Self::Handle) -> NonNull<Self> {
        Box::leak(r).into()
    }

    unsafe fn from_ptr(ptr: NonNull<Self>) -> Self::Handle {
        unsafe { Box::from_raw(ptr.as_ptr()) }
    }

    unsafe fn links(ptr: NonNull<Self>) -> NonNull<Links<MapNode<K, V>>> {
        let ptr = ptr.as_ptr();

        // SAFETY: `ptr` is non-null, and so is a pointer to one of its fields.
        unsafe { NonNull::new_unchecked(ptr::addr_of_mut!((*ptr).links)) }
    }
}

impl<K: Ord, V> TreeNode<Links<MapNode<K, V>>> for MapNode<K, V> {
    type Key = K;

    fn key(&self) -> &Self::Key {
        &self.key
    }
}

// SAFETY: the map exclusively owns its nodes, and the raw links inside them never escape. It is
// therefore exactly as thread-safe as a `Box<(K, V)>`.
unsafe impl<K: Ord + Send, V: Send, B: Balance> Send for SearchMap<K, V, B> {}
unsafe impl<K: Ord + Sync, V: Sync, B: Balance> Sync for SearchMap<K, V, B> {}

impl<K: Ord, V, B: Balance> SearchMap<K, V, B> {
    /// Creates a new, empty map.
    pub const fn new() -> Self {
        Self {
            tree: SearchTree::new(),
        }
    }

    /// Returns `true` if the map contains no elements.
    pub const fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Returns the number of elements in the map.
    pub const fn len(&self) -> usize {
        self.tree.len()
    }

    /// Returns the height of the underlying tree.
    pub fn height(&self) -> usize {
        self.tree.height()
    }

    /// Returns `true` if the heights of the two subtrees of every node differ by at most one.
    ///
    /// This takes _O(n)_ time. An [`AvlMap`] is always balanced.
    pub fn is_balanced(&self) -> bool {
        self.tree.is_balanced()
    }

    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        self.tree.assert_invariants();
    }

    /// Returns `true` if the map contains a value associated with `key`.
    #[inline]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.contains_key(key)
    }

    /// Returns a reference to the value associated with `key`.
    #[inline]
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.get(key).map(|node| &node.get_ref().value)
    }

    /// Returns a mutable reference to the value associated with `key`.
    #[inline]
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree
            .get_mut(key)
            // SAFETY: Pinning is not structural for `node.value`.
            .map(|node| unsafe { &mut node.get_unchecked_mut().value })
    }

    /// Returns a reference to the value associated with `key`, or [`KeyNotFound`] if there is
    /// none.
    pub fn at<Q>(&self, key: &Q) -> Result<&V, KeyNotFound>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get(key).ok_or(KeyNotFound)
    }

    /// Returns a mutable reference to the value associated with `key`, or [`KeyNotFound`] if
    /// there is none.
    pub fn at_mut<Q>(&mut self, key: &Q) -> Result<&mut V, KeyNotFound>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get_mut(key).ok_or(KeyNotFound)
    }

    /// Returns a cursor pointing to the entry for `key`.
    ///
    /// If the map has no such entry, the cursor points to the end marker.
    pub fn find<Q>(&self, key: &Q) -> Cursor<'_, K, V, B>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        Cursor {
            inner: self.tree.find(key),
        }
    }

    /// Inserts a key-value pair into the map.
    ///
    /// If the map already had a value for `key`, the value is replaced and the old one returned.
    /// The key itself is not updated.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.tree.entry(&key) {
            crate::Entry::Occupied(mut occupied) => {
                // SAFETY: Pinning is not structural for `node.value`.
                let node = unsafe { occupied.get_mut().get_unchecked_mut() };
                Some(mem::replace(&mut node.value, value))
            }
            crate::Entry::Vacant(vacant) => {
                let node = MapNode::boxed(key, value);

                // SAFETY: the entry was looked up with the key now stored in `node`.
                unsafe { vacant.insert(node) };
                None
            }
        }
    }

    /// Removes the value associated with `key` from the map.
    #[inline]
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.remove(key).map(|node| node.value)
    }

    /// Removes the entry for `key` from the map, returning the stored key and value.
    #[inline]
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.remove(key).map(MapNode::into_entry)
    }

    /// Returns the first key-value pair in the map.
    ///
    /// The returned key is the minimum key in the map.
    #[inline]
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.tree.first().map(|node| {
            let node = node.get_ref();
            (&node.key, &node.value)
        })
    }

    /// Removes and returns the first key-value pair in the map.
    #[inline]
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        self.tree.pop_first().map(MapNode::into_entry)
    }

    /// Returns the last key-value pair in the map.
    ///
    /// The returned key is the maximum key in the map.
    #[inline]
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.tree.last().map(|node| {
            let node = node.get_ref();
            (&node.key, &node.value)
        })
    }

    /// Removes and returns the last key-value pair in the map.
    #[inline]
    pub fn pop_last(&mut self) -> Option<(K, V)> {
        self.tree.pop_last().map(MapNode::into_entry)
    }

    /// Clears the map, removing all elements.
    #[inline]
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Returns an iterator over the entries of the map, sorted by key.
    pub fn iter(&self) -> Iter<'_, K, V, B> {
        Iter {
            inner: self.tree.iter(),
        }
    }

    /// Returns an iterator over the keys of the map, in sorted order.
    pub fn keys(&self) -> Keys<'_, K, V, B> {
        Keys { inner: self.iter() }
    }

    /// Returns an iterator over the values of the map, sorted by key.
    pub fn values(&self) -> Values<'_, K, V, B> {
        Values { inner: self.iter() }
    }
}

impl<K: Ord, V, B: Balance> Default for SearchMap<K, V, B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, B> fmt::Debug for SearchMap<K, V, B>
where
    K: Ord + fmt::Debug,
    V: fmt::Debug,
    B: Balance,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, B> Clone for SearchMap<K, V, B>
where
    K: Ord + Clone,
    V: Clone,
    B: Balance,
{
    fn clone(&self) -> Self {
        self.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

impl<K: Ord, V: PartialEq, B: Balance> PartialEq for SearchMap<K, V, B> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<K: Ord, V: Eq, B: Balance> Eq for SearchMap<K, V, B> {}

impl<K: Ord, V, B: Balance> FromIterator<(K, V)> for SearchMap<K, V, B> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K: Ord, V, B: Balance> Extend<(K, V)> for SearchMap<K, V, B> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K, Q, V, B> Index<&Q> for SearchMap<K, V, B>
where
    K: Ord + Borrow<Q>,
    Q: Ord + ?Sized,
    B: Balance,
{
    type Output = V;

    /// Returns a reference to the value associated with `key`.
    ///
    /// # Panics
    ///
    /// Panics if the map has no entry for `key`.
    fn index(&self, key: &Q) -> &V {
        match self.at(key) {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }
}

impl<'map, K: Ord, V, B: Balance> IntoIterator for &'map SearchMap<K, V, B> {
    type Item = (&'map K, &'map V);
    type IntoIter = Iter<'map, K, V, B>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// A read-only cursor over the entries of a [`SearchMap`].
///
/// Returned by [`SearchMap::find`]. Moving past the last entry, or before the first, lands on the
/// end marker; moving again from there wraps around.
pub struct Cursor<'map, K: Ord, V, B: Balance = Avl> {
    inner: crate::Cursor<'map, MapNode<K, V>, B>,
}

impl<'map, K: Ord, V, B: Balance> Cursor<'map, K, V, B> {
    /// Returns `true` if the cursor points to the end marker.
    pub fn is_end(&self) -> bool {
        self.inner.is_ghost()
    }

    /// Returns the entry the cursor points to, or `None` at the end marker.
    pub fn key_value(&self) -> Option<(&'map K, &'map V)> {
        self.inner.get().map(|node| (&node.key, &node.value))
    }

    /// Returns the key the cursor points to, or `None` at the end marker.
    pub fn key(&self) -> Option<&'map K> {
        self.inner.get().map(|node| &node.key)
    }

    /// Returns the value the cursor points to, or `None` at the end marker.
    pub fn value(&self) -> Option<&'map V> {
        self.inner.get().map(|node| &node.value)
    }

    /// Moves the cursor to the next entry in key order.
    pub fn move_next(&mut self) {
        self.inner.move_next();
    }

    /// Moves the cursor to the previous entry in key order.
    pub fn move_prev(&mut self) {
        self.inner.move_prev();
    }

    /// Returns the entry after the cursor without moving it.
    pub fn peek_next(&self) -> Option<(&'map K, &'map V)> {
        self.inner.peek_next().map(|node| (&node.key, &node.value))
    }

    /// Returns the entry before the cursor without moving it.
    pub fn peek_prev(&self) -> Option<(&'map K, &'map V)> {
        self.inner.peek_prev().map(|node| (&node.key, &node.value))
    }
}

impl<'map, K: Ord, V, B: Balance> Clone for Cursor<'map, K, V, B> {
    fn clone(&self) -> Self {
        Cursor {
            inner: self.inner.clone(),
        }
    }
}

impl<'map, K, V, B> fmt::Debug for Cursor<'map, K, V, B>
where
    K: Ord + fmt::Debug,
    V: fmt::Debug,
    B: Balance,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Cursor").field(&self.key_value()).finish()
    }
}

/// An iterator over the entries of a [`SearchMap`], sorted by key.
pub struct Iter<'map, K: Ord, V, B: Balance = Avl> {
    inner: iter::Iter<'map, MapNode<K, V>, B>,
}

impl<'map, K: Ord, V, B: Balance> Iterator for Iter<'map, K, V, B> {
    type Item = (&'map K, &'map V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|node| (&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'map, K: Ord, V, B: Balance> ExactSizeIterator for Iter<'map, K, V, B> {}
impl<'map, K: Ord, V, B: Balance> FusedIterator for Iter<'map, K, V, B> {}

impl<'map, K: Ord, V, B: Balance> Clone for Iter<'map, K, V, B> {
    fn clone(&self) -> Self {
        Iter {
            inner: self.inner.clone(),
        }
    }
}

/// An iterator over the keys of a [`SearchMap`], in sorted order.
pub struct Keys<'map, K: Ord, V, B: Balance = Avl> {
    inner: Iter<'map, K, V, B>,
}

impl<'map, K: Ord, V, B: Balance> Iterator for Keys<'map, K, V, B> {
    type Item = &'map K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'map, K: Ord, V, B: Balance> ExactSizeIterator for Keys<'map, K, V, B> {}
impl<'map, K: Ord, V, B: Balance> FusedIterator for Keys<'map, K, V, B> {}

/// An iterator over the values of a [`SearchMap`], sorted by key.
pub struct Values<'map, K: Ord, V, B: Balance = Avl> {
    inner: Iter<'map, K, V, B>,
}

impl<'map, K: Ord, V, B: Balance> Iterator for Values<'map, K, V, B> {
    type Item = &'map V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'map, K: Ord, V, B: Balance> ExactSizeIterator for Values<'map, K, V, B> {}
impl<'map, K: Ord, V, B: Balance> FusedIterator for Values<'map, K, V, B> {}

#[cfg(test)]
mod map_tests {
    use super::*;

    fn avl_map(keys: &[i32]) -> AvlMap<i32, String> {
        keys.iter().map(|&k| (k, format!("v{k}"))).collect()
    }

    #[test]
    fn insert_overwrites_value() {
        let mut map = AvlMap::new();

        assert_eq!(map.insert(1, "a"), None);
        assert_eq!(map.insert(1, "b"), Some("a"));
        assert_eq!(map.len(), 1);
        assert_eq!(map[&1], "b");
        map.assert_invariants();
    }

    #[test]
    fn duplicate_insert_keeps_height() {
        let mut map = avl_map(&[4, 2, 6, 1, 3, 5, 7]);
        let height = map.height();

        for k in 1..=7 {
            map.insert(k, String::from("again"));
        }

        assert_eq!(map.len(), 7);
        assert_eq!(map.height(), height);
        assert!(map.values().all(|v| v == "again"));
    }

    #[test]
    fn at_reports_missing_key() {
        let mut map = avl_map(&[1, 2, 3]);

        assert_eq!(map.at(&2).map(String::as_str), Ok("v2"));
        assert_eq!(map.at(&4), Err(KeyNotFound));

        map.at_mut(&3).unwrap().push('!');
        assert_eq!(map[&3], "v3!");
        assert_eq!(map.at_mut(&0), Err(KeyNotFound));
        assert_eq!(KeyNotFound.to_string(), "key not found");
    }

    #[test]
    #[should_panic(expected = "key not found")]
    fn index_panics_on_missing_key() {
        let map = avl_map(&[1, 2, 3]);
        let _ = &map[&4];
    }

    #[test]
    fn find_returns_end_marker() {
        let map = avl_map(&[10, 20, 30]);

        let mut cursor = map.find(&20);
        assert!(!cursor.is_end());
        assert_eq!(cursor.key(), Some(&20));
        assert_eq!(cursor.peek_prev().map(|(k, _)| *k), Some(10));
        assert_eq!(cursor.peek_next().map(|(k, _)| *k), Some(30));

        cursor.move_next();
        cursor.move_next();
        assert!(cursor.is_end());
        assert_eq!(cursor.key_value(), None);

        // The end marker sits between the last entry and the first.
        cursor.move_next();
        assert_eq!(cursor.key(), Some(&10));

        let missing = map.find(&25);
        assert!(missing.is_end());
        assert_eq!(missing.value(), None);
    }

    #[test]
    fn round_trip() {
        let mut map = AvlMap::new();
        map.insert(7, 70);
        assert_eq!(map.find(&7).value(), Some(&70));

        assert_eq!(map.remove(&7), Some(70));
        assert!(map.find(&7).is_end());
        assert_eq!(map.remove(&7), None);
        assert!(map.is_empty());
    }

    #[test]
    fn remove_entry_returns_key() {
        let mut map = avl_map(&[1, 2, 3]);

        assert_eq!(map.remove_entry(&2), Some((2, String::from("v2"))));
        assert_eq!(map.remove_entry(&2), None);
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), [1, 3]);
    }

    #[test]
    fn first_and_last() {
        let mut map = avl_map(&[5, 3, 8, 1]);

        assert_eq!(map.first_key_value().map(|(k, _)| *k), Some(1));
        assert_eq!(map.last_key_value().map(|(k, _)| *k), Some(8));
        assert_eq!(map.pop_first().map(|(k, _)| k), Some(1));
        assert_eq!(map.pop_last().map(|(k, _)| k), Some(8));
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), [3, 5]);
    }

    #[test]
    fn iteration_restarts() {
        let map = avl_map(&[3, 1, 2]);

        let first: Vec<_> = map.keys().copied().collect();
        let second: Vec<_> = (&map).into_iter().map(|(k, _)| *k).collect();

        assert_eq!(first, [1, 2, 3]);
        assert_eq!(first, second);
        assert_eq!(map.iter().len(), 3);
    }

    #[test]
    fn clone_and_compare() {
        let map = avl_map(&[1, 2, 3]);
        let mut other = map.clone();

        assert_eq!(map, other);
        other.insert(4, String::from("v4"));
        assert_ne!(map, other);
        assert_eq!(format!("{map:?}"), r#"{1: "v1", 2: "v2", 3: "v3"}"#);
    }

    #[test]
    fn clear_and_reuse() {
        let mut map = avl_map(&[1, 2, 3, 4, 5]);

        map.clear();
        assert!(map.is_empty());
        assert_eq!(map.height(), 0);
        assert_eq!(map.get(&1), None);

        map.extend([(9, String::from("nine"))]);
        assert_eq!(map.len(), 1);
        map.assert_invariants();
    }

    #[test]
    fn bst_map_degenerates() {
        let mut bst: BstMap<u32, ()> = (0..64).map(|k| (k, ())).collect();
        let avl: AvlMap<u32, ()> = (0..64).map(|k| (k, ())).collect();

        assert_eq!(bst.height(), 64);
        assert!(!bst.is_balanced());
        assert!(avl.height() <= 7);
        assert!(avl.is_balanced());

        bst.remove(&0);
        bst.assert_invariants();
    }

    #[test]
    fn map_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AvlMap<u32, String>>();
    }
}
