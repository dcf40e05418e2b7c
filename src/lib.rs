//! An intrusive AVL tree, and an ordered map built on top of it.
#![cfg_attr(not(test), no_std)]

// Conventions used in comments:
// - The height of an empty subtree is 0 and the height of a leaf is 1.
// - The height of a node `x` is denoted `h(x)`.
// - The balance factor of a node `x` is denoted `b(x)` and is given by
//   `h(right(x)) - h(left(x))`.
// - A node is left-heavy if `b(x) < 0` and right-heavy if `b(x) > 0`.
//
// The fundamental invariant of an AVL tree is:
// 1. Between operations, `b(x) ∈ {-1, 0, 1}` for every node `x`.
//
// Corollaries:
// 2. A tree of height `h` has at least `F(h + 2) - 1` nodes, where `F` is the Fibonacci sequence.
//    Thus `h < 1.4405 * log2(n + 2)`.
// 3. A node with `b(x) = ±1` has a child on its heavy side.
//
// While a fix-up walk is in progress, the node at the head of the walk may transiently have
// `b(x) = ±2`. That node is restructured before the walk moves on.
//
// The search tree itself knows nothing about balance factors beyond storing them. Everything that
// reads or writes them lives behind the `Balance` strategy, so the same substrate also serves as a
// plain, unbalanced binary search tree.

extern crate alloc;

use alloc::vec::Vec;
use core::{
    borrow::Borrow,
    cell::UnsafeCell,
    cmp::Ordering,
    fmt,
    marker::{PhantomData, PhantomPinned},
    ops::Not,
    pin::Pin,
    ptr::NonNull,
};

use cordyceps::Linked;

mod avl;
mod balance;
mod cursor;
mod entry;
mod error;
mod iter;
pub mod map;

#[cfg(any(test, feature = "model"))]
pub mod model;

#[cfg(test)]
mod tests;

pub use crate::{
    avl::Avl,
    balance::{Balance, Unbalanced},
    cursor::{Cursor, CursorMut},
    entry::{Entry, OccupiedEntry, VacantEntry},
    error::KeyNotFound,
    iter::Iter,
    map::{AvlMap, BstMap, SearchMap},
};

pub trait TreeNode<L>: Linked<L> {
    type Key: Ord;

    fn key(&self) -> &Self::Key;
}

/// An intrusive binary search tree, rebalanced after every change by the strategy `B`.
///
/// With the default strategy, [`Avl`], this is an AVL tree: the heights of the two subtrees of
/// every node differ by at most one, so lookups, insertions and removals complete in
/// _O(log(n))_ time regardless of insertion order.
pub struct SearchTree<T, B = Avl>
where
    T: TreeNode<Links<T>> + ?Sized,
    B: Balance,
{
    root: Link<T>,
    len: usize,
    _balance: PhantomData<B>,
}

/// An intrusive AVL tree.
pub type AvlTree<T> = SearchTree<T, Avl>;

/// An intrusive binary search tree which is never rebalanced.
pub type BstTree<T> = SearchTree<T, Unbalanced>;

/// The links embedded in every element of a [`SearchTree`].
pub struct Links<T: ?Sized> {
    inner: UnsafeCell<LinksInner<T>>,
}

/// One of the two sides of a node.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Dir {
    Left = 0,
    Right = 1,
}

impl Not for Dir {
    type Output = Dir;

    fn not(self) -> Self::Output {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

#[repr(C)]
struct LinksInner<T: ?Sized> {
    parent: Link<T>,
    children: [Link<T>; 2],
    balance: i8,
    _unpin: PhantomPinned,
}

type Link<T> = Option<NonNull<T>>;

impl<T, B> SearchTree<T, B>
where
    T: TreeNode<Links<T>> + ?Sized,
    B: Balance,
{
    /// Returns a new empty tree.
    pub const fn new() -> SearchTree<T, B> {
        SearchTree {
            root: None,
            len: 0,
            _balance: PhantomData,
        }
    }

    /// Returns `true` if the tree contains no elements.
    pub const fn is_empty(&self) -> bool {
        let empty = self.len() == 0;

        if cfg!(debug_assertions) {
            // Can't use assert_eq!() in const fn.
            assert!(empty == self.root.is_none());
        }

        empty
    }

    /// Returns the number of elements in the tree.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns the height of the tree.
    ///
    /// An empty tree has height 0 and a tree with a single element has height 1.
    pub fn height(&self) -> usize {
        unsafe { self.fold_heights(|_, _, _| {}) }
    }

    /// Returns `true` if, for every element, the heights of its two subtrees differ by at most
    /// one.
    ///
    /// This recomputes every height from scratch and takes _O(n)_ time. An [`AvlTree`] is always
    /// balanced; the check is meant for tests and diagnostics.
    pub fn is_balanced(&self) -> bool {
        let mut balanced = true;

        unsafe {
            self.fold_heights(|_, left, right| {
                if left.abs_diff(right) >= 2 {
                    balanced = false;
                }
            });
        }

        balanced
    }

    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        let Some(root) = self.root else {
            assert_eq!(self.len, 0);
            return;
        };

        let mut count = 0;

        unsafe {
            assert_eq!(links(root).parent(), None, "root has a parent");

            self.fold_heights(|node, left_height, right_height| {
                count += 1;

                for dir in [Dir::Left, Dir::Right] {
                    if let Some(child) = links(node).child(dir) {
                        // Ensure child's parent link points to this node.
                        let parent = links(child).parent().expect("child parent pointer not set");
                        assert_eq!(node, parent);
                    }
                }

                B::assert_balanced_at(node, left_height, right_height);
            });

            // Ensure keys are strictly increasing in order.
            let mut opt_cur = self.first_raw();
            while let Some(cur) = opt_cur {
                opt_cur = successor(cur);

                if let Some(next) = opt_cur {
                    assert!(cur.as_ref().key() < next.as_ref().key(), "keys out of order");
                }
            }
        }

        assert_eq!(count, self.len);
    }

    /// Returns a reference to the element corresponding to `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<Pin<&T>>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let ptr = self.get_raw(key)?;
        unsafe { Some(Pin::new_unchecked(ptr.as_ref())) }
    }

    /// Returns a pinned mutable reference to the element corresponding to `key`.
    ///
    /// The caller must not change the element's key in a way that changes its ordering relative
    /// to the other keys in the tree.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<Pin<&mut T>>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut ptr = self.get_raw(key)?;
        unsafe { Some(Pin::new_unchecked(ptr.as_mut())) }
    }

    /// Returns `true` if the tree contains an element corresponding to `key`.
    #[inline]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get_raw(key).is_some()
    }

    fn get_raw<Q>(&self, key: &Q) -> Link<T>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut opt_cur = self.root;

        loop {
            let cur = opt_cur?;

            unsafe {
                match key.cmp(cur.as_ref().key().borrow()) {
                    Ordering::Less => opt_cur = links(cur).left(),
                    Ordering::Equal => return Some(cur),
                    Ordering::Greater => opt_cur = links(cur).right(),
                }
            }
        }
    }

    /// Returns the minimum element of the tree.
    pub fn first(&self) -> Option<Pin<&T>> {
        self.first_raw()
            .map(|first| unsafe { Pin::new_unchecked(first.as_ref()) })
    }

    /// Returns the maximum element of the tree.
    pub fn last(&self) -> Option<Pin<&T>> {
        self.last_raw()
            .map(|last| unsafe { Pin::new_unchecked(last.as_ref()) })
    }

    fn first_raw(&self) -> Link<T> {
        self.root.map(|root| unsafe { min_in_subtree(root) })
    }

    fn last_raw(&self) -> Link<T> {
        self.root.map(|root| unsafe { max_in_subtree(root) })
    }

    /// Returns an iterator over the elements of the tree, in ascending key order.
    pub fn iter(&self) -> Iter<'_, T, B> {
        Iter::new(self)
    }

    /// Returns a cursor pointing to the element corresponding to `key`.
    ///
    /// If the tree contains no such element, the cursor points to the "ghost" non-element.
    pub fn find<Q>(&self, key: &Q) -> Cursor<'_, T, B>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let ptr = self.get_raw(key);
        Cursor::at(self, ptr)
    }

    /// Returns a mutable cursor pointing to the element corresponding to `key`.
    ///
    /// If the tree contains no such element, the cursor points to the "ghost" non-element.
    pub fn find_mut<Q>(&mut self, key: &Q) -> CursorMut<'_, T, B>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let ptr = self.get_raw(key);
        CursorMut::at(self, ptr)
    }

    /// Returns a cursor pointing to the minimum element of the tree.
    pub fn cursor_first(&self) -> Cursor<'_, T, B> {
        Cursor::first(self)
    }

    /// Returns a cursor pointing to the maximum element of the tree.
    pub fn cursor_last(&self) -> Cursor<'_, T, B> {
        Cursor::last(self)
    }

    /// Returns a mutable cursor pointing to the minimum element of the tree.
    pub fn cursor_first_mut(&mut self) -> CursorMut<'_, T, B> {
        CursorMut::first(self)
    }

    /// Returns a mutable cursor pointing to the maximum element of the tree.
    pub fn cursor_last_mut(&mut self) -> CursorMut<'_, T, B> {
        CursorMut::last(self)
    }

    /// Returns the entry corresponding to `key`, which may be vacant or occupied.
    ///
    /// This descends the tree once; inserting into a vacant entry does not search again.
    pub fn entry<Q>(&mut self, key: &Q) -> Entry<'_, T, B>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let Some(mut cur) = self.root else {
            return unsafe { Entry::vacant_root(self) };
        };

        // Descend the tree, looking for either `key` or the empty slot it belongs in.
        loop {
            let dir = match key.cmp(unsafe { cur.as_ref().key().borrow() }) {
                Ordering::Less => Dir::Left,
                Ordering::Equal => return unsafe { Entry::occupied(self, cur) },
                Ordering::Greater => Dir::Right,
            };

            match unsafe { links(cur).child(dir) } {
                Some(child) => cur = child,
                None => return unsafe { Entry::vacant_child(self, cur, dir) },
            }
        }
    }

    /// Inserts an item into the tree.
    ///
    /// If the tree already contains an element with an equal key, that element is replaced by
    /// `item` in place and returned. The shape of the tree does not change in that case.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub fn insert(&mut self, item: T::Handle) -> Option<T::Handle> {
        let ptr = T::into_ptr(item);

        // SAFETY: `ptr` was just leaked from a live handle.
        let key = unsafe { ptr.as_ref().key() };

        match self.entry(key) {
            Entry::Occupied(mut occupied) => Some(unsafe { occupied.replace_ptr(ptr) }),
            Entry::Vacant(vacant) => {
                unsafe { vacant.insert_ptr(ptr) };
                None
            }
        }
    }

    // Links `ptr` into the empty tree as its root.
    unsafe fn insert_as_root(&mut self, ptr: NonNull<T>) {
        debug_assert!(self.root.is_none());

        unsafe { links(ptr).clear() };

        self.root = Some(ptr);
        self.len += 1;
    }

    // Links `ptr` into the tree as the `dir` child of the leaf slot under `parent`, then runs the
    // strategy's insertion fix-up.
    unsafe fn insert_as_child(&mut self, parent: NonNull<T>, dir: Dir, ptr: NonNull<T>) {
        unsafe {
            debug_assert!(links(parent).child(dir).is_none());

            links(ptr).clear();
            links(ptr).set_parent(Some(parent));
            links(parent).set_child(dir, Some(ptr));

            self.len += 1;

            B::rebalance_inserted(self, ptr);
        }
    }

    /// Removes the element corresponding to `key` from the tree and returns it.
    ///
    /// Returns `None`, leaving the tree untouched, if there is no such element.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<T::Handle>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let node = self.get_raw(key)?;
        Some(unsafe { self.remove_at(node) })
    }

    /// Removes and returns the minimum element of the tree.
    pub fn pop_first(&mut self) -> Option<T::Handle> {
        let first = self.first_raw()?;
        Some(unsafe { self.remove_at(first) })
    }

    /// Removes and returns the maximum element of the tree.
    pub fn pop_last(&mut self) -> Option<T::Handle> {
        let last = self.last_raw()?;
        Some(unsafe { self.remove_at(last) })
    }

    /// Removes an arbitrary node from the tree.
    ///
    /// # Safety
    ///
    /// It is the caller's responsibility to ensure that `node` is an element of `self`, and not any
    /// other tree.
    pub unsafe fn remove_at(&mut self, node: NonNull<T>) -> T::Handle {
        // There are three possible cases:
        //
        // 1. `node` has two children.
        //
        //    In this case `node` trades places with its predecessor[^1]. Only the links move; both
        //    elements keep their keys and values, and the balance factors stay with the positions.
        //    In its new position `node` has no right child, so this can be treated as case 2 or 3.
        //
        // 2. `node` has one child.
        //
        //    The child is elevated into `node`'s place.
        //
        // 3. `node` is a leaf.
        //
        //    `node`'s slot in its parent is emptied.
        //
        // In every case the subtree `node` was spliced out of got shorter, and the strategy is
        // told which side of the parent that was.
        //
        // [^1]: The predecessor of a node `a` is the greatest node in `a`'s left subtree.

        unsafe {
            if let (Some(left), Some(_)) = (links(node).left(), links(node).right()) {
                let predecessor = max_in_subtree(left);

                self.swap_positions(node, predecessor);
                B::swapped(self, node, predecessor);
            }

            let parent = links(node).parent();
            let child = links(node).left().or(links(node).right());
            debug_assert!(links(node).left().is_none() || links(node).right().is_none());

            let side = parent.map(|p| which_child(p, node));

            self.replace_child_or_set_root(parent, node, child);
            maybe_set_parent(child, parent);

            links(node).clear();
            self.len -= 1;

            if let (Some(parent), Some(side)) = (parent, side) {
                B::rebalance_removed(self, parent, side);
            }

            T::from_ptr(node)
        }
    }

    /// Clears the tree, removing all elements.
    pub fn clear(&mut self) {
        let mut opt_cur = self.root;

        while let Some(cur) = opt_cur {
            unsafe {
                // Descend to the minimum node.
                let cur = min_in_subtree(cur);
                let parent = links(cur).parent();
                let right = links(cur).right();

                // Elevate the node's right child (which may be None).
                self.replace_child_or_set_root(parent, cur, right);
                maybe_set_parent(right, parent);

                // Drop the node.
                links(cur).clear();
                drop(T::from_ptr(cur));
                self.len -= 1;

                // If the node had no right child, climb to the parent. If the node had no parent,
                // the tree is empty.
                opt_cur = right.or(parent);
            }
        }

        debug_assert!(self.root.is_none());
        debug_assert_eq!(self.len(), 0);
    }

    // Support methods ========================================================

    // Visits every node in post-order, passing the heights of its left and right subtrees, and
    // returns the height of the whole tree.
    //
    // The walk follows parent links instead of recursing, so it is safe on degenerate trees.
    unsafe fn fold_heights<F>(&self, mut visit: F) -> usize
    where
        F: FnMut(NonNull<T>, usize, usize),
    {
        enum Step {
            Descend,
            LeftDone,
            RightDone,
        }

        let Some(mut cur) = self.root else {
            return 0;
        };

        // Heights of finished subtrees whose parents are still pending.
        let mut heights = Vec::new();
        let mut step = Step::Descend;

        loop {
            unsafe {
                match step {
                    Step::Descend => match links(cur).left() {
                        Some(left) => cur = left,
                        None => {
                            heights.push(0);
                            step = Step::LeftDone;
                        }
                    },

                    Step::LeftDone => match links(cur).right() {
                        Some(right) => {
                            cur = right;
                            step = Step::Descend;
                        }
                        None => {
                            heights.push(0);
                            step = Step::RightDone;
                        }
                    },

                    Step::RightDone => {
                        let (Some(right), Some(left)) = (heights.pop(), heights.pop()) else {
                            unreachable!("both subtree heights must be pending");
                        };

                        visit(cur, left, right);
                        heights.push(1 + left.max(right));

                        match links(cur).parent() {
                            Some(parent) => {
                                step = match which_child(parent, cur) {
                                    Dir::Left => Step::LeftDone,
                                    Dir::Right => Step::RightDone,
                                };
                                cur = parent;
                            }
                            None => break,
                        }
                    }
                }
            }
        }

        debug_assert_eq!(heights.len(), 1);
        heights.pop().unwrap_or(0)
    }

    #[inline]
    unsafe fn replace_child_or_set_root(
        &mut self,
        parent: Link<T>,
        old_child: NonNull<T>,
        new_child: Link<T>,
    ) {
        match parent {
            Some(parent) => unsafe { replace_child(parent, old_child, new_child) },
            None => self.root = new_child,
        }
    }

    // Performs a rotation, moving `up` up and its parent `down` down.
    //
    // The balance factors of affected nodes are not updated.
    unsafe fn rotate_at(&mut self, down: NonNull<T>, up: NonNull<T>) {
        unsafe {
            // - `down` becomes the `dir` child of `up`.
            // - `across` goes from the `dir` child of `up` to the `!dir` child of `down`.
            let dir = which_child(down, up).not();

            let across = links(up).child(dir);
            links(down).set_child(!dir, across);
            maybe_set_parent(across, Some(down));

            links(up).set_child(dir, Some(down));
            let parent = links(down).set_parent(Some(up));
            links(up).set_parent(parent);

            self.replace_child_or_set_root(parent, down, Some(up));
        }
    }

    // Exchanges the positions of `a` and `b` in the tree.
    //
    // Only the structural links are exchanged; the elements themselves, and their balance
    // factors, stay where they are in memory. `a` and `b` may be adjacent.
    unsafe fn swap_positions(&mut self, a: NonNull<T>, b: NonNull<T>) {
        if a == b {
            return;
        }

        unsafe {
            let a_parent = links(a).parent();
            let a_left = links(a).left();
            let a_right = links(a).right();
            let a_side = a_parent.map(|p| which_child(p, a));

            let b_parent = links(b).parent();
            let b_left = links(b).left();
            let b_right = links(b).right();
            let b_side = b_parent.map(|p| which_child(p, b));

            // If one node is adjacent to the other, its link to the other must point back at
            // itself after the exchange.
            let fix = |link: Link<T>| match link {
                Some(n) if n == a => Some(b),
                Some(n) if n == b => Some(a),
                other => other,
            };

            links(a).set_parent(fix(b_parent));
            links(a).set_left(fix(b_left));
            links(a).set_right(fix(b_right));

            links(b).set_parent(fix(a_parent));
            links(b).set_left(fix(a_left));
            links(b).set_right(fix(a_right));

            // Repoint the parents' child slots. A parent which is one of the two swapped nodes has
            // already been handled above.
            match (a_parent, a_side) {
                (Some(p), Some(side)) if p != b => {
                    links(p).set_child(side, Some(b));
                }
                _ => {}
            }

            match (b_parent, b_side) {
                (Some(p), Some(side)) if p != a => {
                    links(p).set_child(side, Some(a));
                }
                _ => {}
            }

            // Repoint the children's parent links.
            for node in [a, b] {
                for dir in [Dir::Left, Dir::Right] {
                    maybe_set_parent(links(node).child(dir), Some(node));
                }
            }

            // Whichever node was the root before the exchange hands the root over to the other.
            if a_parent.is_none() {
                self.root = Some(b);
            } else if b_parent.is_none() {
                self.root = Some(a);
            }
        }
    }
}

impl<T, B> Drop for SearchTree<T, B>
where
    T: TreeNode<Links<T>> + ?Sized,
    B: Balance,
{
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T, B> Default for SearchTree<T, B>
where
    T: TreeNode<Links<T>> + ?Sized,
    B: Balance,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, B> fmt::Debug for SearchTree<T, B>
where
    T: TreeNode<Links<T>> + fmt::Debug + ?Sized,
    B: Balance,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

// Returns the links of `node`.
//
// # Safety
//
// `node` must point to a live element. The returned reference must not outlive it.
#[inline]
unsafe fn links<'a, T>(node: NonNull<T>) -> &'a Links<T>
where
    T: Linked<Links<T>> + ?Sized,
{
    unsafe { T::links(node).as_ref() }
}

unsafe fn maybe_set_parent<T>(opt_node: Link<T>, parent: Link<T>)
where
    T: Linked<Links<T>> + ?Sized,
{
    let Some(node) = opt_node else {
        return;
    };

    unsafe { links(node).set_parent(parent) };
}

// Replaces the child pointer of `parent` pointing at `old_child` with `new_child`.
//
// `new_child`'s parent pointer is not updated.
//
// # Safety
//
// The caller must ensure that `old_child` is a child node of `parent`.
#[inline]
unsafe fn replace_child<T>(parent: NonNull<T>, old_child: NonNull<T>, new_child: Link<T>)
where
    T: Linked<Links<T>> + ?Sized,
{
    unsafe {
        let dir = which_child(parent, old_child);
        debug_assert_eq!(links(parent).child(dir), Some(old_child));

        links(parent).set_child(dir, new_child);
    }
}

#[inline]
unsafe fn which_child<T>(parent: NonNull<T>, child: NonNull<T>) -> Dir
where
    T: Linked<Links<T>> + ?Sized,
{
    if unsafe { links(parent).left() } == Some(child) {
        Dir::Left
    } else {
        Dir::Right
    }
}

// Returns the minimum node in the subtree rooted at `root`.
#[inline]
unsafe fn min_in_subtree<T>(root: NonNull<T>) -> NonNull<T>
where
    T: Linked<Links<T>> + ?Sized,
{
    let mut cur = root;

    while let Some(left) = unsafe { links(cur).left() } {
        cur = left;
    }

    cur
}

// Returns the maximum node in the subtree rooted at `root`.
#[inline]
unsafe fn max_in_subtree<T>(root: NonNull<T>) -> NonNull<T>
where
    T: Linked<Links<T>> + ?Sized,
{
    let mut cur = root;

    while let Some(right) = unsafe { links(cur).right() } {
        cur = right;
    }

    cur
}

// Returns the in-order successor of `node`, or `None` if `node` is the maximum.
unsafe fn successor<T>(node: NonNull<T>) -> Link<T>
where
    T: Linked<Links<T>> + ?Sized,
{
    unsafe {
        if let Some(right) = links(node).right() {
            return Some(min_in_subtree(right));
        }

        // Ascend until arriving from a left child.
        let mut cur = node;
        while let Some(parent) = links(cur).parent() {
            if links(parent).left() == Some(cur) {
                return Some(parent);
            }

            cur = parent;
        }

        None
    }
}

// Returns the in-order predecessor of `node`, or `None` if `node` is the minimum.
unsafe fn predecessor<T>(node: NonNull<T>) -> Link<T>
where
    T: Linked<Links<T>> + ?Sized,
{
    unsafe {
        if let Some(left) = links(node).left() {
            return Some(max_in_subtree(left));
        }

        // Ascend until arriving from a right child.
        let mut cur = node;
        while let Some(parent) = links(cur).parent() {
            if links(parent).right() == Some(cur) {
                return Some(parent);
            }

            cur = parent;
        }

        None
    }
}

impl<T: ?Sized> Links<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: UnsafeCell::new(LinksInner {
                parent: None,
                children: [None; 2],
                balance: 0,
                _unpin: PhantomPinned,
            }),
        }
    }

    /// Returns `true` if the element owning these links is not currently in a tree.
    ///
    /// This is only meaningful for the root of a tree with a single element, or for elements
    /// which have never been inserted or have since been removed.
    #[inline]
    pub fn is_unlinked(&self) -> bool {
        self.parent().is_none() && self.left().is_none() && self.right().is_none()
    }

    #[inline]
    fn balance(&self) -> i8 {
        unsafe { (*self.inner.get()).balance }
    }

    #[inline]
    fn parent(&self) -> Link<T> {
        unsafe { (*self.inner.get()).parent }
    }

    #[inline]
    fn child(&self, dir: Dir) -> Link<T> {
        unsafe { (*self.inner.get()).children[dir as usize] }
    }

    #[inline]
    fn left(&self) -> Link<T> {
        self.child(Dir::Left)
    }

    #[inline]
    fn right(&self) -> Link<T> {
        self.child(Dir::Right)
    }

    // The setters take `&self`: every write goes through the `UnsafeCell`, so links may be
    // updated while other references to the same element are live.

    #[inline]
    fn set_parent(&self, parent: Link<T>) -> Link<T> {
        unsafe { core::mem::replace(&mut (*self.inner.get()).parent, parent) }
    }

    #[inline]
    fn set_child(&self, dir: Dir, child: Link<T>) -> Link<T> {
        unsafe { core::mem::replace(&mut (*self.inner.get()).children[dir as usize], child) }
    }

    #[inline]
    fn set_left(&self, left: Link<T>) -> Link<T> {
        self.set_child(Dir::Left, left)
    }

    #[inline]
    fn set_right(&self, right: Link<T>) -> Link<T> {
        self.set_child(Dir::Right, right)
    }

    #[inline]
    fn set_balance(&self, balance: i8) {
        unsafe { (*self.inner.get()).balance = balance };
    }

    #[inline]
    fn clear(&self) {
        self.set_parent(None);
        self.set_left(None);
        self.set_right(None);
        self.set_balance(0);
    }
}

impl<T: ?Sized> Default for Links<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for Links<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Links")
            .field("parent", &self.parent())
            .field("left", &self.left())
            .field("right", &self.right())
            .field("balance", &self.balance())
            .finish()
    }
}
