use core::{marker::PhantomData, pin::Pin, ptr::NonNull};

use crate::{predecessor, successor, Avl, Balance, Link, Links, SearchTree, TreeNode};

/// A cursor over a [`SearchTree`].
///
/// A cursor points either to an element of the tree or to a "ghost" non-element that connects the
/// last element to the first. The ghost doubles as the end marker: [`SearchTree::find`] returns a
/// cursor pointing to it when there is no match.
pub struct Cursor<'tree, T, B = Avl>
where
    T: TreeNode<Links<T>> + ?Sized,
    B: Balance,
{
    curs: CursorRaw<T, B>,
    phantom: PhantomData<&'tree SearchTree<T, B>>,
}

impl<'tree, T, B> Cursor<'tree, T, B>
where
    T: TreeNode<Links<T>> + ?Sized,
    B: Balance,
{
    pub(crate) fn at(tree: &'tree SearchTree<T, B>, ptr: Link<T>) -> Cursor<'tree, T, B> {
        Cursor {
            curs: CursorRaw {
                tree: tree.into(),
                ptr,
            },
            phantom: PhantomData,
        }
    }

    pub(crate) fn first(tree: &'tree SearchTree<T, B>) -> Cursor<'tree, T, B> {
        Cursor::at(tree, tree.first_raw())
    }

    pub(crate) fn last(tree: &'tree SearchTree<T, B>) -> Cursor<'tree, T, B> {
        Cursor::at(tree, tree.last_raw())
    }

    /// Returns `true` if the cursor is pointing to the "ghost" non-element.
    pub fn is_ghost(&self) -> bool {
        self.curs.ptr.is_none()
    }

    /// Moves the cursor to the next element of the `SearchTree`.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method moves it to the first
    /// element. If it is pointing to the last element, this method moves it to the "ghost"
    /// non-element.
    pub fn move_next(&mut self) {
        unsafe { self.curs.move_next() }
    }

    /// Moves the cursor to the previous element of the `SearchTree`.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method moves it to the last
    /// element. If it is pointing to the first element, this method moves it to the "ghost"
    /// non-element.
    pub fn move_prev(&mut self) {
        unsafe { self.curs.move_prev() }
    }

    /// Returns a reference to the item pointed to by the cursor.
    ///
    /// This returns `None` if the cursor is currently pointing to the "ghost" non-element.
    pub fn get(&self) -> Option<&'tree T> {
        // SAFETY: the tree is immutably borrowed for `'tree`.
        unsafe { self.curs.get() }
    }

    /// Returns a reference to the next item.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method returns the first element.
    /// If it is pointing to the last element, this method returns `None`.
    pub fn peek_next(&self) -> Option<&'tree T> {
        unsafe { self.curs.peek_next() }
    }

    /// Returns a reference to the previous item.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method returns the last element.
    /// If it is pointing to the first element, this method returns `None`.
    pub fn peek_prev(&self) -> Option<&'tree T> {
        unsafe { self.curs.peek_prev() }
    }
}

impl<'tree, T, B> Clone for Cursor<'tree, T, B>
where
    T: TreeNode<Links<T>> + ?Sized,
    B: Balance,
{
    fn clone(&self) -> Self {
        Cursor {
            curs: CursorRaw {
                tree: self.curs.tree,
                ptr: self.curs.ptr,
            },
            phantom: PhantomData,
        }
    }
}

/// A cursor over a [`SearchTree`] which supports editing operations.
///
/// A cursor points either to an element of the tree or to a "ghost" non-element that connects the
/// last element to the first.
pub struct CursorMut<'tree, T, B = Avl>
where
    T: TreeNode<Links<T>> + ?Sized,
    B: Balance,
{
    curs: CursorRaw<T, B>,
    phantom: PhantomData<&'tree mut SearchTree<T, B>>,
}

impl<'tree, T, B> CursorMut<'tree, T, B>
where
    T: TreeNode<Links<T>> + ?Sized,
    B: Balance,
{
    pub(crate) fn at(tree: &'tree mut SearchTree<T, B>, ptr: Link<T>) -> CursorMut<'tree, T, B> {
        CursorMut {
            curs: CursorRaw {
                tree: tree.into(),
                ptr,
            },
            phantom: PhantomData,
        }
    }

    pub(crate) fn first(tree: &'tree mut SearchTree<T, B>) -> CursorMut<'tree, T, B> {
        let ptr = tree.first_raw();
        CursorMut::at(tree, ptr)
    }

    pub(crate) fn last(tree: &'tree mut SearchTree<T, B>) -> CursorMut<'tree, T, B> {
        let ptr = tree.last_raw();
        CursorMut::at(tree, ptr)
    }

    /// Returns a read-only cursor pointing to the current element.
    ///
    /// The `CursorMut` remains immutably borrowed for the lifetime of the returned `Cursor`.
    pub fn as_cursor(&self) -> Cursor<'_, T, B> {
        Cursor {
            curs: CursorRaw {
                tree: self.curs.tree,
                ptr: self.curs.ptr,
            },
            phantom: PhantomData,
        }
    }

    /// Returns `true` if the cursor is pointing to the "ghost" non-element.
    pub fn is_ghost(&self) -> bool {
        self.curs.ptr.is_none()
    }

    /// See [`Cursor::move_next`].
    pub fn move_next(&mut self) {
        unsafe { self.curs.move_next() }
    }

    /// See [`Cursor::move_prev`].
    pub fn move_prev(&mut self) {
        unsafe { self.curs.move_prev() }
    }

    /// Returns a reference to the current element, or `None` at the ghost.
    pub fn get(&self) -> Option<&T> {
        unsafe { self.curs.get() }
    }

    /// Returns a pinned mutable reference to the item pointed to by the cursor.
    ///
    /// This returns `None` if the cursor is currently pointing to the "ghost" non-element.
    ///
    /// # Safety
    ///
    /// The caller must ensure that modifications to the returned value do not violate the
    /// invariants of the tree. In particular, the result of comparisons between the key of the
    /// returned item and the keys of other items in the tree must not change.
    pub unsafe fn get_mut(&mut self) -> Option<Pin<&mut T>> {
        unsafe { self.curs.get_mut() }
    }

    /// See [`Cursor::peek_next`].
    pub fn peek_next(&self) -> Option<&T> {
        unsafe { self.curs.peek_next() }
    }

    /// See [`Cursor::peek_prev`].
    pub fn peek_prev(&self) -> Option<&T> {
        unsafe { self.curs.peek_prev() }
    }

    /// Removes the current element from the tree.
    ///
    /// This returns the removed element and moves the cursor to the next element. If the cursor is
    /// pointing to the "ghost" non-element, this method returns `None`, and neither the tree nor
    /// the cursor is modified.
    pub fn remove_current(&mut self) -> Option<T::Handle> {
        unsafe { self.curs.remove_current() }
    }

    /// Like [`remove_current`](CursorMut::remove_current), but leaves the cursor on the element
    /// that preceded the removed one.
    pub fn remove_current_and_move_prev(&mut self) -> Option<T::Handle> {
        unsafe { self.curs.remove_current_and_move_prev() }
    }
}

struct CursorRaw<T, B>
where
    T: TreeNode<Links<T>> + ?Sized,
    B: Balance,
{
    tree: NonNull<SearchTree<T, B>>,
    ptr: Option<NonNull<T>>,
}

impl<T, B> CursorRaw<T, B>
where
    T: TreeNode<Links<T>> + ?Sized,
    B: Balance,
{
    unsafe fn move_next(&mut self) {
        self.ptr = unsafe { self.peek_next_raw() };
    }

    unsafe fn move_prev(&mut self) {
        self.ptr = unsafe { self.peek_prev_raw() };
    }

    unsafe fn get<'a>(&self) -> Option<&'a T> {
        self.ptr.map(|p| unsafe { p.as_ref() })
    }

    unsafe fn get_mut(&mut self) -> Option<Pin<&mut T>> {
        self.ptr
            .map(|mut p| unsafe { Pin::new_unchecked(p.as_mut()) })
    }

    unsafe fn peek_next_raw(&self) -> Link<T> {
        match self.ptr {
            // Removal relinks nodes but never moves them, so `p` is still valid here.
            Some(p) => unsafe { successor(p) },
            None => unsafe { self.tree.as_ref().first_raw() },
        }
    }

    unsafe fn peek_prev_raw(&self) -> Link<T> {
        match self.ptr {
            Some(p) => unsafe { predecessor(p) },
            None => unsafe { self.tree.as_ref().last_raw() },
        }
    }

    unsafe fn peek_next<'a>(&self) -> Option<&'a T> {
        unsafe { self.peek_next_raw().map(|p| p.as_ref()) }
    }

    unsafe fn peek_prev<'a>(&self) -> Option<&'a T> {
        unsafe { self.peek_prev_raw().map(|p| p.as_ref()) }
    }

    unsafe fn remove_current(&mut self) -> Option<T::Handle> {
        let remove = self.ptr?;

        unsafe {
            self.move_next();

            let tree = self.tree.as_mut();
            Some(tree.remove_at(remove))
        }
    }

    unsafe fn remove_current_and_move_prev(&mut self) -> Option<T::Handle> {
        let remove = self.ptr?;

        unsafe {
            self.move_prev();

            let tree = self.tree.as_mut();
            Some(tree.remove_at(remove))
        }
    }
}
