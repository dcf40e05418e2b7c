use core::{iter::FusedIterator, marker::PhantomData};

use crate::{successor, Avl, Balance, Link, Links, SearchTree, TreeNode};

/// An iterator over the elements of a [`SearchTree`], in ascending key order.
///
/// Returned by [`SearchTree::iter`]. Calling `iter` again starts a fresh traversal.
pub struct Iter<'tree, T, B = Avl>
where
    T: TreeNode<Links<T>> + ?Sized,
    B: Balance,
{
    next: Link<T>,
    len: usize,
    _tree: PhantomData<&'tree SearchTree<T, B>>,
}

impl<'tree, T, B> Iter<'tree, T, B>
where
    T: TreeNode<Links<T>> + ?Sized,
    B: Balance,
{
    pub(crate) fn new(tree: &'tree SearchTree<T, B>) -> Self {
        Iter {
            next: tree.first_raw(),
            len: tree.len(),
            _tree: PhantomData,
        }
    }
}

impl<'tree, T, B> Iterator for Iter<'tree, T, B>
where
    T: TreeNode<Links<T>> + ?Sized,
    B: Balance,
{
    type Item = &'tree T;

    fn next(&mut self) -> Option<Self::Item> {
        let cur = self.next?;

        // SAFETY: the tree is borrowed for `'tree`, so no element can be removed or relinked.
        unsafe {
            self.next = successor(cur);
            self.len -= 1;

            Some(cur.as_ref())
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<'tree, T, B> ExactSizeIterator for Iter<'tree, T, B>
where
    T: TreeNode<Links<T>> + ?Sized,
    B: Balance,
{
}

impl<'tree, T, B> FusedIterator for Iter<'tree, T, B>
where
    T: TreeNode<Links<T>> + ?Sized,
    B: Balance,
{
}

impl<'tree, T, B> Clone for Iter<'tree, T, B>
where
    T: TreeNode<Links<T>> + ?Sized,
    B: Balance,
{
    fn clone(&self) -> Self {
        Iter {
            next: self.next,
            len: self.len,
            _tree: PhantomData,
        }
    }
}

impl<'tree, T, B> IntoIterator for &'tree SearchTree<T, B>
where
    T: TreeNode<Links<T>> + ?Sized,
    B: Balance,
{
    type Item = &'tree T;
    type IntoIter = Iter<'tree, T, B>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
