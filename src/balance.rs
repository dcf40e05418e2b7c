use core::ptr::NonNull;

use crate::{links, Dir, Links, SearchTree, TreeNode};

pub(crate) mod sealed {
    pub trait Sealed {}
}

/// A rebalancing strategy for a [`SearchTree`].
///
/// The tree performs the plain binary search tree part of every operation and then hands control
/// to its strategy, which may restructure the tree and maintain the balance factor stored in each
/// element's [`Links`].
///
/// This trait is sealed. The available strategies are [`Avl`](crate::Avl) and [`Unbalanced`].
pub trait Balance: sealed::Sealed + Sized {
    /// Restores the strategy's invariants after `node` was linked into the tree as a leaf.
    ///
    /// # Safety
    ///
    /// `node` must be an element of `tree`, with no children and a balance factor of zero.
    #[doc(hidden)]
    unsafe fn rebalance_inserted<T>(tree: &mut SearchTree<T, Self>, node: NonNull<T>)
    where
        T: TreeNode<Links<T>> + ?Sized;

    /// Restores the strategy's invariants after the `shortened` subtree of `parent` lost one
    /// level of height.
    ///
    /// # Safety
    ///
    /// `parent` must be an element of `tree`.
    #[doc(hidden)]
    unsafe fn rebalance_removed<T>(tree: &mut SearchTree<T, Self>, parent: NonNull<T>, shortened: Dir)
    where
        T: TreeNode<Links<T>> + ?Sized;

    /// Called after `a` and `b` exchanged their positions in `tree`.
    ///
    /// # Safety
    ///
    /// `a` and `b` must be elements of `tree`.
    #[doc(hidden)]
    unsafe fn swapped<T>(tree: &mut SearchTree<T, Self>, a: NonNull<T>, b: NonNull<T>)
    where
        T: TreeNode<Links<T>> + ?Sized;

    /// Panics if the balance metadata of `node` disagrees with the actual heights of its left and
    /// right subtrees.
    ///
    /// # Safety
    ///
    /// `node` must point to a live element.
    #[doc(hidden)]
    unsafe fn assert_balanced_at<T>(node: NonNull<T>, left_height: usize, right_height: usize)
    where
        T: TreeNode<Links<T>> + ?Sized;
}

/// A strategy which never rebalances.
///
/// A [`SearchTree`] using this strategy is a plain binary search tree: its shape depends entirely
/// on the order of insertions and removals, and sorted input degrades it into a list.
#[derive(Debug)]
pub enum Unbalanced {}

impl sealed::Sealed for Unbalanced {}

impl Balance for Unbalanced {
    #[inline]
    unsafe fn rebalance_inserted<T>(_tree: &mut SearchTree<T, Self>, _node: NonNull<T>)
    where
        T: TreeNode<Links<T>> + ?Sized,
    {
    }

    #[inline]
    unsafe fn rebalance_removed<T>(
        _tree: &mut SearchTree<T, Self>,
        _parent: NonNull<T>,
        _shortened: Dir,
    ) where
        T: TreeNode<Links<T>> + ?Sized,
    {
    }

    #[inline]
    unsafe fn swapped<T>(_tree: &mut SearchTree<T, Self>, _a: NonNull<T>, _b: NonNull<T>)
    where
        T: TreeNode<Links<T>> + ?Sized,
    {
    }

    unsafe fn assert_balanced_at<T>(node: NonNull<T>, _left_height: usize, _right_height: usize)
    where
        T: TreeNode<Links<T>> + ?Sized,
    {
        // Nothing ever writes a balance factor.
        assert_eq!(unsafe { links(node).balance() }, 0);
    }
}
