use core::ptr::NonNull;

use crate::{
    balance::{sealed::Sealed, Balance},
    links, which_child, Dir, Links, SearchTree, TreeNode,
};

/// The AVL strategy: after every change, the heights of the two subtrees of every element differ
/// by at most one.
///
/// Each element stores its balance factor, `h(right) - h(left)`, in its [`Links`]. Balance factors
/// are maintained incrementally; heights are never recomputed.
#[derive(Debug)]
pub enum Avl {}

impl Sealed for Avl {}

impl Balance for Avl {
    #[inline]
    unsafe fn rebalance_inserted<T>(tree: &mut SearchTree<T, Self>, node: NonNull<T>)
    where
        T: TreeNode<Links<T>> + ?Sized,
    {
        unsafe { tree.rebalance_inserted(node) }
    }

    #[inline]
    unsafe fn rebalance_removed<T>(tree: &mut SearchTree<T, Self>, parent: NonNull<T>, shortened: Dir)
    where
        T: TreeNode<Links<T>> + ?Sized,
    {
        unsafe { tree.rebalance_removed(parent, shortened) }
    }

    #[inline]
    unsafe fn swapped<T>(_tree: &mut SearchTree<T, Self>, a: NonNull<T>, b: NonNull<T>)
    where
        T: TreeNode<Links<T>> + ?Sized,
    {
        // The balance factors describe the positions, not the elements, so they trade back.
        unsafe {
            let a_balance = links(a).balance();
            links(a).set_balance(links(b).balance());
            links(b).set_balance(a_balance);
        }
    }

    unsafe fn assert_balanced_at<T>(node: NonNull<T>, left_height: usize, right_height: usize)
    where
        T: TreeNode<Links<T>> + ?Sized,
    {
        let balance = unsafe { links(node).balance() };
        let expected = right_height as isize - left_height as isize;

        assert_eq!(balance as isize, expected, "stale balance factor");
        assert!((-1..=1).contains(&balance), "balance factor out of range");
    }
}

// The change in a parent's balance factor when the subtree on side `dir` grows by one level.
#[inline]
fn grow(dir: Dir) -> i8 {
    match dir {
        Dir::Left => -1,
        Dir::Right => 1,
    }
}

// The side a node with balance factor `balance` leans toward.
#[inline]
fn heavy_side(balance: i8) -> Dir {
    if balance < 0 {
        Dir::Left
    } else {
        Dir::Right
    }
}

impl<T> SearchTree<T, Avl>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    // Performs a left rotation at `node`, promoting its right child into its place.
    //
    // Let `x` be `node` and `y` its right child. Only `b(x)` and `b(y)` change:
    //
    // - `x` loses `y` and gains `y`'s left subtree, so `b'(x) = b(x) - 1 - max(b(y), 0)`.
    // - `y` gains `x` as its left subtree, so `b'(y) = b(y) - 1 + min(b'(x), 0)`.
    //
    // These hold for any balance factors, including the transient ±2.
    unsafe fn rotate_left(&mut self, node: NonNull<T>) {
        unsafe {
            let up = links(node)
                .right()
                .expect("left rotation requires a right child");

            let node_balance = links(node).balance();
            let up_balance = links(up).balance();

            self.rotate_at(node, up);

            let node_balance = node_balance - 1 - up_balance.max(0);
            let up_balance = up_balance - 1 + node_balance.min(0);

            links(node).set_balance(node_balance);
            links(up).set_balance(up_balance);

            tracing::trace!(node_balance, up_balance, "rotated left");
        }
    }

    // Performs a right rotation at `node`, promoting its left child into its place.
    //
    // The mirror image of `rotate_left`:
    //
    // - `b'(x) = b(x) + 1 - min(b(y), 0)`
    // - `b'(y) = b(y) + 1 + max(b'(x), 0)`
    unsafe fn rotate_right(&mut self, node: NonNull<T>) {
        unsafe {
            let up = links(node)
                .left()
                .expect("right rotation requires a left child");

            let node_balance = links(node).balance();
            let up_balance = links(up).balance();

            self.rotate_at(node, up);

            let node_balance = node_balance + 1 - up_balance.min(0);
            let up_balance = up_balance + 1 + node_balance.max(0);

            links(node).set_balance(node_balance);
            links(up).set_balance(up_balance);

            tracing::trace!(node_balance, up_balance, "rotated right");
        }
    }

    // Rotates `node` toward `dir`; that is, `node` moves down into its own `dir` subtree.
    #[inline]
    unsafe fn rotate(&mut self, node: NonNull<T>, dir: Dir) {
        unsafe {
            match dir {
                Dir::Left => self.rotate_left(node),
                Dir::Right => self.rotate_right(node),
            }
        }
    }

    // Restores balance at `node`, whose balance factor is ±2 after an insertion.
    //
    // Let `c` be the child on `node`'s heavy side:
    // - If `c` leans the same way as `node` (zig-zig), a single rotation at `node` suffices.
    // - Otherwise (zig-zag), `c` is first rotated so that it leans the same way.
    //
    // Either way the subtree ends up exactly as tall as it was before the insertion.
    unsafe fn restructure(&mut self, node: NonNull<T>) {
        unsafe {
            let balance = links(node).balance();
            debug_assert_eq!(balance.abs(), 2);

            let heavy = heavy_side(balance);
            let child = links(node)
                .child(heavy)
                .expect("heavy side must have a child");
            let child_balance = links(child).balance();

            if balance.signum() * child_balance.signum() < 0 {
                tracing::trace!(balance, child_balance, "zig-zag; double rotation");
                self.rotate(child, heavy);
            } else {
                tracing::trace!(balance, child_balance, "zig-zig; single rotation");
            }

            self.rotate(node, !heavy);
        }
    }

    // Performs a bottom-up rebalance of the tree after the insertion of the leaf `node`.
    //
    // Walking up from `node`, each ancestor's subtree on the side of the walk just grew by one:
    // - If the ancestor becomes 0, its own height did not change, and the walk stops.
    // - If it becomes ±1, its height grew by one, and the walk continues.
    // - If it becomes ±2, one restructuring returns the subtree to its height before the
    //   insertion, and the walk stops.
    unsafe fn rebalance_inserted(&mut self, node: NonNull<T>) {
        debug_assert_eq!(unsafe { links(node).balance() }, 0);

        let mut child = node;

        unsafe {
            while let Some(parent) = links(child).parent() {
                let balance = links(parent).balance() + grow(which_child(parent, child));
                links(parent).set_balance(balance);

                match balance {
                    0 => return,
                    -1 | 1 => child = parent,
                    _ => {
                        self.restructure(parent);
                        return;
                    }
                }
            }
        }
    }

    // Performs a bottom-up rebalance of the tree after the `shortened` subtree of `parent` lost
    // one level of height.
    //
    // At each node `x` on the walk, `diff` is the change to `b(x)` implied by the shorter side:
    // - If `b(x) + diff` is ±1, `x` was balanced and is still as tall as before. Stop.
    // - If `b(x) + diff` is 0, `x` lost its taller side and is one shorter. Continue.
    // - If `b(x) + diff` is ±2, `x` must be restructured around the child `c` on its heavy side:
    //   1. `c` leans the same way: single rotation, `x` and `c` end balanced, the subtree is one
    //      shorter. Continue.
    //   2. `c` is balanced: single rotation, `x` and `c` end leaning toward each other, the
    //      subtree is as tall as before. Stop.
    //   3. `c` leans the other way: double rotation through `c`'s inner child `g`, which ends
    //      balanced, the subtree is one shorter. Continue.
    //
    // Unlike insertion, any number of restructurings may be required.
    unsafe fn rebalance_removed(&mut self, parent: NonNull<T>, shortened: Dir) {
        let mut node = parent;
        let mut diff = -grow(shortened);

        unsafe {
            loop {
                // Rotations move `node` down, so the next step is found first.
                let next = links(node)
                    .parent()
                    .map(|p| (p, -grow(which_child(p, node))));

                let balance = links(node).balance() + diff;
                links(node).set_balance(balance);

                match balance {
                    -1 | 1 => return,
                    0 => {}
                    _ => {
                        let heavy = heavy_side(balance);
                        let lean = balance.signum();
                        let child = links(node)
                            .child(heavy)
                            .expect("heavy side must have a child");
                        let child_balance = links(child).balance();

                        if child_balance == lean {
                            tracing::trace!(balance, child_balance, "removal: single rotation");
                            self.rotate(node, !heavy);

                            debug_assert_eq!(links(node).balance(), 0);
                            debug_assert_eq!(links(child).balance(), 0);
                        } else if child_balance == 0 {
                            tracing::trace!(balance, "removal: single rotation, height kept");
                            self.rotate(node, !heavy);

                            debug_assert_eq!(links(node).balance(), lean);
                            debug_assert_eq!(links(child).balance(), -lean);
                            return;
                        } else {
                            let grandchild = links(child)
                                .child(!heavy)
                                .expect("inner side must have a child");
                            let grandchild_balance = links(grandchild).balance();

                            tracing::trace!(
                                balance,
                                child_balance,
                                grandchild_balance,
                                "removal: double rotation"
                            );
                            self.rotate(child, heavy);
                            self.rotate(node, !heavy);

                            // `node` keeps `g`'s outer subtree and `c` its inner one, so each
                            // ends balanced unless `g` leaned away from it.
                            let expected = match grandchild_balance * lean {
                                1 => (-lean, 0),
                                0 => (0, 0),
                                _ => (0, lean),
                            };
                            debug_assert_eq!(
                                (links(node).balance(), links(child).balance()),
                                expected
                            );
                            debug_assert_eq!(links(grandchild).balance(), 0);
                        }
                    }
                }

                match next {
                    Some((p, d)) => {
                        node = p;
                        diff = d;
                    }
                    None => return,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TestNode;

    fn avl(keys: &[u32]) -> SearchTree<TestNode, Avl> {
        let mut tree = SearchTree::new();

        for &key in keys {
            tree.insert(TestNode::new(key));
            tree.assert_invariants();
        }

        tree
    }

    fn root_key(tree: &SearchTree<TestNode, Avl>) -> u32 {
        unsafe { tree.root.unwrap().as_ref().key }
    }

    fn children(tree: &SearchTree<TestNode, Avl>, key: u32) -> (Option<u32>, Option<u32>) {
        let node = tree.get_raw(&key).expect("item not found");

        unsafe {
            (
                links(node).left().map(|n| n.as_ref().key),
                links(node).right().map(|n| n.as_ref().key),
            )
        }
    }

    fn balance_of(tree: &SearchTree<TestNode, Avl>, key: u32) -> i8 {
        let node = tree.get_raw(&key).expect("item not found");
        unsafe { links(node).balance() }
    }

    #[test]
    fn ascending_triple_rotates_left() {
        let tree = avl(&[10, 20, 30]);

        assert_eq!(root_key(&tree), 20);
        assert_eq!(children(&tree, 20), (Some(10), Some(30)));
        for key in [10, 20, 30] {
            assert_eq!(balance_of(&tree, key), 0);
        }
    }

    #[test]
    fn descending_triple_rotates_right() {
        let tree = avl(&[30, 20, 10]);

        assert_eq!(root_key(&tree), 20);
        assert_eq!(children(&tree, 20), (Some(10), Some(30)));
    }

    #[test]
    fn zig_zag_double_rotates() {
        for keys in [[30, 10, 20], [10, 30, 20]] {
            let tree = avl(&keys);

            assert_eq!(root_key(&tree), 20);
            assert_eq!(children(&tree, 20), (Some(10), Some(30)));
            assert_eq!(children(&tree, 10), (None, None));
            assert_eq!(children(&tree, 30), (None, None));
        }
    }

    #[test]
    fn insert_stops_when_absorbed() {
        //     20
        //    /  \
        //   10  30
        //  /
        // 5
        let mut tree = avl(&[20, 10, 30, 5]);
        assert_eq!(balance_of(&tree, 20), -1);
        assert_eq!(balance_of(&tree, 10), -1);

        // Filling in the other side of 10 balances it, and 20 is untouched.
        tree.insert(TestNode::new(15));
        tree.assert_invariants();
        assert_eq!(balance_of(&tree, 10), 0);
        assert_eq!(balance_of(&tree, 20), -1);
    }

    #[test]
    fn insert_restructures_below_root() {
        // The imbalance appears at 3, not at the root, and the rotation stays local to it.
        let mut tree = avl(&[2, 1, 3, 4]);
        assert_eq!(balance_of(&tree, 2), 1);
        assert_eq!(balance_of(&tree, 3), 1);

        tree.insert(TestNode::new(5));
        tree.assert_invariants();
        assert_eq!(children(&tree, 4), (Some(3), Some(5)));
        assert_eq!(root_key(&tree), 2);
    }

    #[test]
    fn remove_root_with_two_children() {
        //      4
        //    /   \
        //   2     6
        //  / \   / \
        // 1   3 5   7
        let mut tree = avl(&[4, 2, 6, 1, 3, 5, 7]);

        let removed = tree.remove(&4).expect("item not found");
        assert_eq!(removed.key, 4);
        assert!(removed.links.is_unlinked());
        tree.assert_invariants();

        // The predecessor takes over the root position.
        assert_eq!(root_key(&tree), 3);
        assert_eq!(children(&tree, 3), (Some(2), Some(6)));
        assert_eq!(children(&tree, 2), (Some(1), None));
        assert_eq!(balance_of(&tree, 3), 0);
        assert_eq!(balance_of(&tree, 2), -1);
    }

    #[test]
    fn remove_root_adjacent_to_predecessor() {
        //   2
        //  / \
        // 1   3
        let mut tree = avl(&[2, 1, 3]);

        tree.remove(&2);
        tree.assert_invariants();

        assert_eq!(root_key(&tree), 1);
        assert_eq!(children(&tree, 1), (None, Some(3)));
        assert_eq!(balance_of(&tree, 1), 1);
    }

    #[test]
    fn remove_with_balanced_heavy_child_keeps_height() {
        //   2
        //  / \
        // 1   4
        //    / \
        //   3   5
        let mut tree = avl(&[2, 1, 4, 3, 5]);
        let height = tree.height();

        tree.remove(&1);
        tree.assert_invariants();

        assert_eq!(root_key(&tree), 4);
        assert_eq!(balance_of(&tree, 4), -1);
        assert_eq!(balance_of(&tree, 2), 1);
        assert_eq!(tree.height(), height);
    }

    #[test]
    fn remove_with_double_rotation() {
        //   2
        //  / \
        // 1   4
        //    /
        //   3
        let mut tree = avl(&[2, 1, 4, 3]);

        tree.remove(&1);
        tree.assert_invariants();

        assert_eq!(root_key(&tree), 3);
        assert_eq!(children(&tree, 3), (Some(2), Some(4)));
    }

    #[test]
    fn remove_cascades_restructuring() {
        // A minimal AVL tree of height 5 (a Fibonacci tree) loses its shallowest leaf. Each level
        // on the way up then needs its own rotation.
        let keys = [8, 5, 11, 3, 7, 10, 12, 2, 4, 6, 9, 1];
        let mut tree = avl(&keys);
        assert_eq!(tree.height(), 5);

        tree.remove(&12);
        tree.assert_invariants();
        assert!(tree.height() <= 4);
    }
}
