extern crate std;

use std::{ops::Range, prelude::v1::*};

use proptest::{
    prelude::*,
    test_runner::{RngAlgorithm, TestRng},
};
use tracing_subscriber::EnvFilter;

use crate::model::{self, TestNode};

use super::*;

// Routes the tree's trace events to the test output. Filter with `RUST_LOG`, e.g.
// `RUST_LOG=cordyceps_avl=trace`.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn key_of(node: Link<TestNode>) -> Option<u32> {
    node.map(|n| unsafe { n.as_ref().key })
}

fn balance_of<B: Balance>(tree: &SearchTree<TestNode, B>, key: u32) -> i8 {
    let node = tree.get_raw(&key).expect("item not found");
    unsafe { links(node).balance() }
}

fn children_of<B: Balance>(tree: &SearchTree<TestNode, B>, key: u32) -> (Option<u32>, Option<u32>) {
    let node = tree.get_raw(&key).expect("item not found");
    unsafe { (key_of(links(node).left()), key_of(links(node).right())) }
}

fn build<B: Balance>(keys: &[u32]) -> SearchTree<TestNode, B> {
    let mut tree = SearchTree::new();

    for &key in keys {
        assert!(tree.insert(TestNode::new(key)).is_none());
        tree.assert_invariants();
    }

    tree
}

// The largest height an AVL tree holding `n` elements can have.
fn avl_height_bound(n: usize) -> usize {
    (1.4405 * ((n + 2) as f64).log2()) as usize
}

fn insert_find_all<B: Balance>(keys: &[u32]) {
    let tree = build::<B>(keys);

    for key in keys {
        let node = tree.get_raw(key).expect("item not found");
        assert_eq!(unsafe { node.as_ref().key() }, key);
    }

    assert_eq!(tree.len(), keys.len());
}

fn insert_remove_all<B: Balance>(keys: &[u32]) {
    let mut tree = build::<B>(keys);

    for key in keys {
        let node = tree.get_raw(key).expect("item not found");
        let removed = unsafe { tree.remove_at(node) };
        assert_eq!(removed.key, *key);
        assert!(removed.links.is_unlinked());
        tree.assert_invariants();
    }

    assert!(tree.is_empty());

    for &key in keys {
        tree.insert(TestNode::new(key));
        tree.assert_invariants();
    }

    for key in keys.iter().rev() {
        assert!(tree.remove(key).is_some());
        tree.assert_invariants();
    }

    assert!(tree.is_empty());
}

// Calls `f` with every permutation of `0..n`.
fn for_each_permutation(n: u32, mut f: impl FnMut(&[u32])) {
    fn permute(keys: &mut Vec<u32>, k: usize, f: &mut dyn FnMut(&[u32])) {
        if k == keys.len() {
            f(keys.as_slice());
            return;
        }

        for i in k..keys.len() {
            keys.swap(k, i);
            permute(keys, k + 1, f);
            keys.swap(k, i);
        }
    }

    let mut keys: Vec<u32> = (0..n).collect();
    permute(&mut keys, 0, &mut f);
}

#[test]
fn zero_elems_find() {
    insert_find_all::<Avl>(&[]);
    insert_find_all::<Unbalanced>(&[]);
}

#[test]
fn single_elem_find() {
    insert_find_all::<Avl>(&[0]);
    insert_find_all::<Unbalanced>(&[0]);
}

#[test]
fn all_permutations_find() {
    for n in 0..=6 {
        for_each_permutation(n, insert_find_all::<Avl>);
        for_each_permutation(n, insert_find_all::<Unbalanced>);
    }
}

#[test]
fn remove_one() {
    insert_remove_all::<Avl>(&[0]);
}

#[test]
fn remove_two() {
    insert_remove_all::<Avl>(&[0, 1]);
    insert_remove_all::<Avl>(&[1, 0]);
}

#[test]
fn all_permutations_remove() {
    for n in 0..=6 {
        for_each_permutation(n, insert_remove_all::<Avl>);
        for_each_permutation(n, insert_remove_all::<Unbalanced>);
    }
}

#[test]
fn single_left_rotation() {
    init_tracing();

    let tree = build::<Avl>(&[10, 20, 30]);

    assert_eq!(key_of(tree.root), Some(20));
    assert_eq!(children_of(&tree, 20), (Some(10), Some(30)));

    for key in [10, 20, 30] {
        assert_eq!(balance_of(&tree, key), 0);
    }
}

#[test]
fn zig_zag_matches_single_rotation() {
    init_tracing();

    let straight = build::<Avl>(&[10, 20, 30]);
    let zig_zag = build::<Avl>(&[30, 10, 20]);

    assert_eq!(key_of(zig_zag.root), Some(20));

    for key in [10, 20, 30] {
        assert_eq!(children_of(&zig_zag, key), children_of(&straight, key));
        assert_eq!(balance_of(&zig_zag, key), 0);
    }
}

#[test]
fn remove_root_of_complete_tree() {
    init_tracing();

    //       4
    //     /   \
    //    2     6
    //   / \   / \
    //  1   3 5   7
    let mut tree = build::<Avl>(&[4, 2, 6, 1, 3, 5, 7]);
    assert_eq!(tree.height(), 3);

    let removed = tree.remove(&4).expect("root not found");
    assert_eq!(removed.key, 4);
    tree.assert_invariants();

    // The predecessor took over the root.
    assert_eq!(key_of(tree.root), Some(3));
    assert_eq!(tree.height(), 3);

    // Keep removing whatever sits at the root.
    while let Some(root) = key_of(tree.root) {
        assert_eq!(tree.remove(&root).map(|n| n.key), Some(root));
        tree.assert_invariants();
    }

    assert!(tree.is_empty());
}

fn drain_from_root<B: Balance>(n: u32) {
    let keys: Vec<u32> = (0..n).collect();
    let mut tree = build::<B>(&keys);

    while let Some(root) = key_of(tree.root) {
        assert_eq!(tree.remove(&root).map(|n| n.key), Some(root));
        assert!(tree.get_raw(&root).is_none());
        tree.assert_invariants();
    }

    assert!(tree.is_empty());
}

#[test]
fn remove_root_at_every_size() {
    for n in 2..200 {
        drain_from_root::<Avl>(n);
        drain_from_root::<Unbalanced>(n);
    }
}

#[test]
fn random_ops_stay_balanced() {
    init_tracing();

    #[cfg(miri)]
    const OPS: usize = 200;
    #[cfg(not(miri))]
    const OPS: usize = 10_000;

    let mut rng = TestRng::deterministic_rng(RngAlgorithm::ChaCha);
    let mut tree: AvlTree<TestNode> = AvlTree::new();
    let mut present = std::collections::BTreeSet::new();

    for _ in 0..OPS {
        let key = rng.gen_range(0..2_000u32);

        if rng.gen_bool(0.6) {
            let replaced = tree.insert(TestNode::new(key));
            assert_eq!(replaced.is_some(), !present.insert(key));
        } else {
            let removed = tree.remove(&key);
            assert_eq!(removed.is_some(), present.remove(&key));
        }

        assert!(tree.is_balanced());
        assert!(tree.height() <= avl_height_bound(tree.len()));
    }

    tree.assert_invariants();
    assert!(tree.iter().map(|n| n.key).eq(present.iter().copied()));
}

#[test]
fn sorted_inserts_respect_height_bound() {
    let mut ascending: AvlTree<TestNode> = AvlTree::new();
    let mut descending: AvlTree<TestNode> = AvlTree::new();

    for key in 0..4_096 {
        ascending.insert(TestNode::new(key));
        descending.insert(TestNode::new(4_095 - key));
    }

    ascending.assert_invariants();
    descending.assert_invariants();

    // Sorted inserts fill the tree level by level.
    assert_eq!(ascending.height(), 13);
    assert_eq!(descending.height(), 13);
    assert!(ascending.height() <= avl_height_bound(4_096));
}

#[test]
fn duplicate_insert_replaces_in_place() {
    let mut tree = build::<Avl>(&[4, 2, 6, 1, 3, 5, 7]);
    let height = tree.height();
    let balances: Vec<i8> = (1..=7).map(|k| balance_of(&tree, k)).collect();

    let old = tree.insert(TestNode::new(2)).expect("key 2 not replaced");
    assert!(old.links.is_unlinked());

    tree.assert_invariants();
    assert_eq!(tree.len(), 7);
    assert_eq!(tree.height(), height);
    assert_eq!(children_of(&tree, 2), (Some(1), Some(3)));
    assert_eq!(
        (1..=7).map(|k| balance_of(&tree, k)).collect::<Vec<_>>(),
        balances
    );
}

#[test]
fn entry_reuses_search() {
    let mut tree = build::<Avl>(&[1, 3]);

    match tree.entry(&2) {
        Entry::Vacant(vacant) => unsafe {
            vacant.insert(TestNode::new(2));
        },
        Entry::Occupied(_) => panic!("2 should be vacant"),
    }

    tree.assert_invariants();
    assert_eq!(key_of(tree.root), Some(2));

    let entry = tree.entry(&3);
    assert!(entry.is_occupied());

    if let Entry::Occupied(occupied) = entry {
        assert_eq!(occupied.get().key, 3);
        assert_eq!(occupied.remove().key, 3);
    }

    tree.assert_invariants();
    assert_eq!(tree.len(), 2);
}

#[test]
fn clear_and_reuse() {
    let mut tree = build::<Avl>(&[5, 3, 8, 1, 4, 7, 9]);

    tree.clear();
    assert!(tree.is_empty());
    assert_eq!(tree.height(), 0);
    assert!(tree.first().is_none());

    tree.insert(TestNode::new(42));
    tree.assert_invariants();
    assert_eq!(tree.first().map(|n| n.key), Some(42));
}

#[test]
fn iteration_restarts() {
    let tree = build::<Avl>(&[3, 1, 4, 5, 9, 2, 6]);

    let first: Vec<u32> = tree.iter().map(|n| n.key).collect();
    let second: Vec<u32> = (&tree).into_iter().map(|n| n.key).collect();

    assert_eq!(first, [1, 2, 3, 4, 5, 6, 9]);
    assert_eq!(first, second);

    let mut iter = tree.iter();
    assert_eq!(iter.len(), 7);
    iter.next();
    assert_eq!(iter.size_hint(), (6, Some(6)));
}

#[test]
fn cursor_removal() {
    let mut tree = build::<Avl>(&[1, 2, 3, 4, 5]);

    let mut cursor = tree.find_mut(&3);
    assert_eq!(cursor.remove_current().map(|n| n.key), Some(3));
    assert_eq!(cursor.get().map(|n| n.key), Some(4));

    assert_eq!(
        cursor.remove_current_and_move_prev().map(|n| n.key),
        Some(4)
    );
    assert_eq!(cursor.get().map(|n| n.key), Some(2));
    assert_eq!(cursor.as_cursor().peek_next().map(|n| n.key), Some(5));

    tree.assert_invariants();
    assert_eq!(tree.iter().map(|n| n.key).collect::<Vec<_>>(), [1, 2, 5]);

    let ghost = tree.find(&3);
    assert!(ghost.is_ghost());
    assert_eq!(ghost.peek_next().map(|n| n.key), Some(1));
    assert_eq!(ghost.peek_prev().map(|n| n.key), Some(5));
}

#[test]
fn unbalanced_never_rotates() {
    let tree = build::<Unbalanced>(&[10, 20, 30]);

    assert_eq!(key_of(tree.root), Some(10));
    assert_eq!(children_of(&tree, 10), (None, Some(20)));
    assert_eq!(children_of(&tree, 20), (None, Some(30)));
    assert!(!tree.is_balanced());
}

#[cfg(miri)]
const FUZZ_RANGE: Range<usize> = 0..10;

#[cfg(not(miri))]
const FUZZ_RANGE: Range<usize> = 0..1000;

proptest::proptest! {
    #![proptest_config(ProptestConfig {
        max_shrink_iters: 65536,
        .. ProptestConfig::default()
    })]

    #[test]
    fn btree_equivalence(ops in proptest::collection::vec(model::op_strategy(), FUZZ_RANGE)) {
        model::run_btree_equivalence::<Avl>(ops);
    }

    #[test]
    fn bst_btree_equivalence(ops in proptest::collection::vec(model::op_strategy(), FUZZ_RANGE)) {
        model::run_btree_equivalence::<Unbalanced>(ops);
    }

    #[test]
    fn cursor_equivalence(
        keys in proptest::collection::vec(0u32..1000, 0..100),
        ops in proptest::collection::vec(model::cursor_op_strategy(), FUZZ_RANGE),
    ) {
        model::run_cursor_equivalence(keys, ops);
    }
}
