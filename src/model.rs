//! Model-based equivalence harnesses, shared by the property tests and the fuzz targets.

extern crate std;

use std::{collections::BTreeMap, prelude::v1::*, ptr::NonNull};

use arbitrary::Arbitrary;
use cordyceps::Linked;
use proptest::strategy::{Just, Strategy};

use crate::{AvlTree, Balance, KeyNotFound, Links, SearchMap, TreeNode};

/// A bare tree element keyed by a `u32`.
#[derive(Debug)]
#[repr(C)]
pub struct TestNode {
    pub links: Links<TestNode>,
    pub key: u32,
}

impl TestNode {
    pub fn new(key: u32) -> Box<TestNode> {
        Box::new(TestNode {
            links: Links::new(),
            key,
        })
    }
}

unsafe impl Linked<Links<TestNode>> for TestNode {
    type Handle = Box<TestNode>;

    fn into_ptr(r: Self::Handle) -> NonNull<Self> {
        Box::leak(r).into()
    }

    unsafe fn from_ptr(ptr: NonNull<Self>) -> Self::Handle {
        unsafe { Box::from_raw(ptr.as_ptr()) }
    }

    unsafe fn links(ptr: NonNull<Self>) -> NonNull<Links<TestNode>> {
        // SAFETY: Self is #[repr(C)] and `links` is first field
        ptr.cast()
    }
}

impl TreeNode<Links<TestNode>> for TestNode {
    type Key = u32;

    fn key(&self) -> &Self::Key {
        &self.key
    }
}

/// A key chosen either by position among the keys currently in the map, or at random.
///
/// Picking by position makes hits on existing keys as likely as misses.
#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum ItemValue {
    Index(usize),
    Random(u32),
}

proptest::prop_compose! {
    fn index_strategy()(
        index in 0usize..1000,
    ) -> ItemValue {
        ItemValue::Index(index)
    }
}

proptest::prop_compose! {
    fn random_strategy()(
        random in 0u32..1000,
    ) -> ItemValue {
        ItemValue::Random(random)
    }
}

fn key_strategy() -> impl Strategy<Value = ItemValue> {
    proptest::prop_oneof![index_strategy(), random_strategy()]
}

#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum Op {
    Insert(ItemValue, u32),
    Get(ItemValue),
    At(ItemValue),
    Remove(ItemValue),
    First,
    PopFirst,
    Last,
    PopLast,
    Clear,
}

impl Op {
    fn finalize(self, keys: &[u32]) -> FinalOp {
        fn get_key(v: &[u32], i: ItemValue) -> u32 {
            match i {
                ItemValue::Index(idx) => match v.len() {
                    0 => idx as u32,
                    len => v[idx % len],
                },
                ItemValue::Random(k) => k,
            }
        }

        match self {
            Op::Insert(item, value) => FinalOp::Insert(get_key(keys, item), value),
            Op::Get(item) => FinalOp::Get(get_key(keys, item)),
            Op::At(item) => FinalOp::At(get_key(keys, item)),
            Op::Remove(item) => FinalOp::Remove(get_key(keys, item)),
            Op::First => FinalOp::First,
            Op::PopFirst => FinalOp::PopFirst,
            Op::Last => FinalOp::Last,
            Op::PopLast => FinalOp::PopLast,
            Op::Clear => FinalOp::Clear,
        }
    }
}

#[derive(Copy, Clone, Debug)]
enum FinalOp {
    Insert(u32, u32),
    Get(u32),
    At(u32),
    Remove(u32),
    First,
    PopFirst,
    Last,
    PopLast,
    Clear,
}

pub fn op_strategy() -> impl Strategy<Value = Op> {
    proptest::prop_oneof![
        8 => (key_strategy(), 0u32..1000).prop_map(|(k, v)| Op::Insert(k, v)),
        3 => key_strategy().prop_map(Op::Get),
        2 => key_strategy().prop_map(Op::At),
        5 => key_strategy().prop_map(Op::Remove),
        1 => Just(Op::First),
        1 => Just(Op::PopFirst),
        1 => Just(Op::Last),
        1 => Just(Op::PopLast),
        1 => Just(Op::Clear),
    ]
}

/// Applies `ops` to both a [`SearchMap`] using the strategy `B` and a [`BTreeMap`], asserting that
/// every result agrees and that the map's invariants hold after each step.
pub fn run_btree_equivalence<B: Balance>(ops: Vec<Op>) {
    let mut btree = BTreeMap::new();
    let mut map: SearchMap<u32, u32, B> = SearchMap::new();

    // The keys currently in the map, in order. Kept alongside `btree` for O(1) indexing.
    let mut keys: Vec<u32> = Vec::with_capacity(ops.len());

    for (op_id, op) in ops.into_iter().enumerate() {
        let final_op = op.finalize(&keys);

        match final_op {
            FinalOp::Insert(key, value) => {
                let from_btree = btree.insert(key, value);
                let from_map = map.insert(key, value);

                assert_eq!(from_btree, from_map, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Get(key) => {
                let from_btree = btree.get(&key);
                let from_map = map.get(&key);

                assert_eq!(from_btree, from_map, "FinalOp #{op_id}: {final_op:?}");
                assert_eq!(
                    from_btree.is_some(),
                    map.contains_key(&key),
                    "FinalOp #{op_id}: {final_op:?}"
                );
            }

            FinalOp::At(key) => {
                let from_btree = btree.get(&key).ok_or(KeyNotFound);
                let from_map = map.at(&key);

                assert_eq!(from_btree, from_map, "FinalOp #{op_id}: {final_op:?}");
                assert_eq!(
                    from_btree.ok(),
                    map.find(&key).value(),
                    "FinalOp #{op_id}: {final_op:?}"
                );
            }

            FinalOp::Remove(key) => {
                let from_btree = btree.remove(&key);
                let from_map = map.remove(&key);

                assert_eq!(from_btree, from_map, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::First => {
                let from_btree = btree.first_key_value();
                let from_map = map.first_key_value();

                assert_eq!(from_btree, from_map, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::PopFirst => {
                let from_btree = btree.pop_first();
                let from_map = map.pop_first();

                assert_eq!(from_btree, from_map, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Last => {
                let from_btree = btree.last_key_value();
                let from_map = map.last_key_value();

                assert_eq!(from_btree, from_map, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::PopLast => {
                let from_btree = btree.pop_last();
                let from_map = map.pop_last();

                assert_eq!(from_btree, from_map, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Clear => {
                btree.clear();
                map.clear();
            }
        }

        keys.clear();
        keys.extend(btree.keys().copied());

        map.assert_invariants();
        assert_eq!(btree.len(), map.len());
        assert!(btree.iter().eq(map.iter()), "FinalOp #{op_id}: {final_op:?}");
    }
}

#[derive(Clone, Debug, Arbitrary)]
pub enum CursorOp {
    // Get is not an operation as it's executed on every loop iteration to check equivalence.
    MovePrev,
    MoveNext,
    PeekNext,
    PeekPrev,
    RemoveCurrent,
    RemoveCurrentMovePrev,
}

pub fn cursor_op_strategy() -> impl Strategy<Value = CursorOp> {
    proptest::prop_oneof![
        Just(CursorOp::MovePrev),
        Just(CursorOp::MoveNext),
        Just(CursorOp::PeekNext),
        Just(CursorOp::PeekPrev),
        Just(CursorOp::RemoveCurrent),
        Just(CursorOp::RemoveCurrentMovePrev),
    ]
}

#[derive(Clone, Debug)]
pub struct CursorEquivalenceInput {
    pub keys: Vec<u32>,
    pub ops: Vec<CursorOp>,
}

impl<'a> Arbitrary<'a> for CursorEquivalenceInput {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        let num_keys = u8::arbitrary(u)? % 100;
        let num_ops = u16::arbitrary(u)? % 1000;

        let mut keys = Vec::with_capacity(num_keys.into());
        for _ in 0..num_keys {
            keys.push(u32::arbitrary(u).unwrap_or(0));
        }

        let mut ops = Vec::with_capacity(num_ops.into());
        for _ in 0..num_ops {
            ops.push(CursorOp::arbitrary(u).unwrap_or(CursorOp::MoveNext));
        }

        Ok(CursorEquivalenceInput { keys, ops })
    }
}

/// Drives a [`CursorMut`](crate::CursorMut) over an [`AvlTree`] and an index into a sorted `Vec`
/// through the same operations, asserting that both always point at the same key.
pub fn run_cursor_equivalence(mut keys: Vec<u32>, ops: Vec<CursorOp>) {
    keys.sort_unstable();
    keys.dedup();

    let mut tree: AvlTree<TestNode> = AvlTree::new();
    for &key in &keys {
        tree.insert(TestNode::new(key));
    }

    // `None` is the ghost position.
    fn vec_prev(v: &[u32], curs: Option<usize>) -> Option<usize> {
        match curs {
            Some(i) => i.checked_sub(1),
            None => v.len().checked_sub(1),
        }
    }

    fn vec_next(v: &[u32], curs: Option<usize>) -> Option<usize> {
        match curs {
            Some(i) => Some(i + 1).filter(|&i| i < v.len()),
            None => (!v.is_empty()).then_some(0),
        }
    }

    let mut vec_curs = vec_next(&keys, None);
    let mut tree_curs = tree.cursor_first_mut();

    assert_eq!(vec_curs.map(|i| &keys[i]), tree_curs.get().map(TestNode::key));

    for (op_id, op) in ops.into_iter().enumerate() {
        match op {
            CursorOp::MoveNext => {
                vec_curs = vec_next(&keys, vec_curs);
                tree_curs.move_next();
            }

            CursorOp::MovePrev => {
                vec_curs = vec_prev(&keys, vec_curs);
                tree_curs.move_prev();
            }

            CursorOp::PeekNext => {
                let v = vec_next(&keys, vec_curs).map(|i| &keys[i]);
                let t = tree_curs.peek_next().map(TestNode::key);

                assert_eq!(v, t, "CursorOp #{op_id}: {op:?}");
            }

            CursorOp::PeekPrev => {
                let v = vec_prev(&keys, vec_curs).map(|i| &keys[i]);
                let t = tree_curs.peek_prev().map(TestNode::key);

                assert_eq!(v, t, "CursorOp #{op_id}: {op:?}");
            }

            CursorOp::RemoveCurrent => {
                let v = vec_curs.map(|i| keys.remove(i));

                // The element after the removed one slid into its index.
                if vec_curs == Some(keys.len()) {
                    vec_curs = None;
                }

                let t = tree_curs.remove_current().map(|node| node.key);

                assert_eq!(v, t, "CursorOp #{op_id}: {op:?}");
            }

            CursorOp::RemoveCurrentMovePrev => {
                let new_vec_curs = vec_curs.map(|i| i.checked_sub(1));
                let v = vec_curs.map(|i| keys.remove(i));

                if let Some(vc) = new_vec_curs {
                    vec_curs = vc;
                }

                let t = tree_curs
                    .remove_current_and_move_prev()
                    .map(|node| node.key);

                assert_eq!(v, t, "CursorOp #{op_id}: {op:?}");
            }
        }

        let v = vec_curs.map(|i| &keys[i]);
        let t = tree_curs.get().map(TestNode::key);

        assert_eq!(v, t, "CursorOp #{op_id}: {op:?}");
    }

    drop(tree_curs);
    tree.assert_invariants();
    assert!(tree.iter().map(TestNode::key).eq(keys.iter()));
}
