use crate::config::Config;
use crate::key::{FANOUT, LEAF_LEVEL};
use crate::map::TrieMap;
use crate::node::{Kind, Node, Repr};
use crate::set::TrieSet;
use crate::trie::RawTrie;

use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::{BTreeMap, BTreeSet};

/// `strict` also checks layout lower bounds, which a demotion skipped at the
/// memory limit leaves unmet.
fn validate_node<V>(node: &Node<V>, depth: usize, config: &Config, strict: bool) -> u64 {
    let level = node.level(depth);
    let n = node.slot_count();
    assert!(level <= LEAF_LEVEL, "prefix runs past the final digit");

    match node.repr() {
        Repr::Empty => panic!("empty node reachable from the root"),
        Repr::Sparse => assert!(
            (1..=config.sparse_max).contains(&n),
            "sparse node with {n} slots"
        ),
        Repr::Bitmap => assert!(
            (n > config.sparse_demote || !strict) && n <= config.bitmap_max,
            "bitmap node with {n} slots"
        ),
        Repr::Full => assert!(
            (n > config.bitmap_demote || !strict) && n <= FANOUT,
            "full node with {n} slots"
        ),
    }

    let count = match &node.kind {
        Kind::Leaf(slots) => {
            assert_eq!(level, LEAF_LEVEL, "leaf above the final digit");
            slots.len() as u64
        }
        Kind::Branch(slots) => {
            assert!(level < LEAF_LEVEL, "branch at the final digit");
            assert!(n >= 2, "branch with a single child must be merged");
            let mut digits = Vec::new();
            let mut total = 0;
            for (digit, child) in slots.iter() {
                digits.push(digit);
                total += validate_node(child, level + 1, config, strict);
            }
            assert!(digits.windows(2).all(|w| w[0] < w[1]), "children out of order");
            total
        }
    };
    assert_eq!(node.count, count, "cached count must match subtree");
    count
}

fn validate_tree<V>(t: &RawTrie<V>) {
    validate_tree_with(t, true);
}

fn validate_tree_with<V>(t: &RawTrie<V>, strict: bool) {
    match t.root.as_deref() {
        Some(root) => {
            let count = validate_node(root, 0, &t.config, strict);
            assert!(count > 0, "empty root must be released");
            assert_eq!(
                t.memory.used(),
                root.total_footprint(),
                "memory counter must equal the sum of node footprints"
            );
        }
        None => assert_eq!(t.memory.used(), 0, "empty trie must own no memory"),
    }
}

/// Threshold sets every test runs under. Results must not depend on the choice.
#[derive(Clone, Copy, Debug, Arbitrary)]
enum Layout {
    Default,
    Tight,
    Small,
    NoFull,
}

impl Layout {
    fn config(self) -> Config {
        match self {
            Layout::Default => Config::default(),
            Layout::Tight => Config::default().with_thresholds(2, 0, 3, 1),
            Layout::Small => Config::default().with_thresholds(4, 2, 8, 5),
            Layout::NoFull => Config::default().with_thresholds(16, 8, 256, 128),
        }
    }
}

#[derive(Clone, Debug)]
enum Op {
    Insert(u64, u64),
    Remove(u64),
    Get(u64),
    First(u64),
    Last(u64),
    Next(u64),
    Prev(u64),
    CountRange(u64, u64),
    ByCount(u64),
    Free,
}

fn key_strategy() -> impl Strategy<Value = u64> + Clone {
    // Dense low keys fill whole levels; shifted keys share long prefixes and
    // split them at different depths.
    prop_oneof![
        4 => 0u64..600,
        3 => (0u64..48, 0u32..8).prop_map(|(k, shift)| (k << (shift * 8)) | 0x0100_0000_0000_0000),
        2 => any::<u64>(),
        1 => prop_oneof![Just(0u64), Just(1), Just(u64::MAX - 1), Just(u64::MAX)],
    ]
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let key = key_strategy();
    let op = prop_oneof![
        40 => (key.clone(), any::<u64>()).prop_map(|(k, v)| Op::Insert(k, v)),
        25 => key.clone().prop_map(Op::Remove),
        6 => key.clone().prop_map(Op::Get),
        5 => key.clone().prop_map(Op::First),
        5 => key.clone().prop_map(Op::Last),
        5 => key.clone().prop_map(Op::Next),
        5 => key.clone().prop_map(Op::Prev),
        5 => (key.clone(), key.clone()).prop_map(|(a, b)| Op::CountRange(a, b)),
        3 => (0u64..700).prop_map(Op::ByCount),
        1 => Just(Op::Free),
    ];
    prop::collection::vec(op, 0..=1000)
}

fn model_first(m: &BTreeMap<u64, u64>, key: u64) -> Option<(u64, u64)> {
    m.range(key..).next().map(|(k, v)| (*k, *v))
}

fn model_last(m: &BTreeMap<u64, u64>, key: u64) -> Option<(u64, u64)> {
    m.range(..=key).next_back().map(|(k, v)| (*k, *v))
}

fn model_count(m: &BTreeMap<u64, u64>, low: u64, high: u64) -> u64 {
    if low > high {
        0
    } else {
        m.range(low..=high).count() as u64
    }
}

fn copied(entry: Option<(u64, &u64)>) -> Option<(u64, u64)> {
    entry.map(|(k, v)| (k, *v))
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        max_shrink_iters: 20_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_map_equivalence(layout in any::<Layout>(), ops in ops_strategy()) {
        let mut t: TrieMap<u64> = TrieMap::with_config(layout.config()).unwrap();
        let mut m: BTreeMap<u64, u64> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    prop_assert_eq!(t.insert(key, value).unwrap(), m.insert(key, value));
                }
                Op::Remove(key) => {
                    prop_assert_eq!(t.remove(key), m.remove(&key));
                }
                Op::Get(key) => {
                    prop_assert_eq!(t.get(key).copied(), m.get(&key).copied());
                }
                Op::First(key) => {
                    prop_assert_eq!(copied(t.first(key)), model_first(&m, key));
                }
                Op::Last(key) => {
                    prop_assert_eq!(copied(t.last(key)), model_last(&m, key));
                }
                Op::Next(key) => {
                    let expected = key.checked_add(1).and_then(|k| model_first(&m, k));
                    prop_assert_eq!(copied(t.next(key)), expected);
                }
                Op::Prev(key) => {
                    let expected = key.checked_sub(1).and_then(|k| model_last(&m, k));
                    prop_assert_eq!(copied(t.prev(key)), expected);
                }
                Op::CountRange(low, high) => {
                    prop_assert_eq!(t.count_range(low, high), model_count(&m, low, high));
                }
                Op::ByCount(n) => {
                    let expected = n
                        .checked_sub(1)
                        .and_then(|i| m.iter().nth(i as usize))
                        .map(|(k, v)| (*k, *v));
                    prop_assert_eq!(copied(t.by_count(n)), expected);
                }
                Op::Free => {
                    t.free();
                    m.clear();
                    prop_assert_eq!(t.memory_used(), 0);
                }
            }

            prop_assert_eq!(t.count_all(), m.len() as u64);
        }

        validate_tree(&t.trie);
        let got: Vec<(u64, u64)> = t.iter().map(|(k, v)| (k, *v)).collect();
        let expected: Vec<(u64, u64)> = m.iter().map(|(k, v)| (*k, *v)).collect();
        prop_assert_eq!(got, expected);
        let got_rev: Vec<u64> = t.keys().rev().collect();
        let expected_rev: Vec<u64> = m.keys().rev().copied().collect();
        prop_assert_eq!(got_rev, expected_rev);
    }

    #[test]
    fn prop_set_equivalence(layout in any::<Layout>(), ops in ops_strategy()) {
        let mut t = TrieSet::with_config(layout.config()).unwrap();
        let mut m: BTreeSet<u64> = BTreeSet::new();

        for op in ops {
            match op {
                Op::Insert(key, _) => {
                    prop_assert_eq!(t.set(key).unwrap(), m.insert(key));
                }
                Op::Remove(key) => {
                    prop_assert_eq!(t.unset(key), m.remove(&key));
                }
                Op::Get(key) => {
                    prop_assert_eq!(t.test(key), m.contains(&key));
                }
                Op::First(key) => {
                    prop_assert_eq!(t.first(key), m.range(key..).next().copied());
                }
                Op::Last(key) => {
                    prop_assert_eq!(t.last(key), m.range(..=key).next_back().copied());
                }
                Op::Next(key) | Op::Prev(key) => {
                    let above = key.checked_add(1).and_then(|k| m.range(k..).next().copied());
                    let below = key.checked_sub(1).and_then(|k| m.range(..=k).next_back().copied());
                    prop_assert_eq!(t.next(key), above);
                    prop_assert_eq!(t.prev(key), below);
                }
                Op::CountRange(low, high) => {
                    let expected = if low > high { 0 } else { m.range(low..=high).count() as u64 };
                    prop_assert_eq!(t.count_range(low, high), expected);
                    prop_assert_eq!(t.range(low..=high).len() as u64, expected);
                }
                Op::ByCount(n) => {
                    let expected = n.checked_sub(1).and_then(|i| m.iter().nth(i as usize).copied());
                    prop_assert_eq!(t.by_count(n), expected);
                }
                Op::Free => {
                    t.free();
                    m.clear();
                }
            }

            prop_assert_eq!(t.count_all(), m.len() as u64);
        }

        validate_tree(&t.trie);
        prop_assert!(t.iter().eq(m.iter().copied()));
        prop_assert!(t.iter().rev().eq(m.iter().rev().copied()));
    }

    #[test]
    fn prop_layouts_agree(ops in ops_strategy()) {
        let layouts = [Layout::Default, Layout::Tight, Layout::Small, Layout::NoFull];
        let mut sets: Vec<TrieSet> = layouts
            .iter()
            .map(|layout| TrieSet::with_config(layout.config()).unwrap())
            .collect();

        for op in ops {
            match op {
                Op::Insert(key, _) => {
                    let added: Vec<bool> = sets.iter_mut().map(|s| s.set(key).unwrap()).collect();
                    prop_assert!(added.windows(2).all(|w| w[0] == w[1]));
                }
                Op::Remove(key) => {
                    let removed: Vec<bool> = sets.iter_mut().map(|s| s.unset(key)).collect();
                    prop_assert!(removed.windows(2).all(|w| w[0] == w[1]));
                }
                _ => {}
            }
        }

        for s in &sets {
            validate_tree(&s.trie);
        }
        let reference: Vec<u64> = sets[0].iter().collect();
        for s in &sets[1..] {
            prop_assert_eq!(s.iter().collect::<Vec<_>>(), reference.clone());
            prop_assert_eq!(s.count_all(), sets[0].count_all());
        }
    }

    #[test]
    fn prop_memory_limit_is_atomic(
        layout in any::<Layout>(),
        limit in 256u64..8192,
        ops in ops_strategy(),
    ) {
        let config = layout.config().with_memory_limit(limit);
        let mut t: TrieMap<u64> = TrieMap::with_config(config).unwrap();
        let mut m: BTreeMap<u64, u64> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(key, value) => match t.insert(key, value) {
                    Ok(old) => prop_assert_eq!(old, m.insert(key, value)),
                    Err(err) => {
                        prop_assert!(err.is_allocation_failure());
                        prop_assert!(!m.contains_key(&key));
                        prop_assert_eq!(t.get(key), None);
                    }
                },
                Op::Remove(key) => {
                    prop_assert_eq!(t.remove(key), m.remove(&key));
                }
                _ => {}
            }

            prop_assert!(t.memory_used() <= limit);
            prop_assert_eq!(t.count_all(), m.len() as u64);
        }

        validate_tree_with(&t.trie, false);
        prop_assert!(t.iter().map(|(k, v)| (k, *v)).eq(m.into_iter()));
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

/// Keys that split prefixes at several depths and share final digits.
fn small_key_set() -> Vec<u64> {
    vec![
        0x0000_0000_0000_0001,
        0x0000_0000_0000_0002,
        0x0000_0000_0001_0001,
        0x0000_0100_0000_0001,
        0x0100_0000_0000_0000,
        0xff00_0000_0000_0001,
        u64::MAX,
    ]
}

#[test]
fn exhaustive_insert_order_small_set() {
    let keys = small_key_set();

    for_each_permutation(&keys, |perm| {
        let mut t: RawTrie<u64> = RawTrie::new(Config::default().with_thresholds(2, 0, 3, 1));
        let mut m: BTreeMap<u64, u64> = BTreeMap::new();

        for (i, k) in perm.into_iter().enumerate() {
            let v = i as u64;
            assert_eq!(t.insert(k, v).unwrap(), m.insert(k, v));
            validate_tree(&t);
        }

        for (n, (k, v)) in m.iter().enumerate() {
            assert_eq!(t.select(n as u64 + 1), Some((*k, v)));
            assert_eq!(t.rank(*k), n as u64 + 1);
        }
        assert_eq!(t.first(0).map(|(k, _)| k), m.keys().next().copied());
    });
}

#[test]
fn exhaustive_remove_order_small_set() {
    let keys = small_key_set();

    // Insert in a fixed order, then remove in all permutations.
    let mut base_trie: RawTrie<u64> = RawTrie::new(Config::default().with_thresholds(2, 0, 3, 1));
    let mut base_map: BTreeMap<u64, u64> = BTreeMap::new();
    for (i, &k) in keys.iter().enumerate() {
        let v = i as u64;
        assert_eq!(base_trie.insert(k, v).unwrap(), base_map.insert(k, v));
    }
    validate_tree(&base_trie);

    for_each_permutation(&keys, |perm| {
        let mut t = base_trie.clone();
        let mut m = base_map.clone();
        validate_tree(&t);

        for k in perm {
            assert_eq!(t.remove(k), m.remove(&k));
            assert_eq!(t.len(), m.len() as u64);
            validate_tree(&t);
            assert_eq!(
                t.last(u64::MAX).map(|(k, _)| k),
                m.keys().next_back().copied()
            );
        }
        assert_eq!(t.len(), 0);
        assert!(t.root.is_none());
        assert_eq!(t.memory_used(), 0);
    });
}

#[test]
fn exhaustive_dense_level_across_thresholds() {
    // Fill one leaf past every threshold and drain it again.
    for config in [
        Config::default(),
        Config::default().with_thresholds(2, 0, 3, 1),
        Config::default().with_thresholds(4, 2, 8, 5),
    ] {
        let mut t: RawTrie<()> = RawTrie::new(config);
        for d in 0..=255u64 {
            t.insert(0xabcd_0000_0000_0000 | d, ()).unwrap();
            validate_tree(&t);
        }
        assert_eq!(t.root.as_deref().map(Node::repr), Some(Repr::Full));
        for d in (0..=255u64).rev() {
            assert_eq!(t.rank(0xabcd_0000_0000_0000 | d), d + 1);
            assert!(t.remove(0xabcd_0000_0000_0000 | d).is_some());
            validate_tree(&t);
        }
        assert!(t.root.is_none());
    }
}
