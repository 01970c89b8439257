use crate::error::Error;
use crate::map::Map;
use proptest::prelude::*;
use rand::{seq::SliceRandom, Rng};
use std::collections::{BTreeMap, HashSet};
use std::ops::Bound;

const STRSIZE: usize = 10;

trait Rand: Sized {
    fn rand<R: Rng>(r: &mut R) -> Self;
}

impl Rand for String {
    fn rand<R: Rng>(r: &mut R) -> Self {
        let mut s = String::new();
        for _ in 0..STRSIZE {
            s.push(r.gen())
        }
        s
    }
}

impl Rand for i32 {
    fn rand<R: Rng>(r: &mut R) -> Self {
        r.gen()
    }
}

fn randvec<T: Rand>(len: usize) -> Vec<T> {
    let mut rng = rand::thread_rng();
    let mut v: Vec<T> = Vec::new();
    for _ in 0..len {
        v.push(T::rand(&mut rng))
    }
    v
}

#[test]
fn test_insert_seq() {
    let (m, added) = Map::new().insert(1, "a");
    assert!(added);
    let (m, added) = m.insert(2, "b");
    assert!(added);
    let (m, added) = m.insert(3, "c");
    assert!(added);
    assert_eq!(m.len(), 3);
    let elts: Vec<(i32, &str)> = (&m).into_iter().map(|(k, v)| (*k, *v)).collect();
    assert_eq!(elts, vec![(1, "a"), (2, "b"), (3, "c")]);
    m.invariant();
}

#[test]
fn test_remove_leaves_old_version_intact() {
    let m: Map<i32, &str> = vec![(1, "a"), (2, "b"), (3, "c")].into_iter().collect();
    let (m2, prev) = m.remove(&2);
    assert_eq!(prev, Some("b"));
    let elts: Vec<(i32, &str)> = (&m2).into_iter().map(|(k, v)| (*k, *v)).collect();
    assert_eq!(elts, vec![(1, "a"), (3, "c")]);
    let elts: Vec<(i32, &str)> = (&m).into_iter().map(|(k, v)| (*k, *v)).collect();
    assert_eq!(elts, vec![(1, "a"), (2, "b"), (3, "c")]);
    assert_eq!(m.len(), 3);
    m.invariant();
    m2.invariant();
}

#[test]
fn test_duplicate_insert_not_added() {
    let (m, _) = Map::new().insert(1, "a");
    let (m2, added) = m.insert(1, "b");
    assert!(!added);
    assert_eq!(m2.len(), 1);
    assert_eq!(m2.get(&1), Some(&"a"));
    // the rejected insert hands back the same version
    assert!(m.root().ptr_eq(m2.root()));
}

#[test]
fn test_insert_or_assign() {
    let (m, prev) = Map::new().insert_or_assign(1, "a");
    assert_eq!(prev, None);
    let (m2, prev) = m.insert_or_assign(1, "b");
    assert_eq!(prev, Some("a"));
    assert_eq!(m2.len(), 1);
    assert_eq!(m.get(&1), Some(&"a"));
    assert_eq!(m2.get(&1), Some(&"b"));
}

#[test]
fn test_remove_absent_key() {
    let m: Map<i32, i32> = (0..10).map(|k| (k, k)).collect();
    let (m2, prev) = m.remove(&42);
    assert_eq!(prev, None);
    assert_eq!(m2.len(), 10);
    assert!(m.root().ptr_eq(m2.root()));
}

#[test]
fn test_insert_remove_rand_invariants() {
    let mut rng = rand::thread_rng();
    let mut keys: Vec<i32> = (0..1000).collect();
    keys.shuffle(&mut rng);
    let mut m: Map<i32, i32> = Map::new();
    let mut model: BTreeMap<i32, i32> = BTreeMap::new();
    for &k in &keys {
        let (m2, added) = m.insert(k, k * 3);
        assert!(added);
        m = m2;
        model.insert(k, k * 3);
        m.invariant();
        assert_eq!(m.len(), model.len());
    }
    for (i, (k, v)) in model.iter().enumerate() {
        assert_eq!(m.get_at(i), Some((k, v)));
        assert_eq!(m.lower_bound(k), i);
        assert_eq!(m.upper_bound(k), i + 1);
        assert_eq!(m.get(k), Some(v));
    }
    keys.shuffle(&mut rng);
    for &k in &keys {
        let (m2, prev) = m.remove(&k);
        assert_eq!(prev, Some(k * 3));
        m = m2;
        model.remove(&k);
        m.invariant();
        assert_eq!(m.get(&k), None);
        assert_eq!(m.len(), model.len());
    }
    assert!(m.is_empty());
}

#[test]
fn test_str_keys() {
    let v = randvec::<String>(500);
    let m: Map<String, String> = v.iter().map(|k| (k.clone(), k.clone())).collect();
    m.invariant();
    for k in &v {
        assert_eq!(m.get(k.as_str()), Some(k));
        assert_eq!(m.get_key(k.as_str()), Some(k));
        assert_eq!(m.get_full(k.as_str()), Some((k, k)));
    }
}

#[test]
fn test_persistence_across_versions() {
    let mut versions: Vec<Map<i32, i32>> = Vec::new();
    let mut m = Map::new();
    for k in 0..100 {
        let (m2, _) = m.insert(k, k);
        versions.push(m2.clone());
        m = m2;
    }
    for (i, v) in versions.iter().enumerate() {
        assert_eq!(v.len(), i + 1);
        let keys: Vec<i32> = v.into_iter().map(|(k, _)| *k).collect();
        let expected: Vec<i32> = (0..=(i as i32)).collect();
        assert_eq!(keys, expected);
        v.invariant();
    }
}

#[test]
fn test_structural_sharing() {
    let m: Map<i32, i32> = (0..512).map(|k| (k * 2, k)).collect();
    let (m2, added) = m.insert(777, 0);
    assert!(added);
    let mut old = HashSet::new();
    m.root().for_each_node(&mut |p| {
        old.insert(p);
    });
    let mut fresh = 0;
    let mut shared = 0;
    m2.root().for_each_node(&mut |p| {
        if old.contains(&p) {
            shared += 1
        } else {
            fresh += 1
        }
    });
    // only the rebuilt search path is new, everything else is the
    // same nodes the old version holds
    assert!(fresh <= 40, "too many fresh nodes: {}", fresh);
    assert_eq!(shared + fresh, 513);
}

#[test]
fn test_rank_round_trip() {
    let v = randvec::<i32>(1000);
    let m: Map<i32, i32> = v.iter().map(|&k| (k, k)).collect();
    let sorted: Vec<(&i32, &i32)> = (&m).into_iter().collect();
    for (i, &kv) in sorted.iter().enumerate() {
        assert_eq!(m.get_at(i), Some(kv));
    }
    assert_eq!(m.get_at(m.len()), None);
}

#[test]
fn test_select_and_at() {
    let m: Map<i32, i32> = (0..5).map(|k| (k, k * 10)).collect();
    assert_eq!(m.select(0), Ok((&0, &0)));
    assert_eq!(m.select(4), Ok((&4, &40)));
    assert_eq!(m.select(5), Err(Error::RankOutOfRange { rank: 5, len: 5 }));
    assert_eq!(m.at(&3), Ok(&30));
    assert_eq!(m.at(&9), Err(Error::KeyNotFound));
}

#[test]
fn test_bounds() {
    // keys 0, 2, 4, ..., 18
    let m: Map<i32, i32> = (0..10).map(|k| (k * 2, k)).collect();
    assert_eq!(m.lower_bound(&5), 3);
    assert_eq!(m.lower_bound(&4), 2);
    assert_eq!(m.upper_bound(&4), 3);
    assert_eq!(m.upper_bound(&5), 3);
    assert_eq!(m.equal_range(&4), (2, 3));
    assert_eq!(m.equal_range(&5), (3, 3));
    assert_eq!(m.lower_bound(&-1), 0);
    assert_eq!(m.lower_bound(&100), 10);
}

#[test]
fn test_remove_at() {
    let m: Map<i32, i32> = (0..10).map(|k| (k, k)).collect();
    let (m2, kv) = m.remove_at(3).unwrap();
    assert_eq!(kv, (3, 3));
    assert_eq!(m2.len(), 9);
    assert_eq!(m2.get(&3), None);
    assert_eq!(m.len(), 10);
    m2.invariant();
    assert_eq!(
        m.remove_at(10),
        Err(Error::RankOutOfRange { rank: 10, len: 10 })
    );
}

#[test]
fn test_remove_range() {
    let m: Map<i32, i32> = (0..10).map(|k| (k, k)).collect();
    let m2 = m.remove_range(2..5).unwrap();
    let keys: Vec<i32> = (&m2).into_iter().map(|(k, _)| *k).collect();
    assert_eq!(keys, vec![0, 1, 5, 6, 7, 8, 9]);
    m2.invariant();
    assert_eq!(m.len(), 10);
    let m3 = m.remove_range(0..10).unwrap();
    assert!(m3.is_empty());
    let m4 = m.remove_range(4..4).unwrap();
    assert_eq!(m4.len(), 10);
    assert!(m.remove_range(5..11).is_err());
}

#[test]
fn test_range_iteration() {
    let m: Map<i32, i32> = (0..100).map(|k| (k, k)).collect();
    let v: Vec<i32> = m
        .range(Bound::Excluded(10), Bound::Included(20))
        .map(|(k, _)| *k)
        .collect();
    let expected: Vec<i32> = (11..=20).collect();
    assert_eq!(v, expected);
    let r: Vec<i32> = m
        .range(Bound::Included(10), Bound::Excluded(20))
        .rev()
        .map(|(k, _)| *k)
        .collect();
    let expected: Vec<i32> = (10..20).rev().collect();
    assert_eq!(r, expected);
    let empty: Vec<i32> = m
        .range(Bound::Included(50), Bound::Excluded(50))
        .map(|(k, _)| *k)
        .collect();
    assert!(empty.is_empty());
}

#[test]
fn test_double_ended_iteration() {
    let m: Map<i32, i32> = (0..100).map(|k| (k, k)).collect();
    let mut it = (&m).into_iter();
    assert_eq!(it.next(), Some((&0, &0)));
    assert_eq!(it.next_back(), Some((&99, &99)));
    assert_eq!(it.next_back(), Some((&98, &98)));
    // the two ends never yield the same element twice
    assert_eq!(it.count(), 97);
}

#[test]
fn test_cursor() {
    let m: Map<i32, &str> = vec![(1, "a"), (2, "b"), (3, "c")].into_iter().collect();
    let mut c = m.cursor(0);
    assert_eq!(c.key_value(), Some((&1, &"a")));
    c.move_next();
    assert_eq!(c.key_value(), Some((&2, &"b")));
    assert_eq!(c.key(), Some(&2));
    assert_eq!(c.value(), Some(&"b"));
    c.move_prev();
    assert_eq!(c.key_value(), Some((&1, &"a")));
    c.move_prev();
    assert_eq!(c.rank(), 0);
    let end = m.cursor(m.len());
    assert!(end.is_end());
    assert_eq!(end.key_value(), None);
    let c2 = m.cursor(0) + 2;
    assert_eq!(c2.key_value(), Some((&3, &"c")));
    assert_eq!(&c2 - &m.cursor(0), 2);
    assert_eq!((c2 - 1).key(), Some(&2));
    c.seek(2);
    assert_eq!(c.key(), Some(&3));
}

#[test]
fn test_cursor_equality_and_validity() {
    let m: Map<i32, i32> = (0..10).map(|k| (k, k)).collect();
    assert_eq!(m.cursor(3), m.cursor(3));
    assert_ne!(m.cursor(3), m.cursor(4));
    // an O(1) handle copy is the same version
    let shared = m.clone();
    assert_eq!(m.cursor(3), shared.cursor(3));
    // a mutated version is not, and the old cursor keeps reading the
    // old version
    let c = m.cursor(1);
    let (m2, _) = m.insert(-1, -1);
    assert_ne!(c, m2.cursor(1));
    assert_eq!(c.key_value(), Some((&1, &1)));
    assert_eq!(m2.cursor(1).key_value(), Some((&0, &0)));
    // structurally equal maps built separately are distinct versions
    let other: Map<i32, i32> = (0..10).map(|k| (k, k)).collect();
    assert_eq!(m, other);
    assert_ne!(m.cursor(3), other.cursor(3));
}

#[test]
fn test_equality_and_ordering() {
    let a: Map<i32, i32> = vec![(1, 1), (2, 2)].into_iter().collect();
    let b: Map<i32, i32> = vec![(1, 1), (3, 3)].into_iter().collect();
    let c: Map<i32, i32> = vec![(2, 2), (1, 1)].into_iter().collect();
    assert!(a < b);
    assert!(b > a);
    // equality is structural, over the in order sequence
    assert_eq!(a, c);
    assert_ne!(a, b);
    let d: Map<i32, i32> = vec![(1, 1)].into_iter().collect();
    assert!(d < a);
}

#[test]
fn test_swap_and_clear() {
    let mut a: Map<i32, i32> = (0..5).map(|k| (k, k)).collect();
    let mut b: Map<i32, i32> = (10..12).map(|k| (k, k)).collect();
    a.swap(&mut b);
    assert_eq!(a.len(), 2);
    assert_eq!(b.len(), 5);
    assert_eq!(a.get(&10), Some(&10));
    assert_eq!(b.get(&0), Some(&0));
    let cleared = b.clear();
    assert!(cleared.is_empty());
    assert_eq!(b.len(), 5);
}

#[test]
fn test_index() {
    let m: Map<String, i32> = vec![(String::from("k"), 7)].into_iter().collect();
    assert_eq!(m["k"], 7);
}

#[test]
#[should_panic(expected = "element not found for key")]
fn test_index_missing_key_panics() {
    let m: Map<i32, i32> = Map::new();
    let _ = m[&1];
}

proptest! {
    #[test]
    fn prop_model_check(ops in proptest::collection::vec((0u8..4u8, 0i32..64i32), 1..256)) {
        let mut model: BTreeMap<i32, i32> = BTreeMap::new();
        let mut m: Map<i32, i32> = Map::new();
        for (op, k) in ops {
            match op {
                0 => {
                    let (m2, added) = m.insert(k, k);
                    prop_assert_eq!(added, !model.contains_key(&k));
                    if added {
                        model.insert(k, k);
                    }
                    m = m2;
                }
                1 => {
                    let (m2, prev) = m.insert_or_assign(k, -k);
                    prop_assert_eq!(prev, model.insert(k, -k));
                    m = m2;
                }
                2 => {
                    let (m2, prev) = m.remove(&k);
                    prop_assert_eq!(prev, model.remove(&k));
                    m = m2;
                }
                _ => prop_assert_eq!(m.get(&k), model.get(&k)),
            }
            prop_assert_eq!(m.len(), model.len());
        }
        m.invariant();
        let got: Vec<(i32, i32)> = (&m).into_iter().map(|(k, v)| (*k, *v)).collect();
        let want: Vec<(i32, i32)> = model.iter().map(|(k, v)| (*k, *v)).collect();
        prop_assert_eq!(&got, &want);
        for (i, kv) in want.iter().enumerate() {
            prop_assert_eq!(m.get_at(i), Some((&kv.0, &kv.1)));
        }
        prop_assert_eq!(m.get_at(m.len()), None);
    }

    #[test]
    fn prop_bounds_match_model(mut keys in proptest::collection::vec(0i32..128i32, 1..64), probe in 0i32..128i32) {
        keys.sort_unstable();
        keys.dedup();
        let m: Map<i32, ()> = keys.iter().map(|&k| (k, ())).collect();
        let lower = keys.iter().take_while(|&&k| k < probe).count();
        let upper = keys.iter().take_while(|&&k| k <= probe).count();
        prop_assert_eq!(m.lower_bound(&probe), lower);
        prop_assert_eq!(m.upper_bound(&probe), upper);
        prop_assert_eq!(m.equal_range(&probe), (lower, upper));
    }
}

#[cfg(feature = "serde")]
#[test]
fn test_serde_round_trip() {
    let m: Map<i32, String> = (0..50).map(|k| (k, k.to_string())).collect();
    let s = serde_json::to_string(&m).unwrap();
    let m2: Map<i32, String> = serde_json::from_str(&s).unwrap();
    assert_eq!(m, m2);
    m2.invariant();
}
