use crate::cursor::Cursor;
use crate::error::Error;
pub use crate::tree::Iter;
use crate::tree::Tree;
use std::{
    borrow::Borrow,
    cmp::{Eq, Ord, Ordering, PartialEq, PartialOrd},
    default::Default,
    fmt::{self, Debug, Formatter},
    hash::{Hash, Hasher},
    iter::FromIterator,
    mem,
    ops::{Bound, Index, Range},
};

/// A persistent ordered map. Every mutating method leaves `self`
/// untouched and returns a new version of the map; both versions stay
/// fully usable, and they share every subtree the mutation did not
/// rebuild. Cloning a map is O(1), it copies a reference to the root,
/// never the tree.
///
/// The tree is weight balanced, rebalancing decisions are driven by
/// subtree element counts, and every node carries the size of its
/// subtree. That size augmentation is what makes rank operations
/// possible: any element can be fetched by its sorted position, and
/// the sorted position of any key can be computed, each in O(log n).
///
/// Because no node is ever mutated after it is published, any number
/// of threads may read the same version concurrently without locks,
/// and writers never disturb readers; a writer only allocates new
/// nodes along the O(log n) search path.
///
/// Since mutations copy that path, clone needs to be fast for your
/// key and value types. If they are expensive to clone, wrap them in
/// Arc.
///
/// # Examples
/// ```
/// use immutable_rankmap::map::Map;
///
/// let m = Map::new()
///     .insert_or_assign(String::from("1"), 1).0
///     .insert_or_assign(String::from("2"), 2).0
///     .insert_or_assign(String::from("3"), 3).0;
///
/// assert_eq!(m.get("1"), Some(&1));
/// assert_eq!(m.get("2"), Some(&2));
/// assert_eq!(m.get("3"), Some(&3));
/// assert_eq!(m.get("4"), None);
///
/// for (k, v) in &m {
///     println!("key {}, val: {}", k, v)
/// }
/// ```
#[derive(Clone)]
pub struct Map<K: Ord + Clone, V: Clone> {
    len: usize,
    root: Tree<K, V>,
}

impl<K, V> Hash for Map<K, V>
where
    K: Hash + Ord + Clone,
    V: Hash + Clone,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.root.hash(state)
    }
}

impl<K, V> Default for Map<K, V>
where
    K: Ord + Clone,
    V: Clone,
{
    fn default() -> Map<K, V> {
        Map::new()
    }
}

impl<K, V> PartialEq for Map<K, V>
where
    K: PartialEq + Ord + Clone,
    V: PartialEq + Clone,
{
    fn eq(&self, other: &Map<K, V>) -> bool {
        self.len == other.len && self.root == other.root
    }
}

impl<K, V> Eq for Map<K, V>
where
    K: Eq + Ord + Clone,
    V: Eq + Clone,
{
}

impl<K, V> PartialOrd for Map<K, V>
where
    K: Ord + Clone,
    V: PartialOrd + Clone,
{
    fn partial_cmp(&self, other: &Map<K, V>) -> Option<Ordering> {
        self.root.partial_cmp(&other.root)
    }
}

impl<K, V> Ord for Map<K, V>
where
    K: Ord + Clone,
    V: Ord + Clone,
{
    fn cmp(&self, other: &Map<K, V>) -> Ordering {
        self.root.cmp(&other.root)
    }
}

impl<K, V> Debug for Map<K, V>
where
    K: Debug + Ord + Clone,
    V: Debug + Clone,
{
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        self.root.fmt(f)
    }
}

impl<'a, Q, K, V> Index<&'a Q> for Map<K, V>
where
    Q: ?Sized + Ord,
    K: Ord + Clone + Borrow<Q>,
    V: Clone,
{
    type Output = V;
    fn index(&self, k: &Q) -> &V {
        self.get(k).expect("element not found for key")
    }
}

impl<K, V> FromIterator<(K, V)> for Map<K, V>
where
    K: Ord + Clone,
    V: Clone,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Map::new().insert_many(iter)
    }
}

impl<'a, K, V> IntoIterator for &'a Map<K, V>
where
    K: 'a + Borrow<K> + Ord + Clone,
    V: 'a + Clone,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.root.into_iter()
    }
}

impl<K, V> Map<K, V>
where
    K: Ord + Clone,
    V: Clone,
{
    /// Create a new empty map
    pub fn new() -> Self {
        Map {
            len: 0,
            root: Tree::new(),
        }
    }

    /// Return a new map with every binding in elts inserted,
    /// overwriting any binding already present for the same key. This
    /// is what FromIterator uses.
    pub fn insert_many<E: IntoIterator<Item = (K, V)>>(&self, elts: E) -> Self {
        let mut root = self.root.clone();
        for (k, v) in elts {
            root = root.insert_or_assign(k, v).0;
        }
        let len = root.len();
        Map { len, root }
    }

    /// Return a new map with (k, v) inserted, unless k is already
    /// bound, in which case the original map is returned
    /// unchanged. The flag is true when a new binding was added. Runs
    /// in log(N) time and allocates log(N) nodes; everything off the
    /// search path is shared with the old map.
    ///
    /// # Examples
    /// ```
    /// use immutable_rankmap::map::Map;
    ///
    /// let (m, added) = Map::new().insert(1, "a");
    /// assert!(added);
    /// let (m2, added) = m.insert(1, "b");
    /// assert!(!added);
    /// assert_eq!(m2.get(&1), Some(&"a"));
    /// assert_eq!(m2.len(), 1);
    /// ```
    pub fn insert(&self, k: K, v: V) -> (Self, bool) {
        let (root, added) = self.root.insert(k, v);
        let len = if added { self.len + 1 } else { self.len };
        (Map { len, root }, added)
    }

    /// Return a new map with (k, v) inserted, replacing any previous
    /// binding for k, which is returned. The old map still holds the
    /// old binding. This is the upsert half of what a mutable map's
    /// index assignment would do; a persistent map can't hand out a
    /// mutable slot into a shared node, so lookup and assignment are
    /// separate operations.
    ///
    /// # Examples
    /// ```
    /// use immutable_rankmap::map::Map;
    ///
    /// let (m, prev) = Map::new().insert_or_assign(1, "a");
    /// assert_eq!(prev, None);
    /// let (m2, prev) = m.insert_or_assign(1, "b");
    /// assert_eq!(prev, Some("a"));
    /// assert_eq!(m.get(&1), Some(&"a"));
    /// assert_eq!(m2.get(&1), Some(&"b"));
    /// ```
    pub fn insert_or_assign(&self, k: K, v: V) -> (Self, Option<V>) {
        let (root, prev) = self.root.insert_or_assign(k, v);
        let len = if prev.is_some() { self.len } else { self.len + 1 };
        (Map { len, root }, prev)
    }

    /// Lookup the value bound to k. Runs in log(N) time and constant
    /// space.
    pub fn get<'a, Q: ?Sized + Ord>(&'a self, k: &Q) -> Option<&'a V>
    where
        K: Borrow<Q>,
    {
        self.root.get(k)
    }

    /// Lookup the key bound for k. Runs in log(N) time and constant
    /// space.
    pub fn get_key<'a, Q: ?Sized + Ord>(&'a self, k: &Q) -> Option<&'a K>
    where
        K: Borrow<Q>,
    {
        self.root.get_key(k)
    }

    /// Lookup both the key and the value bound to k. Runs in log(N)
    /// time and constant space.
    pub fn get_full<'a, Q: ?Sized + Ord>(&'a self, k: &Q) -> Option<(&'a K, &'a V)>
    where
        K: Borrow<Q>,
    {
        self.root.get_full(k)
    }

    /// Lookup the value bound to k, failing with
    /// [`Error::KeyNotFound`] if there is no binding.
    ///
    /// # Examples
    /// ```
    /// use immutable_rankmap::{error::Error, map::Map};
    ///
    /// let (m, _) = Map::new().insert(1, "a");
    /// assert_eq!(m.at(&1), Ok(&"a"));
    /// assert_eq!(m.at(&2), Err(Error::KeyNotFound));
    /// ```
    pub fn at<'a, Q: ?Sized + Ord>(&'a self, k: &Q) -> Result<&'a V, Error>
    where
        K: Borrow<Q>,
    {
        self.root.get(k).ok_or(Error::KeyNotFound)
    }

    /// The binding at sorted position rank (0 based), None if rank is
    /// out of range. Runs in log(N) time by descending on subtree
    /// sizes.
    ///
    /// # Examples
    /// ```
    /// use immutable_rankmap::map::Map;
    ///
    /// let m: Map<i32, i32> = (0..10).map(|k| (k, k * k)).collect();
    /// assert_eq!(m.get_at(3), Some((&3, &9)));
    /// assert_eq!(m.get_at(10), None);
    /// ```
    pub fn get_at(&self, rank: usize) -> Option<(&K, &V)> {
        self.root.get_at(rank)
    }

    /// The binding at sorted position rank, failing with
    /// [`Error::RankOutOfRange`] if rank >= len.
    pub fn select(&self, rank: usize) -> Result<(&K, &V), Error> {
        self.root.get_at(rank).ok_or(Error::RankOutOfRange {
            rank,
            len: self.len,
        })
    }

    /// The sorted position of the first binding with key >= k, equal
    /// to the number of keys strictly less than k. If every key is
    /// less than k this is len. Runs in log(N) time.
    pub fn lower_bound<Q: ?Sized + Ord>(&self, k: &Q) -> usize
    where
        K: Borrow<Q>,
    {
        self.root.rank_lower(k)
    }

    /// The sorted position of the first binding with key > k. Runs in
    /// log(N) time.
    pub fn upper_bound<Q: ?Sized + Ord>(&self, k: &Q) -> usize
    where
        K: Borrow<Q>,
    {
        self.root.rank_upper(k)
    }

    /// The half open rank range of bindings whose key equals k,
    /// (lower_bound(k), upper_bound(k)). Since keys are unique the
    /// range spans at most one position.
    ///
    /// # Examples
    /// ```
    /// use immutable_rankmap::map::Map;
    ///
    /// let m: Map<i32, ()> = vec![1, 3, 5].into_iter().map(|k| (k, ())).collect();
    /// assert_eq!(m.equal_range(&3), (1, 2));
    /// assert_eq!(m.equal_range(&4), (2, 2));
    /// ```
    pub fn equal_range<Q: ?Sized + Ord>(&self, k: &Q) -> (usize, usize)
    where
        K: Borrow<Q>,
    {
        (self.root.rank_lower(k), self.root.rank_upper(k))
    }

    /// Return a new map with the binding for k removed, along with
    /// the removed value. If k was not bound the original map is
    /// returned unchanged and the value is None. Runs in log(N) time
    /// and log(N) space.
    ///
    /// # Examples
    /// ```
    /// use immutable_rankmap::map::Map;
    ///
    /// let m: Map<i32, i32> = (1..=3).map(|k| (k, k)).collect();
    /// let (m2, prev) = m.remove(&2);
    /// assert_eq!(prev, Some(2));
    /// assert_eq!(m2.len(), 2);
    /// // the original version is untouched
    /// assert_eq!(m.len(), 3);
    /// assert_eq!(m.get(&2), Some(&2));
    /// ```
    pub fn remove<Q: ?Sized + Ord>(&self, k: &Q) -> (Self, Option<V>)
    where
        K: Borrow<Q>,
    {
        let (root, prev) = self.root.remove(k);
        let len = if prev.is_some() { self.len - 1 } else { self.len };
        (Map { len, root }, prev)
    }

    /// Return a new map with the binding at sorted position rank
    /// removed, along with the removed pair. Fails with
    /// [`Error::RankOutOfRange`] if rank >= len.
    pub fn remove_at(&self, rank: usize) -> Result<(Self, (K, V)), Error> {
        match self.root.remove_at(rank) {
            Some((root, kv)) => {
                let len = self.len - 1;
                Ok((Map { len, root }, kv))
            }
            None => Err(Error::RankOutOfRange {
                rank,
                len: self.len,
            }),
        }
    }

    /// Return a new map with every binding in the half open rank
    /// range removed. Fails with [`Error::RankOutOfRange`] if the
    /// range does not lie within 0..len. Runs in O(M log N) time for
    /// M removed bindings.
    ///
    /// # Examples
    /// ```
    /// use immutable_rankmap::map::Map;
    ///
    /// let m: Map<i32, i32> = (0..10).map(|k| (k, k)).collect();
    /// let m2 = m.remove_range(2..5).unwrap();
    /// let keys: Vec<i32> = (&m2).into_iter().map(|(k, _)| *k).collect();
    /// assert_eq!(keys, vec![0, 1, 5, 6, 7, 8, 9]);
    /// ```
    pub fn remove_range(&self, range: Range<usize>) -> Result<Self, Error> {
        if range.start > range.end || range.end > self.len {
            return Err(Error::RankOutOfRange {
                rank: range.end,
                len: self.len,
            });
        }
        let mut root = self.root.clone();
        for _ in range.clone() {
            match root.remove_at(range.start) {
                Some((t, _)) => root = t,
                None => break,
            }
        }
        let len = root.len();
        Ok(Map { len, root })
    }

    /// Return a new empty map. Versions built from this one before
    /// the clear are unaffected.
    pub fn clear(&self) -> Self {
        Map::new()
    }

    /// get the number of elements in the map O(1) time and space
    pub fn len(&self) -> usize {
        self.len
    }

    /// true if the map holds no elements
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Swap the contents of two maps. O(1), only the root references
    /// move.
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other)
    }

    /// A cursor into this version of the map at the given sorted
    /// position. rank == len is the end position. The cursor owns an
    /// O(1) copy of the handle, so it stays valid for as long as you
    /// keep it, no matter what is done to other versions.
    pub fn cursor(&self, rank: usize) -> Cursor<K, V> {
        Cursor::new(self, rank)
    }

    /// return an iterator over the subset of elements in the
    /// map that are within the specified range.
    ///
    /// The returned iterator runs in O(log(N) + M) time, and
    /// constant space. N is the number of elements in the
    /// tree, and M is the number of elements you examine.
    ///
    /// if lbound >= ubound the returned iterator will be empty
    ///
    /// # Examples
    /// ```
    /// use immutable_rankmap::map::Map;
    /// use std::ops::Bound;
    ///
    /// let m: Map<i32, i32> = (0..10).map(|k| (k, k)).collect();
    /// let keys: Vec<i32> = m
    ///     .range(Bound::Included(2), Bound::Excluded(5))
    ///     .map(|(k, _)| *k)
    ///     .collect();
    /// assert_eq!(keys, vec![2, 3, 4]);
    /// ```
    pub fn range<'a, Q>(&'a self, lbound: Bound<Q>, ubound: Bound<Q>) -> Iter<'a, Q, K, V>
    where
        Q: Ord,
        K: Borrow<Q>,
    {
        self.root.range(lbound, ubound)
    }

    pub(crate) fn root_ptr_eq(&self, other: &Self) -> bool {
        self.root.ptr_eq(&other.root)
    }

    #[cfg(test)]
    pub(crate) fn root(&self) -> &Tree<K, V> {
        &self.root
    }
}

impl<K, V> Map<K, V>
where
    K: Ord + Clone + Debug,
    V: Clone + Debug,
{
    #[allow(dead_code)]
    pub(crate) fn invariant(&self) -> () {
        self.root.invariant(self.len)
    }
}

#[cfg(feature = "serde")]
mod serde_impls {
    use super::Map;
    use serde::{
        de::{MapAccess, Visitor},
        ser::SerializeMap,
        Deserialize, Deserializer, Serialize, Serializer,
    };
    use std::{fmt, marker::PhantomData};

    impl<K, V> Serialize for Map<K, V>
    where
        K: Serialize + Ord + Clone,
        V: Serialize + Clone,
    {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            let mut map = serializer.serialize_map(Some(self.len()))?;
            for (k, v) in self {
                map.serialize_entry(k, v)?;
            }
            map.end()
        }
    }

    struct MapVisitor<K: Ord + Clone, V: Clone> {
        marker: PhantomData<Map<K, V>>,
    }

    impl<'de, K, V> Visitor<'de> for MapVisitor<K, V>
    where
        K: Deserialize<'de> + Ord + Clone,
        V: Deserialize<'de> + Clone,
    {
        type Value = Map<K, V>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map")
        }

        fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut map = Map::new();
            while let Some((k, v)) = access.next_entry()? {
                map = map.insert_or_assign(k, v).0;
            }
            Ok(map)
        }
    }

    impl<'de, K, V> Deserialize<'de> for Map<K, V>
    where
        K: Deserialize<'de> + Ord + Clone,
        V: Deserialize<'de> + Clone,
    {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_map(MapVisitor {
                marker: PhantomData,
            })
        }
    }
}
