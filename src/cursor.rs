use crate::map::Map;
use std::{
    cmp::min,
    fmt::{self, Debug, Formatter},
    ops::{Add, Sub},
};

/// A cursor into one version of a [`Map`](crate::map::Map): an owned
/// O(1) copy of the handle paired with a sorted position. Dereference
/// is a rank select descent, O(log n); moving the cursor only adjusts
/// the position, O(1).
///
/// Because the underlying version can never change, a cursor stays
/// valid for as long as it exists. Inserting into or erasing from
/// other versions of the map does not invalidate it, and any number
/// of threads may read through cursors into the same version
/// concurrently.
///
/// `rank == map.len()` is the end position; dereferencing it yields
/// None.
///
/// # Examples
/// ```
/// use immutable_rankmap::map::Map;
///
/// let m: Map<i32, &str> = vec![(1, "a"), (2, "b"), (3, "c")].into_iter().collect();
/// let mut c = m.cursor(0);
/// assert_eq!(c.key_value(), Some((&1, &"a")));
/// c.move_next();
/// assert_eq!(c.key_value(), Some((&2, &"b")));
/// let c2 = c.clone() + 1;
/// assert_eq!(c2.key_value(), Some((&3, &"c")));
/// assert_eq!(&c2 - &c, 1);
/// ```
#[derive(Clone)]
pub struct Cursor<K: Ord + Clone, V: Clone> {
    map: Map<K, V>,
    rank: usize,
}

impl<K, V> Cursor<K, V>
where
    K: Ord + Clone,
    V: Clone,
{
    pub(crate) fn new(map: &Map<K, V>, rank: usize) -> Self {
        Cursor {
            map: map.clone(),
            rank,
        }
    }

    /// the sorted position this cursor points at
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// the version of the map this cursor reads from
    pub fn map(&self) -> &Map<K, V> {
        &self.map
    }

    /// true if the cursor sits at the end position
    pub fn is_end(&self) -> bool {
        self.rank >= self.map.len()
    }

    /// the binding at the cursor's position, None at or past the end
    pub fn key_value(&self) -> Option<(&K, &V)> {
        self.map.get_at(self.rank)
    }

    /// the key at the cursor's position, None at or past the end
    pub fn key(&self) -> Option<&K> {
        self.key_value().map(|(k, _)| k)
    }

    /// the value at the cursor's position, None at or past the end
    pub fn value(&self) -> Option<&V> {
        self.key_value().map(|(_, v)| v)
    }

    /// advance to the next sorted position, stopping at the end. O(1)
    pub fn move_next(&mut self) {
        if self.rank < self.map.len() {
            self.rank += 1
        }
    }

    /// step back to the previous sorted position, stopping at the
    /// front. O(1)
    pub fn move_prev(&mut self) {
        self.rank = self.rank.saturating_sub(1)
    }

    /// jump to an arbitrary sorted position in the same version
    pub fn seek(&mut self, rank: usize) {
        self.rank = min(rank, self.map.len())
    }

    /// the signed distance in sorted positions from other to self,
    /// meaningful when both cursors read the same version
    pub fn distance(&self, other: &Self) -> isize {
        self.rank as isize - other.rank as isize
    }
}

impl<K, V> Add<usize> for Cursor<K, V>
where
    K: Ord + Clone,
    V: Clone,
{
    type Output = Cursor<K, V>;
    fn add(mut self, rhs: usize) -> Self::Output {
        self.rank = min(self.rank + rhs, self.map.len());
        self
    }
}

impl<K, V> Sub<usize> for Cursor<K, V>
where
    K: Ord + Clone,
    V: Clone,
{
    type Output = Cursor<K, V>;
    fn sub(mut self, rhs: usize) -> Self::Output {
        self.rank = self.rank.saturating_sub(rhs);
        self
    }
}

impl<'a, K, V> Sub for &'a Cursor<K, V>
where
    K: Ord + Clone,
    V: Clone,
{
    type Output = isize;
    fn sub(self, rhs: &'a Cursor<K, V>) -> isize {
        self.distance(rhs)
    }
}

/// Cursors are equal when they point at the same position of the same
/// version. Version identity is the root node, not map contents; two
/// structurally equal maps built separately have distinct cursors.
impl<K, V> PartialEq for Cursor<K, V>
where
    K: Ord + Clone,
    V: Clone,
{
    fn eq(&self, other: &Cursor<K, V>) -> bool {
        self.rank == other.rank && self.map.root_ptr_eq(&other.map)
    }
}

impl<K, V> Eq for Cursor<K, V>
where
    K: Ord + Clone,
    V: Clone,
{
}

impl<K, V> Debug for Cursor<K, V>
where
    K: Ord + Clone + Debug,
    V: Clone + Debug,
{
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("rank", &self.rank)
            .field("at", &self.key_value())
            .finish()
    }
}
