use arrayvec::ArrayVec;
use std::{
    borrow::Borrow,
    cmp::{Eq, Ord, Ordering, PartialEq, PartialOrd},
    default::Default,
    fmt::{self, Debug, Formatter},
    hash::{Hash, Hasher},
    ops::{Bound, Index},
    sync::Arc,
};

// a weight balanced tree of 2^64 elements is at most ~155 levels deep
const MAX_DEPTH: usize = 160;

// weight balance factors. a node is balanced when neither subtree
// holds more than DELTA times the elements of its sibling, and RATIO
// picks between a single and a double rotation during repair.
const DELTA: usize = 3;
const RATIO: usize = 2;

#[derive(Clone, Debug)]
pub(crate) struct Node<K: Ord + Clone, V: Clone> {
    key: K,
    val: V,
    left: Tree<K, V>,
    right: Tree<K, V>,
    size: usize,
}

#[derive(Clone)]
pub(crate) enum Tree<K: Ord + Clone, V: Clone> {
    Empty,
    Node(Arc<Node<K, V>>),
}

impl<K, V> Hash for Tree<K, V>
where
    K: Hash + Ord + Clone,
    V: Hash + Clone,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        for elt in self {
            elt.hash(state)
        }
    }
}

impl<K, V> Default for Tree<K, V>
where
    K: Ord + Clone,
    V: Clone,
{
    fn default() -> Tree<K, V> {
        Tree::Empty
    }
}

impl<K, V> PartialEq for Tree<K, V>
where
    K: PartialEq + Ord + Clone,
    V: PartialEq + Clone,
{
    fn eq(&self, other: &Tree<K, V>) -> bool {
        self.len() == other.len() && self.into_iter().zip(other).all(|(e0, e1)| e0 == e1)
    }
}

impl<K, V> Eq for Tree<K, V>
where
    K: Eq + Ord + Clone,
    V: Eq + Clone,
{
}

impl<K, V> PartialOrd for Tree<K, V>
where
    K: Ord + Clone,
    V: PartialOrd + Clone,
{
    fn partial_cmp(&self, other: &Tree<K, V>) -> Option<Ordering> {
        self.into_iter().partial_cmp(other.into_iter())
    }
}

impl<K, V> Ord for Tree<K, V>
where
    K: Ord + Clone,
    V: Ord + Clone,
{
    fn cmp(&self, other: &Tree<K, V>) -> Ordering {
        self.into_iter().cmp(other.into_iter())
    }
}

impl<K, V> Debug for Tree<K, V>
where
    K: Debug + Ord + Clone,
    V: Debug + Clone,
{
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_map().entries(self.into_iter()).finish()
    }
}

impl<'a, Q, K, V> Index<&'a Q> for Tree<K, V>
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

pub struct Iter<'a, Q, K, V>
where
    Q: Ord,
    K: 'a + Borrow<Q> + Ord + Clone,
    V: 'a + Clone,
{
    ubound: Bound<Q>,
    lbound: Bound<Q>,
    stack: ArrayVec<(bool, &'a Node<K, V>), MAX_DEPTH>,
    current: Option<&'a K>,
    stack_rev: ArrayVec<(bool, &'a Node<K, V>), MAX_DEPTH>,
    current_rev: Option<&'a K>,
}

impl<'a, Q, K, V> Iter<'a, Q, K, V>
where
    Q: Ord,
    K: 'a + Borrow<Q> + Ord + Clone,
    V: 'a + Clone,
{
    fn above_lbound(&self, k: &K) -> bool {
        match self.lbound {
            Bound::Unbounded => true,
            Bound::Included(ref bound) => k.borrow() >= bound,
            Bound::Excluded(ref bound) => k.borrow() > bound,
        }
    }

    fn below_ubound(&self, k: &K) -> bool {
        match self.ubound {
            Bound::Unbounded => true,
            Bound::Included(ref bound) => k.borrow() <= bound,
            Bound::Excluded(ref bound) => k.borrow() < bound,
        }
    }
}

impl<'a, Q, K, V> Iterator for Iter<'a, Q, K, V>
where
    Q: Ord,
    K: 'a + Borrow<Q> + Ord + Clone,
    V: 'a + Clone,
{
    type Item = (&'a K, &'a V);
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.stack.is_empty() {
                return None;
            }
            let top = self.stack.len() - 1;
            let (visited, n) = self.stack[top];
            if visited {
                self.stack.pop();
                if self.below_ubound(&n.key) {
                    if let Tree::Node(ref r) = n.right {
                        self.stack.push((false, &**r));
                    }
                }
                if let Some(back) = self.current_rev {
                    if &n.key >= back {
                        return None;
                    }
                }
                if !self.below_ubound(&n.key) {
                    return None;
                }
                self.current = Some(&n.key);
                if self.above_lbound(&n.key) {
                    return Some((&n.key, &n.val));
                }
            } else {
                self.stack[top].0 = true;
                // if the node's key is already below the lower bound then
                // every key in its left subtree is too
                if self.above_lbound(&n.key) {
                    if let Tree::Node(ref l) = n.left {
                        self.stack.push((false, &**l));
                    }
                }
            }
        }
    }
}

impl<'a, Q, K, V> DoubleEndedIterator for Iter<'a, Q, K, V>
where
    Q: Ord,
    K: 'a + Borrow<Q> + Ord + Clone,
    V: 'a + Clone,
{
    fn next_back(&mut self) -> Option<Self::Item> {
        loop {
            if self.stack_rev.is_empty() {
                return None;
            }
            let top = self.stack_rev.len() - 1;
            let (visited, n) = self.stack_rev[top];
            if visited {
                self.stack_rev.pop();
                if self.above_lbound(&n.key) {
                    if let Tree::Node(ref l) = n.left {
                        self.stack_rev.push((false, &**l));
                    }
                }
                if let Some(front) = self.current {
                    if &n.key <= front {
                        return None;
                    }
                }
                if !self.above_lbound(&n.key) {
                    return None;
                }
                self.current_rev = Some(&n.key);
                if self.below_ubound(&n.key) {
                    return Some((&n.key, &n.val));
                }
            } else {
                self.stack_rev[top].0 = true;
                if self.below_ubound(&n.key) {
                    if let Tree::Node(ref r) = n.right {
                        self.stack_rev.push((false, &**r));
                    }
                }
            }
        }
    }
}

impl<'a, K, V> IntoIterator for &'a Tree<K, V>
where
    K: 'a + Borrow<K> + Ord + Clone,
    V: 'a + Clone,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.range(Bound::Unbounded, Bound::Unbounded)
    }
}

impl<K, V> Tree<K, V>
where
    K: Ord + Clone,
    V: Clone,
{
    pub(crate) fn new() -> Self {
        Tree::Empty
    }

    pub(crate) fn range<'a, Q>(&'a self, lbound: Bound<Q>, ubound: Bound<Q>) -> Iter<'a, Q, K, V>
    where
        Q: Ord,
        K: Borrow<Q>,
    {
        let mut stack = ArrayVec::<(bool, &'a Node<K, V>), MAX_DEPTH>::new();
        let mut stack_rev = ArrayVec::<(bool, &'a Node<K, V>), MAX_DEPTH>::new();
        if let Tree::Node(ref n) = *self {
            stack.push((false, &**n));
            stack_rev.push((false, &**n));
        }
        Iter {
            lbound,
            ubound,
            stack,
            current: None,
            stack_rev,
            current_rev: None,
        }
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            Tree::Empty => 0,
            Tree::Node(n) => n.size,
        }
    }

    pub(crate) fn ptr_eq(&self, other: &Tree<K, V>) -> bool {
        match (self, other) {
            (Tree::Empty, Tree::Empty) => true,
            (Tree::Node(n0), Tree::Node(n1)) => Arc::ptr_eq(n0, n1),
            (_, _) => false,
        }
    }

    fn create(l: &Tree<K, V>, key: K, val: V, r: &Tree<K, V>) -> Self {
        let n = Node {
            key,
            val,
            left: l.clone(),
            right: r.clone(),
            size: 1 + l.len() + r.len(),
        };
        Tree::Node(Arc::new(n))
    }

    fn leaf(key: K, val: V) -> Self {
        Tree::create(&Tree::Empty, key, val, &Tree::Empty)
    }

    // rebuild a node whose subtrees may be out of balance by one
    // mutation, restoring the weight invariant with a single or
    // double rotation as needed
    fn bal(l: &Tree<K, V>, key: &K, val: &V, r: &Tree<K, V>) -> Self {
        let (sl, sr) = (l.len(), r.len());
        if sl + sr <= 1 {
            Tree::create(l, key.clone(), val.clone(), r)
        } else if sr > DELTA * sl {
            match *r {
                Tree::Empty => panic!("tree sizes are wrong"),
                Tree::Node(ref rn) => {
                    if rn.left.len() < RATIO * rn.right.len() {
                        Tree::create(
                            &Tree::create(l, key.clone(), val.clone(), &rn.left),
                            rn.key.clone(),
                            rn.val.clone(),
                            &rn.right,
                        )
                    } else {
                        match rn.left {
                            Tree::Empty => panic!("tree sizes are wrong"),
                            Tree::Node(ref rln) => Tree::create(
                                &Tree::create(l, key.clone(), val.clone(), &rln.left),
                                rln.key.clone(),
                                rln.val.clone(),
                                &Tree::create(&rln.right, rn.key.clone(), rn.val.clone(), &rn.right),
                            ),
                        }
                    }
                }
            }
        } else if sl > DELTA * sr {
            match *l {
                Tree::Empty => panic!("tree sizes are wrong"),
                Tree::Node(ref ln) => {
                    if ln.right.len() < RATIO * ln.left.len() {
                        Tree::create(
                            &ln.left,
                            ln.key.clone(),
                            ln.val.clone(),
                            &Tree::create(&ln.right, key.clone(), val.clone(), r),
                        )
                    } else {
                        match ln.right {
                            Tree::Empty => panic!("tree sizes are wrong"),
                            Tree::Node(ref lrn) => Tree::create(
                                &Tree::create(&ln.left, ln.key.clone(), ln.val.clone(), &lrn.left),
                                lrn.key.clone(),
                                lrn.val.clone(),
                                &Tree::create(&lrn.right, key.clone(), val.clone(), r),
                            ),
                        }
                    }
                }
            }
        } else {
            Tree::create(l, key.clone(), val.clone(), r)
        }
    }

    /// insert (k, v), rejecting k if it is already bound. The flag is
    /// true if a new binding was added. Every node on the search path
    /// is rebuilt, every untouched subtree is shared with the old tree.
    pub(crate) fn insert(&self, k: K, v: V) -> (Self, bool) {
        match self {
            Tree::Empty => (Tree::leaf(k, v), true),
            Tree::Node(n) => match k.cmp(&n.key) {
                Ordering::Less => match n.left.insert(k, v) {
                    (_, false) => (self.clone(), false),
                    (l, true) => (Tree::bal(&l, &n.key, &n.val, &n.right), true),
                },
                Ordering::Greater => match n.right.insert(k, v) {
                    (_, false) => (self.clone(), false),
                    (r, true) => (Tree::bal(&n.left, &n.key, &n.val, &r), true),
                },
                Ordering::Equal => (self.clone(), false),
            },
        }
    }

    /// insert (k, v), replacing the binding for k if there is
    /// one. Returns the previous value.
    pub(crate) fn insert_or_assign(&self, k: K, v: V) -> (Self, Option<V>) {
        match self {
            Tree::Empty => (Tree::leaf(k, v), None),
            Tree::Node(n) => match k.cmp(&n.key) {
                Ordering::Less => {
                    let (l, prev) = n.left.insert_or_assign(k, v);
                    (Tree::bal(&l, &n.key, &n.val, &n.right), prev)
                }
                Ordering::Greater => {
                    let (r, prev) = n.right.insert_or_assign(k, v);
                    (Tree::bal(&n.left, &n.key, &n.val, &r), prev)
                }
                Ordering::Equal => (
                    Tree::create(&n.left, k, v, &n.right),
                    Some(n.val.clone()),
                ),
            },
        }
    }

    fn min_entry(&self) -> Option<(&K, &V)> {
        match self {
            Tree::Empty => None,
            Tree::Node(n) => match n.left {
                Tree::Empty => Some((&n.key, &n.val)),
                Tree::Node(_) => n.left.min_entry(),
            },
        }
    }

    fn remove_min(&self) -> Self {
        match self {
            Tree::Empty => panic!("remove min from empty tree"),
            Tree::Node(n) => match n.left {
                Tree::Empty => n.right.clone(),
                Tree::Node(_) => Tree::bal(&n.left.remove_min(), &n.key, &n.val, &n.right),
            },
        }
    }

    // join two subtrees that were siblings, promoting the in order
    // successor of the removed key into its place
    fn glue(l: &Tree<K, V>, r: &Tree<K, V>) -> Self {
        match (l, r) {
            (&Tree::Empty, _) => r.clone(),
            (_, &Tree::Empty) => l.clone(),
            (_, _) => {
                let (k, v) = r.min_entry().unwrap();
                Tree::bal(l, k, v, &r.remove_min())
            }
        }
    }

    /// remove the binding for k. If k is not bound the original tree
    /// is returned unchanged and the flag is None.
    pub(crate) fn remove<Q: ?Sized + Ord>(&self, k: &Q) -> (Self, Option<V>)
    where
        K: Borrow<Q>,
    {
        match self {
            Tree::Empty => (Tree::Empty, None),
            Tree::Node(n) => match k.cmp(n.key.borrow()) {
                Ordering::Less => match n.left.remove(k) {
                    (_, None) => (self.clone(), None),
                    (l, prev) => (Tree::bal(&l, &n.key, &n.val, &n.right), prev),
                },
                Ordering::Greater => match n.right.remove(k) {
                    (_, None) => (self.clone(), None),
                    (r, prev) => (Tree::bal(&n.left, &n.key, &n.val, &r), prev),
                },
                Ordering::Equal => (Tree::glue(&n.left, &n.right), Some(n.val.clone())),
            },
        }
    }

    /// remove the binding of sorted position i, None if i is out of
    /// range
    pub(crate) fn remove_at(&self, i: usize) -> Option<(Self, (K, V))> {
        match self {
            Tree::Empty => None,
            Tree::Node(n) => {
                let ls = n.left.len();
                if i < ls {
                    let (l, kv) = n.left.remove_at(i)?;
                    Some((Tree::bal(&l, &n.key, &n.val, &n.right), kv))
                } else if i == ls {
                    Some((
                        Tree::glue(&n.left, &n.right),
                        (n.key.clone(), n.val.clone()),
                    ))
                } else {
                    let (r, kv) = n.right.remove_at(i - ls - 1)?;
                    Some((Tree::bal(&n.left, &n.key, &n.val, &r), kv))
                }
            }
        }
    }

    // this is structured as a loop so the hot descent doesn't pay for
    // a stack frame per level
    fn get_gen<'a, Q, F, R>(&'a self, k: &Q, f: F) -> Option<R>
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
        F: FnOnce(&'a Node<K, V>) -> R,
        R: 'a,
    {
        match self {
            Tree::Empty => None,
            Tree::Node(n) => {
                let mut tn = n;
                loop {
                    match k.cmp(tn.key.borrow()) {
                        Ordering::Less => match tn.left {
                            Tree::Empty => break None,
                            Tree::Node(ref l) => tn = l,
                        },
                        Ordering::Greater => match tn.right {
                            Tree::Empty => break None,
                            Tree::Node(ref r) => tn = r,
                        },
                        Ordering::Equal => break Some(f(tn)),
                    }
                }
            }
        }
    }

    pub(crate) fn get<'a, Q>(&'a self, k: &Q) -> Option<&'a V>
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        self.get_gen(k, |n| &n.val)
    }

    pub(crate) fn get_key<'a, Q>(&'a self, k: &Q) -> Option<&'a K>
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        self.get_gen(k, |n| &n.key)
    }

    pub(crate) fn get_full<'a, Q>(&'a self, k: &Q) -> Option<(&'a K, &'a V)>
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        self.get_gen(k, |n| (&n.key, &n.val))
    }

    /// the binding of sorted position i (0 based), None if i is out
    /// of range. The descent steps left, here, or right by comparing
    /// i against the size of the left subtree.
    pub(crate) fn get_at(&self, i: usize) -> Option<(&K, &V)> {
        let mut t = self;
        let mut i = i;
        loop {
            match t {
                Tree::Empty => break None,
                Tree::Node(n) => {
                    let ls = n.left.len();
                    if i < ls {
                        t = &n.left;
                    } else if i == ls {
                        break Some((&n.key, &n.val));
                    } else {
                        i -= ls + 1;
                        t = &n.right;
                    }
                }
            }
        }
    }

    /// the number of keys strictly less than k, which is the sorted
    /// position of the first binding with key >= k
    pub(crate) fn rank_lower<Q>(&self, k: &Q) -> usize
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        let mut t = self;
        let mut rank = 0;
        loop {
            match t {
                Tree::Empty => break rank,
                Tree::Node(n) => match n.key.borrow().cmp(k) {
                    Ordering::Less => {
                        rank += n.left.len() + 1;
                        t = &n.right;
                    }
                    _ => t = &n.left,
                },
            }
        }
    }

    /// the number of keys less than or equal to k, which is the
    /// sorted position of the first binding with key > k
    pub(crate) fn rank_upper<Q>(&self, k: &Q) -> usize
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        let mut t = self;
        let mut rank = 0;
        loop {
            match t {
                Tree::Empty => break rank,
                Tree::Node(n) => match n.key.borrow().cmp(k) {
                    Ordering::Greater => t = &n.left,
                    _ => {
                        rank += n.left.len() + 1;
                        t = &n.right;
                    }
                },
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn for_each_node(&self, f: &mut dyn FnMut(usize)) {
        if let Tree::Node(n) = self {
            f(Arc::as_ptr(n) as usize);
            n.left.for_each_node(f);
            n.right.for_each_node(f);
        }
    }
}

impl<K, V> Tree<K, V>
where
    K: Ord + Clone + Debug,
    V: Clone + Debug,
{
    #[allow(dead_code)]
    pub(crate) fn invariant(&self, len: usize) -> () {
        fn check<K, V>(t: &Tree<K, V>, lower: Option<&K>, upper: Option<&K>) -> usize
        where
            K: Ord + Clone + Debug,
            V: Clone + Debug,
        {
            match *t {
                Tree::Empty => 0,
                Tree::Node(ref n) => {
                    if let Some(lower) = lower {
                        if lower.cmp(&n.key) != Ordering::Less {
                            panic!(
                                "tree invariant violated lower\n{:#?}\n\nkey\n{:#?}",
                                lower, &n.key
                            )
                        }
                    }
                    if let Some(upper) = upper {
                        if upper.cmp(&n.key) != Ordering::Greater {
                            panic!(
                                "tree invariant violated upper\n{:#?}\n\nkey\n{:#?}",
                                upper, &n.key
                            )
                        }
                    }
                    let sl = check(&n.left, lower, Some(&n.key));
                    let sr = check(&n.right, Some(&n.key), upper);
                    if n.size != 1 + sl + sr {
                        panic!("node size is wrong {} vs {}", n.size, 1 + sl + sr)
                    }
                    if sl + sr > 1 && (sl > DELTA * sr || sr > DELTA * sl) {
                        panic!("tree is unbalanced {} vs {} tree: {:#?}", sl, sr, t)
                    }
                    n.size
                }
            }
        }

        let tlen = check(self, None, None);
        if len != tlen {
            panic!("len is wrong {} vs {}", len, tlen)
        }
    }
}
