use super::LogicalClock;
use std::cmp::Ordering;
use std::fmt;

/// A vector timestamp: one counter per cluster member.
///
/// Vector stamps are only partially ordered. `v <= w` holds iff every
/// component of `v` is less than or equal to the corresponding component of
/// `w`. Stamps where neither direction holds describe concurrent events and
/// compare as unordered.
///
/// ## Examples
///
/// ```
/// use lockstep_api::clock::VectorStamp;
///
/// let a = VectorStamp::new(vec![1, 0]);
/// let b = VectorStamp::new(vec![1, 1]);
/// let c = VectorStamp::new(vec![0, 1]);
///
/// assert!(a < b);
/// assert_eq!(a.partial_cmp(&c), None); // concurrent
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct VectorStamp {
    entries: Vec<u64>,
}

impl VectorStamp {
    /// Constructs a stamp from the given per-node counters.
    pub fn new(entries: Vec<u64>) -> Self {
        Self { entries }
    }

    /// Creates a stamp of the given length with all components zero.
    pub fn zeroed(len: usize) -> Self {
        Self {
            entries: vec![0; len],
        }
    }

    /// The number of components, i.e. the cluster size the stamp was created
    /// for.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the stamp has no components.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if every component is zero.
    pub fn is_zero(&self) -> bool {
        self.entries.iter().all(|&entry| entry == 0)
    }

    /// The counter of the given node, if the index is in range.
    pub fn get(&self, node: usize) -> Option<u64> {
        self.entries.get(node).copied()
    }

    /// The raw per-node counters.
    pub fn entries(&self) -> &[u64] {
        &self.entries
    }

    /// Consumes the stamp, returning the raw per-node counters.
    pub fn into_entries(self) -> Vec<u64> {
        self.entries
    }

    /// Decides whether a write stamped with `self` by `sender` may be
    /// delivered at a node whose current view is `local`.
    ///
    /// This is the standard causal delivery check: the write must be the next
    /// one from its sender (`self[sender] == local[sender] + 1`), and the
    /// sender must not have seen any event the local node has not caught up
    /// with yet (`self[k] <= local[k]` for every other `k`).
    ///
    /// ```
    /// use lockstep_api::clock::VectorStamp;
    ///
    /// let local = VectorStamp::new(vec![1, 0]);
    /// assert!(VectorStamp::new(vec![1, 1]).deliverable_after(&local, 1));
    /// assert!(!VectorStamp::new(vec![2, 1]).deliverable_after(&local, 1));
    /// ```
    pub fn deliverable_after(&self, local: &VectorStamp, sender: usize) -> bool {
        if self.entries.len() != local.entries.len() || sender >= self.entries.len() {
            return false;
        }
        self.entries.iter().zip(&local.entries).enumerate().all(
            |(node, (&stamped, &seen))| {
                if node == sender {
                    stamped == seen + 1
                } else {
                    stamped <= seen
                }
            },
        )
    }
}

impl PartialOrd for VectorStamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.entries.len() != other.entries.len() {
            return None;
        }
        let mut ordering = Ordering::Equal;
        for (a, b) in self.entries.iter().zip(&other.entries) {
            match (ordering, a.cmp(b)) {
                (_, Ordering::Equal) => {}
                (Ordering::Equal, next) => ordering = next,
                (Ordering::Less, Ordering::Less) | (Ordering::Greater, Ordering::Greater) => {}
                // components point in both directions, so the stamps are
                // concurrent
                _ => return None,
            }
        }
        Some(ordering)
    }
}

impl fmt::Display for VectorStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", entry)?;
        }
        write!(f, "]")
    }
}

/// A vector clock of fixed length, owned by one node.
///
/// The node's own component advances by one per locally issued event; all
/// components are raised towards observed stamps on merging. Components never
/// decrease.
#[derive(Debug, Clone)]
pub struct VectorClock {
    entries: Vec<u64>,
    node: usize,
}

impl VectorClock {
    /// Creates an all-zero clock of length `len` for the given node.
    pub fn new(len: usize, node: usize) -> Self {
        assert!(node < len, "node id must index into the vector");
        Self {
            entries: vec![0; len],
            node,
        }
    }

    /// The id of the node this clock belongs to.
    pub fn node(&self) -> usize {
        self.node
    }

    /// The number of components, i.e. the cluster size.
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl LogicalClock for VectorClock {
    type Stamp = VectorStamp;

    fn tick(&mut self) -> VectorStamp {
        self.entries[self.node] += 1;
        self.stamp()
    }

    fn observe(&mut self, stamp: &VectorStamp) {
        for (own, observed) in self.entries.iter_mut().zip(stamp.entries()) {
            *own = (*own).max(*observed);
        }
    }

    fn stamp(&self) -> VectorStamp {
        VectorStamp::new(self.entries.clone())
    }
}
