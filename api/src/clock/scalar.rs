use super::LogicalClock;
use std::cmp::Ordering;
use std::fmt;

/// A Lamport timestamp: a counter paired with the id of the node that
/// produced it.
///
/// Stamps are totally ordered by the counter, with ties broken by the node
/// id. This makes any two stamps produced in the cluster comparable, which is
/// what allows all replicas to agree on a single delivery order.
///
/// ## Examples
///
/// ```
/// use lockstep_api::clock::ScalarStamp;
///
/// let a = ScalarStamp::new(3, 0);
/// let b = ScalarStamp::new(3, 1);
/// let c = ScalarStamp::new(4, 0);
///
/// assert!(a < b); // same counter, lower node id wins
/// assert!(b < c); // lower counter wins regardless of node id
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ScalarStamp {
    /// The Lamport counter value.
    pub counter: u64,
    /// The id of the node that produced the stamp.
    pub node: usize,
}

impl ScalarStamp {
    /// Constructs a stamp from the given counter and node id.
    pub fn new(counter: u64, node: usize) -> Self {
        Self { counter, node }
    }

    /// Renders the message identity string `"<counter>.<node>"` that is used
    /// to key the acknowledgement table.
    ///
    /// ```
    /// use lockstep_api::clock::ScalarStamp;
    ///
    /// assert_eq!(ScalarStamp::new(5, 2).id(), "5.2");
    /// ```
    pub fn id(&self) -> String {
        format!("{}.{}", self.counter, self.node)
    }
}

impl Ord for ScalarStamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.counter
            .cmp(&other.counter)
            .then(self.node.cmp(&other.node))
    }
}

impl PartialOrd for ScalarStamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ScalarStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.counter, self.node)
    }
}

/// A scalar Lamport clock.
///
/// The counter never decreases. It advances by one for every locally issued
/// event ([`tick`][LogicalClock::tick]) and jumps to the maximum of the local
/// and observed values when a remote stamp is merged in
/// ([`observe`][LogicalClock::observe]).
#[derive(Debug, Clone)]
pub struct ScalarClock {
    counter: u64,
    node: usize,
}

impl ScalarClock {
    /// Creates a clock for the given node, starting at counter zero.
    pub fn new(node: usize) -> Self {
        Self { counter: 0, node }
    }

    /// The id of the node this clock belongs to.
    pub fn node(&self) -> usize {
        self.node
    }
}

impl LogicalClock for ScalarClock {
    type Stamp = ScalarStamp;

    fn tick(&mut self) -> ScalarStamp {
        self.counter += 1;
        self.stamp()
    }

    fn observe(&mut self, stamp: &ScalarStamp) {
        self.counter = self.counter.max(stamp.counter);
    }

    fn stamp(&self) -> ScalarStamp {
        ScalarStamp::new(self.counter, self.node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_is_strictly_increasing() {
        let mut clock = ScalarClock::new(1);
        let mut previous = 0;
        for _ in 0..10 {
            let stamp = clock.tick();
            assert!(stamp.counter > previous);
            assert_eq!(stamp.node, 1);
            previous = stamp.counter;
        }
    }

    #[test]
    fn observe_then_tick_exceeds_sender() {
        let mut clock = ScalarClock::new(0);
        clock.observe(&ScalarStamp::new(41, 1));
        let stamp = clock.tick();
        assert!(stamp.counter >= 42);
    }

    #[test]
    fn observe_never_decreases() {
        let mut clock = ScalarClock::new(0);
        clock.observe(&ScalarStamp::new(7, 1));
        clock.observe(&ScalarStamp::new(3, 2));
        assert_eq!(clock.stamp().counter, 7);
    }

    #[test]
    fn total_order_breaks_ties_by_node() {
        let mut stamps = vec![
            ScalarStamp::new(2, 1),
            ScalarStamp::new(1, 1),
            ScalarStamp::new(2, 0),
            ScalarStamp::new(1, 0),
        ];
        stamps.sort();
        assert_eq!(
            stamps,
            vec![
                ScalarStamp::new(1, 0),
                ScalarStamp::new(1, 1),
                ScalarStamp::new(2, 0),
                ScalarStamp::new(2, 1),
            ]
        );
    }

    #[test]
    fn identity_string() {
        assert_eq!(ScalarStamp::new(12, 3).id(), "12.3");
    }
}
