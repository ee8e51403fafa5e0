//! Contains the [`LogicalClock`] trait and its implementations.
//!
//! Two clock variants are available:
//!
//! - **[`ScalarClock`]:** A Lamport clock producing totally ordered
//!     [`ScalarStamp`]s. Ties between stamps with the same counter are broken
//!     by the node id, so any two stamps produced anywhere in the cluster are
//!     comparable.
//! - **[`VectorClock`]:** A vector clock producing [`VectorStamp`]s that are
//!     only partially ordered. Two stamps are ordered iff one is componentwise
//!     less than or equal to the other; otherwise the stamped events happened
//!     concurrently.
//!
//! The scheduler that replicates writes is parameterised over these variants:
//! the scalar clock drives the total delivery order of sequential mode, the
//! vector clock drives the happens-before check of causal mode.

pub use self::{
    scalar::{ScalarClock, ScalarStamp},
    vector::{VectorClock, VectorStamp},
};

mod scalar;
mod vector;

/// Shared operations of the logical clock variants.
///
/// A logical clock is a per-node counter structure that only ever advances.
/// It is advanced in two ways: [`tick`][Self::tick] for an event issued by the
/// local node, and [`observe`][Self::observe] for a stamp received from
/// another node. `observe` is a max-merge, so applying stamps in any order
/// yields the same clock value.
///
/// **All implementations must guarantee that clock values never decrease.**
pub trait LogicalClock {
    /// The stamp type produced by this clock.
    type Stamp: Clone + PartialOrd;

    /// Advances the clock for a locally issued event and returns the stamp of
    /// that event.
    fn tick(&mut self) -> Self::Stamp;

    /// Merges an observed stamp into the clock without recording a local
    /// event.
    fn observe(&mut self, stamp: &Self::Stamp);

    /// Returns the current clock value as a stamp, without advancing.
    fn stamp(&self) -> Self::Stamp;
}
