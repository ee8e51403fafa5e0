//! Decides when a replicated write becomes visible.
//!
//! Each worker runs two schedulers side by side, one per consistency mode:
//!
//! - The [`SequentialScheduler`] keeps a priority queue ordered by scalar
//!   Lamport stamps and releases the queue head once every cluster member has
//!   acknowledged it, which yields the same total delivery order on every
//!   replica.
//! - The [`CausalScheduler`] keeps pending writes in arrival order and
//!   releases any write whose vector stamp is the next one expected from its
//!   sender, which yields an order consistent with happens-before.
//!
//! Handlers enqueue work through [`Scheduler::add_task`]; each scheduler's
//! delivery loop runs on its own dedicated thread and is woken on every
//! enqueue and every acknowledgement update.

pub use self::{
    causal::{CausalScheduler, CausalTask},
    sequential::{SequencedWrite, SequentialScheduler},
    tasks::{BcastAckTask, BcastWriteTask},
};

mod causal;
mod sequential;
mod tasks;

/// A replicated write waiting to be delivered, stamped by its originator.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingWrite<S> {
    /// The originator timestamp of the write.
    pub stamp: S,
    /// The id of the worker that issued the write.
    pub sender: usize,
    /// The key to write.
    pub key: crate::ClientKey,
    /// The value to store under `key`.
    pub value: String,
}

/// Common contract of the delivery schedulers.
pub trait Scheduler {
    /// The queued task type this scheduler orders.
    type Task;

    /// Inserts a task into the scheduler.
    ///
    /// Never blocks on delivery and never fails towards the caller: malformed
    /// or stale tasks are logged and dropped. Insertions linearize with the
    /// delivery loop's queue inspections.
    fn add_task(&self, task: Self::Task);

    /// Pure predicate deciding whether `task` is currently eligible for
    /// delivery.
    ///
    /// Must not be called while the caller already holds scheduler locks (the
    /// delivery loops use their own internal passes instead).
    fn is_deliverable(&self, task: &Self::Task) -> bool;
}
