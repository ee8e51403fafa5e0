//! Causal delivery using vector clocks.

use super::{BcastWriteTask, PendingWrite, Scheduler};
use crate::{
    clock::{LogicalClock, VectorClock, VectorStamp},
    messages::WriteStamp,
    store::KeyValueStore,
    LockstepError,
};
use futures::{future::FusedFuture, Future, FutureExt};
use smol::channel;
use std::sync::Mutex;

/// Work handed to the [`CausalScheduler`].
pub enum CausalTask {
    /// A locally issued write: still zero-stamped, carrying the fan-out task
    /// that will replicate it once the scheduler has stamped it.
    Issue(BcastWriteTask),
    /// A write replicated from a peer, carrying the sender's vector stamp.
    Remote(PendingWrite<VectorStamp>),
}

/// Delivers replicated writes in an order that respects happens-before.
///
/// A remote write stamped `V` by sender `s` is delivered once it is the next
/// write expected from `s` (`V[s] == local[s] + 1`) and all events the sender
/// had seen at issue time have been delivered locally (`V[k] <= local[k]` for
/// `k != s`). Locally issued writes are applied immediately at issue time,
/// since causal order from a node to itself holds trivially.
pub struct CausalScheduler {
    clock: Mutex<VectorClock>,
    pending: Mutex<Vec<PendingWrite<VectorStamp>>>,
    node: usize,
    cluster_size: usize,
    store: KeyValueStore,
    wake_tx: channel::Sender<()>,
    wake_rx: channel::Receiver<()>,
}

impl CausalScheduler {
    /// Creates a scheduler around the given vector clock, applying delivered
    /// writes to `store`.
    pub fn new(clock: VectorClock, store: KeyValueStore) -> Self {
        let (wake_tx, wake_rx) = channel::unbounded();
        Self {
            node: clock.node(),
            cluster_size: clock.len(),
            clock: Mutex::new(clock),
            pending: Mutex::new(Vec::new()),
            store,
            wake_tx,
            wake_rx,
        }
    }

    /// A snapshot of the node's current causal view.
    pub fn current_view(&self) -> VectorStamp {
        self.clock.lock().unwrap().stamp()
    }

    /// The number of writes currently held back.
    pub fn queued_writes(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    /// Delivers every pending write that is currently eligible and returns
    /// the number of delivered writes.
    ///
    /// Readiness is partial-ordered, so each pass scans *all* pending writes,
    /// not only the oldest one: a later arrival from one sender may be
    /// deliverable while an earlier arrival from another sender is not. The
    /// scan repeats until it makes no progress, because every delivery may
    /// unblock further writes.
    pub fn deliver_ready(&self) -> usize {
        let mut delivered = 0;
        let mut pending = self.pending.lock().unwrap();
        let mut clock = self.clock.lock().unwrap();
        loop {
            let local = clock.stamp();
            let position = pending
                .iter()
                .position(|write| write.stamp.deliverable_after(&local, write.sender));
            match position {
                Some(index) => {
                    let write = pending.remove(index);
                    clock.observe(&write.stamp);
                    log::debug!(
                        "delivering causal write {} from worker {}: key={}",
                        write.stamp,
                        write.sender,
                        write.key
                    );
                    self.store.apply(write.key, write.value);
                    delivered += 1;
                }
                None => break,
            }
        }
        delivered
    }

    /// Runs the delivery loop until the shutdown signal resolves.
    ///
    /// The loop wakes on every enqueue; writes whose causal predecessors
    /// never arrive stay queued indefinitely.
    pub async fn run(
        self: std::sync::Arc<Self>,
        mut shutdown_signal: impl Future<Output = ()> + FusedFuture + Unpin,
    ) -> eyre::Result<()> {
        loop {
            self.deliver_ready();
            futures::select! {
                result = self.wake_rx.recv().fuse() => match result {
                    Ok(()) => {}
                    Err(channel::RecvError) => break,
                },
                () = shutdown_signal => break,
            }
        }
        Ok(())
    }

    fn enqueue_remote(&self, write: PendingWrite<VectorStamp>) -> Result<(), LockstepError> {
        if write.stamp.len() != self.cluster_size {
            return Err(LockstepError::VectorLength);
        }
        if write.sender >= self.cluster_size {
            return Err(LockstepError::UnknownSender);
        }
        if write.sender == self.node {
            // our own broadcast coming back; the write was already applied
            // synchronously at issue time
            log::debug!("dropping self-originated broadcast {}", write.stamp);
            return Ok(());
        }
        let seen = {
            let clock = self.clock.lock().unwrap();
            clock.stamp()
        };
        let sender_entry = write.stamp.get(write.sender).unwrap_or(0);
        if sender_entry <= seen.get(write.sender).unwrap_or(0) {
            // already delivered; a duplicate would otherwise stall forever,
            // since the predicate requires exactly local[s] + 1
            log::debug!(
                "dropping duplicate or stale broadcast {} from worker {}",
                write.stamp,
                write.sender
            );
            return Ok(());
        }
        self.pending.lock().unwrap().push(write);
        self.notify();
        Ok(())
    }

    fn notify(&self) {
        let _ = self.wake_tx.try_send(());
    }
}

impl Scheduler for CausalScheduler {
    type Task = CausalTask;

    fn add_task(&self, task: CausalTask) {
        match task {
            CausalTask::Issue(mut bcast) => {
                // stamp the write with the advanced local vector, apply it
                // locally, then replicate it to the peers
                let stamp = self.clock.lock().unwrap().tick();
                bcast.set_stamp(WriteStamp::Causal(stamp.entries().to_vec()));
                let message = bcast.message();
                log::debug!(
                    "issuing causal write {} at worker {}: key={}",
                    stamp,
                    self.node,
                    message.key
                );
                self.store
                    .apply(message.key.clone(), message.value.clone());
                bcast.excluding(self.node).spawn();
            }
            CausalTask::Remote(write) => {
                if let Err(err) = self.enqueue_remote(write) {
                    log::warn!("rejecting broadcast write: {}", err);
                }
            }
        }
    }

    fn is_deliverable(&self, task: &CausalTask) -> bool {
        match task {
            // a local write is applied at issue time, so it is always ready
            CausalTask::Issue(_) => true,
            CausalTask::Remote(write) => {
                let local = self.current_view();
                write.stamp.deliverable_after(&local, write.sender)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        messages::{BroadcastWrite, ConsistencyMode, WriteStamp},
        zenoh_test_instance, ZenohValueAsString,
    };
    use std::time::Duration;
    use zenoh::prelude::{Receiver, ZFuture};

    fn causal_test_instance(node: usize, cluster_size: usize) -> (CausalScheduler, KeyValueStore) {
        let store = KeyValueStore::default();
        let scheduler =
            CausalScheduler::new(VectorClock::new(cluster_size, node), store.clone());
        (scheduler, store)
    }

    fn remote(entries: Vec<u64>, sender: usize, key: &str, value: &str) -> CausalTask {
        CausalTask::Remote(PendingWrite {
            stamp: VectorStamp::new(entries),
            sender,
            key: key.into(),
            value: value.to_owned(),
        })
    }

    #[test]
    fn delivers_direct_dependency_chain() {
        // worker 1 receives worker 0's first write, then writes itself
        let (scheduler, store) = causal_test_instance(1, 2);
        scheduler.add_task(remote(vec![1, 0], 0, "x", "a"));
        assert_eq!(scheduler.deliver_ready(), 1);
        assert_eq!(store.get(&"x".into()), Some("a".to_owned()));
        assert_eq!(scheduler.current_view().entries(), &[1, 0]);
    }

    #[test]
    fn holds_back_reordered_writes_from_one_sender() {
        // the second write of worker 0 arrives before the first
        let (scheduler, store) = causal_test_instance(1, 2);
        scheduler.add_task(remote(vec![2, 0], 0, "x", "2"));
        assert_eq!(scheduler.deliver_ready(), 0);
        assert_eq!(scheduler.queued_writes(), 1);
        assert!(store.is_empty());

        scheduler.add_task(remote(vec![1, 0], 0, "x", "1"));
        // both become deliverable, in issue order
        assert_eq!(scheduler.deliver_ready(), 2);
        assert_eq!(store.get(&"x".into()), Some("2".to_owned()));
        assert_eq!(scheduler.current_view().entries(), &[2, 0]);
    }

    #[test]
    fn holds_back_writes_with_unseen_dependencies() {
        // worker 1's write depends on a write of worker 0 that has not
        // arrived at worker 2 yet
        let (scheduler, store) = causal_test_instance(2, 3);
        scheduler.add_task(remote(vec![1, 1, 0], 1, "y", "b"));
        assert_eq!(scheduler.deliver_ready(), 0);

        scheduler.add_task(remote(vec![1, 0, 0], 0, "x", "a"));
        assert_eq!(scheduler.deliver_ready(), 2);
        assert_eq!(store.get(&"x".into()), Some("a".to_owned()));
        assert_eq!(store.get(&"y".into()), Some("b".to_owned()));
    }

    #[test]
    fn concurrent_writes_merge_views() {
        // workers 0 and 1 write concurrently; worker 2 may deliver them in
        // either order and ends up with the merged view
        let (scheduler, _) = causal_test_instance(2, 3);
        scheduler.add_task(remote(vec![0, 1, 0], 1, "b", "2"));
        scheduler.add_task(remote(vec![1, 0, 0], 0, "a", "1"));
        assert_eq!(scheduler.deliver_ready(), 2);
        assert_eq!(scheduler.current_view().entries(), &[1, 1, 0]);
    }

    #[test]
    fn drops_duplicate_broadcasts() {
        let (scheduler, _) = causal_test_instance(1, 2);
        scheduler.add_task(remote(vec![1, 0], 0, "x", "a"));
        assert_eq!(scheduler.deliver_ready(), 1);

        // the same stamp again: dropped on enqueue instead of stalling
        scheduler.add_task(remote(vec![1, 0], 0, "x", "a"));
        assert_eq!(scheduler.queued_writes(), 0);
    }

    #[test]
    fn drops_self_originated_broadcasts() {
        let (scheduler, store) = causal_test_instance(0, 2);
        scheduler.add_task(remote(vec![1, 0], 0, "x", "a"));
        assert_eq!(scheduler.queued_writes(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn rejects_wrong_vector_length() {
        let (scheduler, _) = causal_test_instance(1, 2);
        scheduler.add_task(remote(vec![1, 0, 0], 0, "x", "a"));
        assert_eq!(scheduler.queued_writes(), 0);
    }

    #[test]
    fn local_issue_applies_and_broadcasts() {
        let zenoh = zenoh_test_instance();
        let zenoh_prefix = uuid::Uuid::new_v4().to_string();

        let zenoh_clone = zenoh.clone();
        let mut subscriber = zenoh_clone
            .subscribe(format!("{}/**", zenoh_prefix))
            .wait()
            .unwrap();

        let (scheduler, store) = causal_test_instance(0, 2);
        let task = BcastWriteTask::new(
            zenoh.clone(),
            zenoh_prefix.clone(),
            2,
            BroadcastWrite {
                mode: ConsistencyMode::Causal,
                sender: 0,
                stamp: WriteStamp::Causal(vec![0, 0]),
                key: "x".into(),
                value: "a".to_owned(),
            },
        );
        scheduler.add_task(CausalTask::Issue(task));

        // applied locally at issue time, before any peer confirms anything
        assert_eq!(store.get(&"x".into()), Some("a".to_owned()));
        assert_eq!(scheduler.current_view().entries(), &[1, 0]);

        // the broadcast goes to the peer only, stamped with the new vector
        let sample = subscriber
            .receiver()
            .recv_timeout(Duration::from_secs(5))
            .unwrap();
        let message: BroadcastWrite =
            serde_json::from_str(&sample.value.as_string().unwrap()).unwrap();
        assert_eq!(message.stamp, WriteStamp::Causal(vec![1, 0]));
        assert_eq!(message.sender, 0);
    }
}
