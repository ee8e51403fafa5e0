//! Total-order delivery using Lamport clocks and acknowledgement counting.

use super::{BcastAckTask, PendingWrite, Scheduler};
use crate::{
    clock::{LogicalClock, ScalarClock, ScalarStamp},
    store::KeyValueStore,
};
use futures::{future::FusedFuture, Future, FutureExt};
use smol::channel;
use std::{
    collections::{BTreeMap, HashMap},
    sync::Mutex,
};

/// Lifecycle of a queued sequential write.
///
/// The transition to `AcksRequested` happens at most once per write, which is
/// what guarantees that the acknowledgement broadcast fires exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AckPhase {
    /// Queued; the acknowledgement broadcast has not been requested yet.
    Enqueued,
    /// The acknowledgement broadcast has fired; acks are being collected.
    AcksRequested,
}

/// A sequential write queued for delivery, together with its acknowledgement
/// state.
pub struct SequencedWrite {
    write: PendingWrite<ScalarStamp>,
    phase: AckPhase,
    ack_task: Option<BcastAckTask>,
}

impl SequencedWrite {
    /// Wraps a replicated write for the sequential queue.
    ///
    /// The `ack_task` is fired once the write first reaches the head of the
    /// queue; the write is then held until the resulting acknowledgements
    /// (including our own) complete its bitmap.
    pub fn new(write: PendingWrite<ScalarStamp>, ack_task: Option<BcastAckTask>) -> Self {
        Self {
            write,
            phase: AckPhase::Enqueued,
            ack_task,
        }
    }

    /// The originator stamp of the wrapped write.
    pub fn stamp(&self) -> ScalarStamp {
        self.write.stamp
    }

    /// Fires the attached acknowledgement broadcast, exactly once.
    fn request_acks(&mut self) {
        match self.ack_task.take() {
            Some(task) => task.spawn(),
            None => log::warn!(
                "no ack broadcast task attached to write {}",
                self.write.stamp.id()
            ),
        }
        self.phase = AckPhase::AcksRequested;
    }
}

/// Delivers replicated writes in a single total order, agreed upon by all
/// replicas.
///
/// The order is the sort of all writes by their scalar stamp `(counter,
/// node)`. A write is delivered once it is the queue minimum *and* every
/// cluster member has acknowledged it; because peers only acknowledge a write
/// when it reaches the head of their own queue, a fully acknowledged minimum
/// can no longer be preceded by any write still in flight.
pub struct SequentialScheduler {
    clock: Mutex<ScalarClock>,
    queue: Mutex<BTreeMap<ScalarStamp, SequencedWrite>>,
    acks: Mutex<HashMap<String, Vec<bool>>>,
    cluster_size: usize,
    store: KeyValueStore,
    wake_tx: channel::Sender<()>,
    wake_rx: channel::Receiver<()>,
}

impl SequentialScheduler {
    /// Creates a scheduler for a cluster of `cluster_size` workers, applying
    /// delivered writes to `store`.
    pub fn new(clock: ScalarClock, cluster_size: usize, store: KeyValueStore) -> Self {
        let (wake_tx, wake_rx) = channel::unbounded();
        Self {
            clock: Mutex::new(clock),
            queue: Mutex::new(BTreeMap::new()),
            acks: Mutex::new(HashMap::new()),
            cluster_size,
            store,
            wake_tx,
            wake_rx,
        }
    }

    /// Advances the local clock for a locally issued write and returns the
    /// stamp of that write.
    pub fn increment_and_get(&self) -> ScalarStamp {
        self.clock.lock().unwrap().tick()
    }

    /// Merges a received clock value and advances past it: afterwards the
    /// local counter is at least `sender_clock + 1`.
    ///
    /// Called whenever a broadcast write or an acknowledgement is received.
    pub fn update_and_increment(&self, sender_clock: u64) {
        let mut clock = self.clock.lock().unwrap();
        let node = clock.node();
        clock.observe(&ScalarStamp::new(sender_clock, node));
        clock.tick();
    }

    /// A snapshot of the current clock value.
    pub fn current_stamp(&self) -> ScalarStamp {
        self.clock.lock().unwrap().stamp()
    }

    /// Records the acknowledgement of `stamp` by `sender` and returns the
    /// resulting bitmap.
    ///
    /// The bitmap is created lazily on the first acknowledgement, so acks
    /// that overtake their broadcast on the network are not lost. The update
    /// is idempotent.
    pub fn update_ack(&self, stamp: &ScalarStamp, sender: usize) -> Vec<bool> {
        let snapshot = {
            let mut acks = self.acks.lock().unwrap();
            let slots = acks
                .entry(stamp.id())
                .or_insert_with(|| vec![false; self.cluster_size]);
            if sender < slots.len() {
                slots[sender] = true;
            } else {
                log::warn!(
                    "ignoring ack for {} from unknown worker {}",
                    stamp.id(),
                    sender
                );
            }
            slots.clone()
        };
        self.notify();
        snapshot
    }

    /// The number of writes currently queued.
    pub fn queued_writes(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    /// Fires due acknowledgement requests and delivers every write that is
    /// currently eligible, in stamp order. Returns the number of delivered
    /// writes.
    pub fn deliver_ready(&self) -> usize {
        let mut delivered = 0;
        let mut queue = self.queue.lock().unwrap();
        loop {
            let stamp = match queue.values_mut().next() {
                Some(head) => {
                    if head.phase == AckPhase::Enqueued {
                        head.request_acks();
                    }
                    head.stamp()
                }
                None => break,
            };
            let complete = {
                let acks = self.acks.lock().unwrap();
                acks.get(&stamp.id())
                    .map_or(false, |slots| slots.iter().all(|&acked| acked))
            };
            if !complete {
                break;
            }
            if let Some(task) = queue.remove(&stamp) {
                // the entry is not needed anymore once the write is delivered
                self.acks.lock().unwrap().remove(&stamp.id());
                log::debug!(
                    "delivering sequential write {}: key={}",
                    stamp.id(),
                    task.write.key
                );
                self.store.apply(task.write.key, task.write.value);
                delivered += 1;
            }
        }
        delivered
    }

    /// Runs the delivery loop until the shutdown signal resolves.
    ///
    /// The loop wakes on every enqueue and every acknowledgement update. It
    /// never returns an error to its callers for protocol reasons; a write
    /// whose acknowledgements never complete simply blocks the queue head
    /// (see the crate documentation on liveness).
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

    fn notify(&self) {
        let _ = self.wake_tx.try_send(());
    }
}

impl Scheduler for SequentialScheduler {
    type Task = SequencedWrite;

    fn add_task(&self, task: SequencedWrite) {
        let stamp = task.stamp();
        self.queue.lock().unwrap().insert(stamp, task);
        // make sure an (empty) bitmap exists even before the first ack
        self.acks
            .lock()
            .unwrap()
            .entry(stamp.id())
            .or_insert_with(|| vec![false; self.cluster_size]);
        self.notify();
    }

    fn is_deliverable(&self, task: &SequencedWrite) -> bool {
        let stamp = task.stamp();
        let queue = self.queue.lock().unwrap();
        let at_head = queue.keys().next() == Some(&stamp);
        let acks = self.acks.lock().unwrap();
        at_head
            && acks
                .get(&stamp.id())
                .map_or(false, |slots| slots.iter().all(|&acked| acked))
    }
}
