//! Outbound fan-out tasks that dispatch one message per peer.
//!
//! Both task types publish to every addressed peer concurrently and treat
//! per-peer failures as transport losses: they are logged and ignored, the
//! fan-out never awaits a quorum. [`spawn`][BcastWriteTask::spawn] detaches
//! the fan-out onto the executor so that a slow peer never delays the caller.

use crate::{
    messages::{Acknowledge, BroadcastWrite, WriteStamp},
    nodes::publish_message,
    topics::WorkerThread,
};
use futures::{stream::FuturesUnordered, StreamExt};
use std::sync::Arc;

/// Replicates a [`BroadcastWrite`] to the cluster.
pub struct BcastWriteTask {
    zenoh: Arc<zenoh::Session>,
    zenoh_prefix: String,
    cluster_size: usize,
    exclude: Option<usize>,
    message: BroadcastWrite,
}

impl BcastWriteTask {
    /// Creates a fan-out of `message` to all `cluster_size` workers,
    /// including the sender itself.
    pub fn new(
        zenoh: Arc<zenoh::Session>,
        zenoh_prefix: String,
        cluster_size: usize,
        message: BroadcastWrite,
    ) -> Self {
        Self {
            zenoh,
            zenoh_prefix,
            cluster_size,
            exclude: None,
            message,
        }
    }

    /// Leaves the given worker out of the fan-out.
    ///
    /// Used in causal mode, where the issuing worker applies the write
    /// locally at issue time and must not receive its own broadcast.
    pub fn excluding(mut self, worker_id: usize) -> Self {
        self.exclude = Some(worker_id);
        self
    }

    /// The message this task will replicate.
    pub fn message(&self) -> &BroadcastWrite {
        &self.message
    }

    /// Replaces the originator timestamp of the carried message.
    ///
    /// Causal writes are created zero-stamped and receive their real stamp
    /// from the scheduler at issue time.
    pub fn set_stamp(&mut self, stamp: WriteStamp) {
        self.message.stamp = stamp;
    }

    /// Publishes the message to each addressed peer, concurrently.
    pub async fn run(self) {
        let BcastWriteTask {
            zenoh,
            zenoh_prefix,
            cluster_size,
            exclude,
            message,
        } = self;

        let mut sends: FuturesUnordered<_> = (0..cluster_size)
            .filter(|&peer| exclude != Some(peer))
            .map(|peer| {
                let zenoh = &zenoh;
                let zenoh_prefix = &zenoh_prefix;
                let message = &message;
                async move {
                    let topic = WorkerThread::new(peer).bcast_write_topic(zenoh_prefix);
                    (peer, publish_message(zenoh, &topic, message).await)
                }
            })
            .collect();
        while let Some((peer, result)) = sends.next().await {
            if let Err(err) = result {
                log::warn!("failed to broadcast write to worker {}: {:?}", peer, err);
            }
        }
    }

    /// Runs the fan-out as a detached background task.
    pub fn spawn(self) {
        smol::spawn(self.run()).detach();
    }
}

/// Replicates an [`Acknowledge`] to the cluster, including the sender itself.
///
/// Sequential mode only. The self-addressed copy is intentional: the local
/// acknowledgement takes the same path as the remote ones, so the ack table
/// never needs a special case for the local slot.
pub struct BcastAckTask {
    zenoh: Arc<zenoh::Session>,
    zenoh_prefix: String,
    cluster_size: usize,
    ack: Acknowledge,
}

impl BcastAckTask {
    /// Creates a fan-out of `ack` to all `cluster_size` workers.
    pub fn new(
        zenoh: Arc<zenoh::Session>,
        zenoh_prefix: String,
        cluster_size: usize,
        ack: Acknowledge,
    ) -> Self {
        Self {
            zenoh,
            zenoh_prefix,
            cluster_size,
            ack,
        }
    }

    /// Publishes the acknowledgement to every worker, concurrently.
    pub async fn run(self) {
        let BcastAckTask {
            zenoh,
            zenoh_prefix,
            cluster_size,
            ack,
        } = self;

        let mut sends: FuturesUnordered<_> = (0..cluster_size)
            .map(|peer| {
                let zenoh = &zenoh;
                let zenoh_prefix = &zenoh_prefix;
                let ack = &ack;
                async move {
                    let topic = WorkerThread::new(peer).ack_topic(zenoh_prefix);
                    (peer, publish_message(zenoh, &topic, ack).await)
                }
            })
            .collect();
        while let Some((peer, result)) = sends.next().await {
            if let Err(err) = result {
                log::warn!(
                    "failed to send ack for {} to worker {}: {:?}",
                    ack.stamp.id(),
                    peer,
                    err
                );
            }
        }
    }

    /// Runs the fan-out as a detached background task.
    pub fn spawn(self) {
        smol::spawn(self.run()).detach();
    }
}
