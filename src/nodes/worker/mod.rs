//! Worker nodes host the delivery schedulers and the data store.
//!
//! Every worker runs three threads of execution: the event loop that handles
//! incoming messages, and one delivery loop per scheduler. The event loop
//! only ever *enqueues* work; deciding when a write becomes visible is the
//! schedulers' job.

use crate::{
    clock::{ScalarClock, VectorClock},
    config::Config,
    messages::{ServerStatus, WorkerStatus},
    nodes::publish_message,
    scheduler::{CausalScheduler, SequentialScheduler},
    store::KeyValueStore,
    topics::{CoordinatorThread, WorkerThread},
    ZenohValueAsString,
};
use eyre::{bail, eyre, Context};
use futures::{future::FusedFuture, Future, FutureExt, StreamExt};
use std::{mem, sync::Arc};

mod handlers;

/// Starts a worker node with the given id, based on the given config.
///
/// Blocks until one of the worker's threads fails. Spawns three threads: the
/// event loop plus one dedicated delivery thread per scheduler.
pub fn run(
    config: &Config,
    zenoh: Arc<zenoh::Session>,
    zenoh_prefix: String,
    worker_id: usize,
) -> eyre::Result<()> {
    if worker_id >= config.workers {
        bail!(
            "worker id {} is out of range for a cluster of {} workers",
            worker_id,
            config.workers
        );
    }
    log::info!("Worker {} starting up..", worker_id);

    let cluster_size = config.cluster_size();
    let store = KeyValueStore::default();
    let sequential = Arc::new(SequentialScheduler::new(
        ScalarClock::new(worker_id),
        cluster_size,
        store.clone(),
    ));
    let causal = Arc::new(CausalScheduler::new(
        VectorClock::new(cluster_size, worker_id),
        store.clone(),
    ));

    crossbeam_utils::thread::scope(|s| {
        let (shutdown_tx, shutdown) = smol::channel::unbounded::<()>();
        let (result_tx, task_errors) = smol::channel::unbounded();

        // sequential delivery loop
        {
            let sequential = sequential.clone();
            let result_tx = result_tx.clone();
            let mut shutdown = shutdown.clone();
            s.spawn(move |_| {
                smol::block_on(async move {
                    let task = sequential
                        .run(shutdown.next().map(|_| ()))
                        .await
                        .context("sequential delivery loop failed");
                    match task {
                        Ok(()) => {}
                        Err(err) => {
                            let _ = result_tx.send(err).await;
                        }
                    }
                })
            });
        }

        // causal delivery loop
        {
            let causal = causal.clone();
            let result_tx = result_tx.clone();
            let mut shutdown = shutdown.clone();
            s.spawn(move |_| {
                smol::block_on(async move {
                    let task = causal
                        .run(shutdown.next().map(|_| ()))
                        .await
                        .context("causal delivery loop failed");
                    match task {
                        Ok(()) => {}
                        Err(err) => {
                            let _ = result_tx.send(err).await;
                        }
                    }
                })
            });
        }

        // event loop
        {
            let node = WorkerNode::new(
                worker_id,
                cluster_size,
                sequential.clone(),
                causal.clone(),
                store.clone(),
                zenoh.clone(),
                zenoh_prefix.clone(),
            );
            let result_tx = result_tx.clone();
            let mut shutdown = shutdown.clone();
            s.spawn(move |_| {
                smol::block_on(async move {
                    let task = node
                        .run(shutdown.next().map(|_| ()))
                        .await
                        .context(format!("worker {} event loop failed", worker_id));
                    match task {
                        Ok(()) => {}
                        Err(err) => {
                            let _ = result_tx.send(err).await;
                        }
                    }
                })
            });
        }

        mem::drop(result_tx);
        mem::drop(shutdown);

        smol::block_on(task_errors.recv().map(|recv_result| match recv_result {
            Ok(error) => {
                shutdown_tx.close();
                Err(error)
            }
            Err(smol::channel::RecvError) => Ok(()),
        }))
    })
    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))?;

    Ok(())
}

/// A worker node's event loop state.
pub struct WorkerNode {
    /// The id of this worker, i.e. its index in the cluster.
    worker_id: usize,
    /// The fixed number of workers in the cluster.
    cluster_size: usize,
    /// Used for addressing itself.
    wt: WorkerThread,

    /// Used for communicating with other nodes.
    zenoh: Arc<zenoh::Session>,
    zenoh_prefix: String,

    /// Orders sequentially consistent writes.
    sequential: Arc<SequentialScheduler>,
    /// Orders causally consistent writes.
    causal: Arc<CausalScheduler>,
    /// The live map that delivered writes are applied to.
    store: KeyValueStore,
}

impl WorkerNode {
    fn new(
        worker_id: usize,
        cluster_size: usize,
        sequential: Arc<SequentialScheduler>,
        causal: Arc<CausalScheduler>,
        store: KeyValueStore,
        zenoh: Arc<zenoh::Session>,
        zenoh_prefix: String,
    ) -> Self {
        Self {
            worker_id,
            cluster_size,
            wt: WorkerThread::new(worker_id),
            zenoh,
            zenoh_prefix,
            sequential,
            causal,
            store,
        }
    }

    /// Starts the worker's event loop.
    pub async fn run(
        self,
        mut shutdown_signal: impl Future<Output = ()> + FusedFuture + Unpin,
    ) -> eyre::Result<()> {
        let zenoh = self.zenoh.clone();

        // responsible for client writes forwarded by the coordinator
        let mut write_subscriber = zenoh
            .subscribe(&self.wt.write_topic(&self.zenoh_prefix))
            .await
            .map_err(|e| eyre!(e))
            .context("failed to declare write subscriber")?;
        let mut write_stream = write_subscriber.receiver().fuse();

        // responsible for broadcast writes from peers
        let mut bcast_subscriber = zenoh
            .subscribe(&self.wt.bcast_write_topic(&self.zenoh_prefix))
            .await
            .map_err(|e| eyre!(e))
            .context("failed to declare bcast write subscriber")?;
        let mut bcast_stream = bcast_subscriber.receiver().fuse();

        // responsible for acknowledgements of sequential writes
        let mut ack_subscriber = zenoh
            .subscribe(&self.wt.ack_topic(&self.zenoh_prefix))
            .await
            .map_err(|e| eyre!(e))
            .context("failed to declare ack subscriber")?;
        let mut ack_stream = ack_subscriber.receiver().fuse();

        // responsible for point reads
        let mut read_subscriber = zenoh
            .subscribe(&self.wt.read_topic(&self.zenoh_prefix))
            .await
            .map_err(|e| eyre!(e))
            .context("failed to declare read subscriber")?;
        let mut read_stream = read_subscriber.receiver().fuse();

        // all subscriptions are in place, so the coordinator may start
        // routing writes our way
        self.report_status(ServerStatus::Ready)
            .await
            .context("failed to report readiness to the coordinator")?;

        loop {
            futures::select! {
                sample = write_stream.select_next_some() => {
                    match serde_json::from_str(&sample.value.as_string()?) {
                        Ok(message) => self
                            .write_handler(message)
                            .await
                            .context("failed to handle write")?,
                        Err(err) => log::warn!("invalid write request: {}", err),
                    }
                },
                sample = bcast_stream.select_next_some() => {
                    match serde_json::from_str(&sample.value.as_string()?) {
                        Ok(message) => self.bcast_write_handler(message),
                        Err(err) => log::warn!("invalid broadcast write: {}", err),
                    }
                },
                sample = ack_stream.select_next_some() => {
                    match serde_json::from_str(&sample.value.as_string()?) {
                        Ok(message) => self.ack_handler(message),
                        Err(err) => log::warn!("invalid ack: {}", err),
                    }
                },
                sample = read_stream.select_next_some() => {
                    match serde_json::from_str(&sample.value.as_string()?) {
                        Ok(message) => self
                            .read_handler(message)
                            .await
                            .context("failed to handle read")?,
                        Err(err) => log::warn!("invalid read request: {}", err),
                    }
                },
                () = shutdown_signal => break,
                complete => break,
            }
        }

        if let Err(err) = self.report_status(ServerStatus::Down).await {
            log::warn!("failed to report shutdown to the coordinator: {:?}", err);
        }
        Ok(())
    }

    async fn report_status(&self, status: ServerStatus) -> eyre::Result<()> {
        publish_message(
            &self.zenoh,
            &CoordinatorThread::status_topic(&self.zenoh_prefix),
            &WorkerStatus {
                worker_id: self.worker_id,
                status,
            },
        )
        .await
    }
}

#[cfg(test)]
pub(crate) fn worker_test_instance(
    zenoh: Arc<zenoh::Session>,
    zenoh_prefix: String,
    worker_id: usize,
    cluster_size: usize,
) -> WorkerNode {
    let store = KeyValueStore::default();
    let sequential = Arc::new(SequentialScheduler::new(
        ScalarClock::new(worker_id),
        cluster_size,
        store.clone(),
    ));
    let causal = Arc::new(CausalScheduler::new(
        VectorClock::new(cluster_size, worker_id),
        store.clone(),
    ));
    WorkerNode::new(
        worker_id,
        cluster_size,
        sequential,
        causal,
        store,
        zenoh,
        zenoh_prefix,
    )
}
