//! The coordinator accepts client writes and forwards each one to a uniformly
//! randomly chosen worker.

use crate::{
    config::Config,
    messages::{ServerStatus, WorkerStatus, WriteRequest},
    nodes::publish_message,
    topics::{CoordinatorThread, WorkerThread},
    ZenohValueAsString,
};
use eyre::{eyre, Context};
use futures::{future::FusedFuture, Future, FutureExt, StreamExt};
use rand::Rng;
use std::{collections::HashMap, mem, sync::Arc};

/// Runs a coordinator node based on the supplied config.
pub fn run(config: &Config, zenoh: Arc<zenoh::Session>, zenoh_prefix: String) -> eyre::Result<()> {
    log::info!("Coordinator starting up..");

    let cluster_size = config.cluster_size();

    crossbeam_utils::thread::scope(|s| {
        let (shutdown_tx, shutdown) = smol::channel::unbounded::<()>();
        let (result_tx, task_errors) = smol::channel::unbounded();

        {
            let zenoh = zenoh.clone();
            let zenoh_prefix = zenoh_prefix.clone();
            let result_tx = result_tx.clone();
            let mut shutdown = shutdown.clone();

            let task = async move {
                let node = CoordinatorNode::new(cluster_size, zenoh, zenoh_prefix);
                node.run(shutdown.next().map(|_| ()))
                    .await
                    .context("coordinator event loop failed")
            };
            s.spawn(move |_| {
                smol::block_on(async {
                    match task.await {
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

/// A coordinator node.
///
/// Keeps track of the reported worker statuses and routes each incoming
/// client write to a random worker. The routing is the only policy the
/// coordinator implements; replication and ordering are entirely the
/// workers' concern.
pub struct CoordinatorNode {
    cluster_size: usize,
    cluster_status: HashMap<usize, ServerStatus>,
    zenoh: Arc<zenoh::Session>,
    zenoh_prefix: String,
}

impl CoordinatorNode {
    fn new(cluster_size: usize, zenoh: Arc<zenoh::Session>, zenoh_prefix: String) -> Self {
        Self {
            cluster_size,
            cluster_status: HashMap::new(),
            zenoh,
            zenoh_prefix,
        }
    }

    /// Starts the coordinator's event loop.
    pub async fn run(
        mut self,
        mut shutdown_signal: impl Future<Output = ()> + FusedFuture + Unpin,
    ) -> eyre::Result<()> {
        let zenoh = self.zenoh.clone();

        // responsible for handling client writes
        let mut write_subscriber = zenoh
            .subscribe(&CoordinatorThread::write_topic(&self.zenoh_prefix))
            .await
            .map_err(|e| eyre!(e))
            .context("failed to declare write subscriber")?;
        let mut write_stream = write_subscriber.receiver().fuse();

        // responsible for worker status reports
        let mut status_subscriber = zenoh
            .subscribe(&CoordinatorThread::status_topic(&self.zenoh_prefix))
            .await
            .map_err(|e| eyre!(e))
            .context("failed to declare status subscriber")?;
        let mut status_stream = status_subscriber.receiver().fuse();

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
                sample = status_stream.select_next_some() => {
                    match serde_json::from_str(&sample.value.as_string()?) {
                        Ok(message) => self.status_handler(message),
                        Err(err) => log::warn!("invalid status report: {}", err),
                    }
                },
                () = shutdown_signal => break,
                complete => break,
            }
        }

        Ok(())
    }

    /// Forwards the write to a uniformly randomly chosen worker.
    ///
    /// The client's response topic rides along, so the accepting worker
    /// answers the client directly.
    pub async fn write_handler(&mut self, request: WriteRequest) -> eyre::Result<()> {
        log::info!("{}={}", request.key, request.value);

        let worker = rand::thread_rng().gen_range(0..self.cluster_size);
        publish_message(
            &self.zenoh,
            &WorkerThread::new(worker).write_topic(&self.zenoh_prefix),
            &request,
        )
        .await
    }

    /// Records a worker status report.
    pub fn status_handler(&mut self, status: WorkerStatus) {
        log::info!(
            "Worker {} reported status {:?}",
            status.worker_id,
            status.status
        );
        self.cluster_status.insert(status.worker_id, status.status);
    }
}
