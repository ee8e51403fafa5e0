use crate::{
    messages::{BroadcastWrite, ConsistencyMode, WriteRequest, WriteResponse, WriteStamp},
    nodes::{publish_message, worker::WorkerNode},
    scheduler::{BcastWriteTask, CausalTask, Scheduler},
};

impl WorkerNode {
    /// Handles a client write forwarded by the coordinator.
    ///
    /// The response acknowledges receipt only; replication to the peers runs
    /// in the background.
    pub async fn write_handler(&self, request: WriteRequest) -> eyre::Result<()> {
        match request.mode {
            ConsistencyMode::Sequential => {
                // stamp the write and replicate it to every worker, ourselves
                // included, so the local copy and the local ack take the same
                // paths as the remote ones
                let stamp = self.sequential.increment_and_get();
                BcastWriteTask::new(
                    self.zenoh.clone(),
                    self.zenoh_prefix.clone(),
                    self.cluster_size,
                    BroadcastWrite {
                        mode: ConsistencyMode::Sequential,
                        sender: self.worker_id,
                        stamp: WriteStamp::Sequential(stamp.counter),
                        key: request.key.clone(),
                        value: request.value.clone(),
                    },
                )
                .spawn();
            }
            ConsistencyMode::Causal => {
                // the scheduler stamps the write when it picks the task up
                let task = BcastWriteTask::new(
                    self.zenoh.clone(),
                    self.zenoh_prefix.clone(),
                    self.cluster_size,
                    BroadcastWrite {
                        mode: ConsistencyMode::Causal,
                        sender: self.worker_id,
                        stamp: WriteStamp::Causal(vec![0; self.cluster_size]),
                        key: request.key.clone(),
                        value: request.value.clone(),
                    },
                );
                self.causal.add_task(CausalTask::Issue(task));
            }
        }

        let response = WriteResponse {
            receiver: self.worker_id,
            status: 0,
        };
        publish_message(&self.zenoh, &request.response_topic, &response).await
    }
}
