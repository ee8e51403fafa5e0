use crate::{
    messages::{ReadRequest, ReadResponse},
    nodes::{publish_message, worker::WorkerNode},
    LockstepError,
};

impl WorkerNode {
    /// Handles a point read of the live map.
    ///
    /// Reads only observe writes that were already delivered at this worker;
    /// a write that is still queued in a scheduler is invisible.
    pub async fn read_handler(&self, request: ReadRequest) -> eyre::Result<()> {
        let value = self
            .store
            .get(&request.key)
            .ok_or(LockstepError::KeyDoesNotExist);
        let response = ReadResponse {
            receiver: self.worker_id,
            value,
        };
        publish_message(&self.zenoh, &request.response_topic, &response).await
    }
}
