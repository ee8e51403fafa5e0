/// Lifecycle states a worker reports to the coordinator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ServerStatus {
    /// The worker is subscribed to its topics and accepts writes.
    Ready,
    /// The worker is shutting down.
    Down,
}

/// A worker status report, sent to the coordinator on startup and shutdown.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct WorkerStatus {
    /// The id of the reporting worker.
    pub worker_id: usize,
    /// The reported lifecycle state.
    pub status: ServerStatus,
}
