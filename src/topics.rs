//! Defines the zenoh topic paths that should be used for messages.
//!
//! Allows to address specific nodes of the cluster.

// The topic on which workers listen for client write requests forwarded by
// the coordinator.
const WRITE_TOPIC: &str = "write";

// The topic on which workers listen for broadcast writes from their peers.
const BCAST_WRITE_TOPIC: &str = "bcast_write";

// The topic on which workers listen for acknowledgements of broadcast
// writes (sequential mode only).
const ACK_TOPIC: &str = "ack";

// The topic on which workers listen for point-read requests.
const READ_TOPIC: &str = "read";

// The topic on which the coordinator receives client write requests.
const COORDINATOR_WRITE_TOPIC: &str = "coordinator/write";

// The topic on which the coordinator receives worker status reports.
const COORDINATOR_STATUS_TOPIC: &str = "coordinator/status";

// The topic on which clients receive write and read responses.
const CLIENT_RESPONSE_TOPIC: &str = "response";

/// Provides the topic paths for addressing a specific _worker_ node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct WorkerThread {
    /// The id of the addressed worker, i.e. its index in the cluster.
    pub worker_id: usize,
}

impl WorkerThread {
    /// Address the worker with the given id.
    pub fn new(worker_id: usize) -> Self {
        Self { worker_id }
    }

    /// The topic on which [`WriteRequest`][crate::messages::WriteRequest]
    /// messages are forwarded to this worker.
    pub fn write_topic(&self, prefix: &str) -> String {
        format!("{}/worker/{}/{}", prefix, self.worker_id, WRITE_TOPIC)
    }

    /// The topic on which [`BroadcastWrite`][crate::messages::BroadcastWrite]
    /// messages from peers are sent to this worker.
    pub fn bcast_write_topic(&self, prefix: &str) -> String {
        format!("{}/worker/{}/{}", prefix, self.worker_id, BCAST_WRITE_TOPIC)
    }

    /// The topic on which [`Acknowledge`][crate::messages::Acknowledge]
    /// messages are sent to this worker.
    pub fn ack_topic(&self, prefix: &str) -> String {
        format!("{}/worker/{}/{}", prefix, self.worker_id, ACK_TOPIC)
    }

    /// The topic on which [`ReadRequest`][crate::messages::ReadRequest]
    /// messages are sent to this worker.
    pub fn read_topic(&self, prefix: &str) -> String {
        format!("{}/worker/{}/{}", prefix, self.worker_id, READ_TOPIC)
    }
}

/// Provides the topic paths for addressing the _coordinator_ node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoordinatorThread;

impl CoordinatorThread {
    /// The topic on which clients submit
    /// [`WriteRequest`][crate::messages::WriteRequest] messages.
    pub fn write_topic(prefix: &str) -> String {
        format!("{}/{}", prefix, COORDINATOR_WRITE_TOPIC)
    }

    /// The topic on which workers report their
    /// [`WorkerStatus`][crate::messages::WorkerStatus] to the coordinator.
    pub fn status_topic(prefix: &str) -> String {
        format!("{}/{}", prefix, COORDINATOR_STATUS_TOPIC)
    }
}

/// Provides the topic paths for addressing a specific _client_ node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientThread {
    /// The node id of the client node.
    pub node_id: String,
}

impl ClientThread {
    /// Address the given client node.
    pub fn new(node_id: String) -> Self {
        Self { node_id }
    }

    /// The topic on which [`WriteResponse`][crate::messages::WriteResponse]
    /// and [`ReadResponse`][crate::messages::ReadResponse] messages should be
    /// sent in reply to requests.
    ///
    /// Clients pass this topic as the reply topic of their requests.
    pub fn response_topic(&self, prefix: &str) -> String {
        format!("{}/client/{}/{}", prefix, self.node_id, CLIENT_RESPONSE_TOPIC)
    }
}
