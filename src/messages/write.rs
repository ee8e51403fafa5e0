use super::ConsistencyMode;
use crate::ClientKey;

/// A client write, submitted to the coordinator and forwarded verbatim to a
/// randomly chosen worker.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct WriteRequest {
    /// The consistency discipline the write should be replicated under.
    pub mode: ConsistencyMode,
    /// The key to write.
    pub key: ClientKey,
    /// The value to store under `key`.
    pub value: String,
    /// The topic on which the accepting worker should publish the
    /// [`WriteResponse`].
    pub response_topic: String,
}

/// The answer to a [`WriteRequest`].
///
/// A response acknowledges *receipt* of the write by a worker, not its
/// delivery; replication continues in the background.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct WriteResponse {
    /// The id of the worker that accepted the write.
    pub receiver: usize,
    /// Status code; `0` means the write was accepted.
    pub status: i32,
}
