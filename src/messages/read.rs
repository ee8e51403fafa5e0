use crate::{ClientKey, LockstepError};

/// A point read of a single key, sent directly to a worker.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ReadRequest {
    /// The key to look up.
    pub key: ClientKey,
    /// The topic on which the worker should publish the [`ReadResponse`].
    pub response_topic: String,
}

/// The answer to a [`ReadRequest`].
///
/// Reads observe the worker's live map, i.e. only writes that were already
/// delivered there.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ReadResponse {
    /// The id of the worker that answered.
    pub receiver: usize,
    /// The stored value, or the error that prevented the read.
    pub value: Result<String, LockstepError>,
}
