use super::ConsistencyMode;
use crate::ClientKey;

/// The originator timestamp attached to a [`BroadcastWrite`]: a scalar
/// Lamport counter for sequential writes, a vector snapshot for causal ones.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum WriteStamp {
    /// The sender's scalar clock value at issue time.
    Sequential(u64),
    /// The sender's vector clock snapshot at issue time.
    Causal(Vec<u64>),
}

/// A write replicated from the accepting worker to its peers.
///
/// The stamp variant must agree with the declared `mode`; receivers reject
/// broadcasts where the two disagree as a protocol violation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BroadcastWrite {
    /// The consistency discipline the write was issued under.
    pub mode: ConsistencyMode,
    /// The id of the worker that accepted and stamped the write.
    pub sender: usize,
    /// The originator timestamp of the write.
    pub stamp: WriteStamp,
    /// The key to write.
    pub key: ClientKey,
    /// The value to store under `key`.
    pub value: String,
}

impl BroadcastWrite {
    /// The consistency mode the stamp variant encodes, for validation against
    /// the declared [`mode`][Self::mode].
    pub fn stamp_mode(&self) -> ConsistencyMode {
        match self.stamp {
            WriteStamp::Sequential(_) => ConsistencyMode::Sequential,
            WriteStamp::Causal(_) => ConsistencyMode::Causal,
        }
    }
}
