use crate::clock::ScalarStamp;

/// Acknowledges a sequential [`BroadcastWrite`][super::BroadcastWrite].
///
/// Sent by every worker to every worker (including itself) once the
/// acknowledged write has reached the head of the sender's queue. A write is
/// delivered only after all cluster members have acknowledged it.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Acknowledge {
    /// The id of the worker sending the acknowledgement.
    pub sender: usize,
    /// The sender's scalar clock value when the acknowledgement was issued.
    pub sender_clock: u64,
    /// The stamp of the broadcast write being acknowledged.
    pub stamp: ScalarStamp,
}
