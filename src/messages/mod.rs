//! Defines the message types that are sent between nodes.
//!
//! All messages are serialized with `serde_json` and published on the zenoh
//! topics defined in [`topics`][crate::topics]. Request messages that expect
//! an answer carry the reply topic explicitly.

pub use self::{
    ack::Acknowledge,
    broadcast::{BroadcastWrite, WriteStamp},
    read::{ReadRequest, ReadResponse},
    status::{ServerStatus, WorkerStatus},
    write::{WriteRequest, WriteResponse},
};

mod ack;
mod broadcast;
mod read;
mod status;
mod write;

/// The consistency discipline requested for a write.
///
/// The mode is chosen per request; a single cluster serves both kinds of
/// writes side by side through two independent schedulers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ConsistencyMode {
    /// All replicas apply all writes in the same total order.
    Sequential,
    /// Replicas apply writes in an order that respects happens-before.
    Causal,
}
