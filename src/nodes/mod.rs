//! Abstractions for the node roles: the [`coordinator`] that routes client
//! writes, the [`worker`]s that host the schedulers and the store, and the
//! interactive [`client`].

use eyre::{eyre, Context};

pub mod client;
pub mod coordinator;
pub mod worker;

/// Serializes the given message as JSON and publishes it on the given topic.
///
/// All inter-node messages should be sent using this function, to ensure that
/// they are all published in the same format.
pub async fn publish_message<T: serde::Serialize>(
    zenoh: &zenoh::Session,
    topic: &str,
    message: &T,
) -> eyre::Result<()> {
    let serialized = serde_json::to_string(message).context("failed to serialize message")?;
    zenoh
        .put(topic, serialized.as_str())
        .await
        .map_err(|e| eyre!(e))
        .with_context(|| format!("failed to publish message on `{}`", topic))
}
