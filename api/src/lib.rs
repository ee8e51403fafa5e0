//! Client-visible vocabulary of the `lockstep` key-value store: the key type,
//! the message-level error type, and the logical clock types that order
//! replicated writes.

use std::{error::Error, fmt, sync::Arc};

pub mod clock;

/// Key under which a value is stored.
///
/// A key travels with every broadcast and acknowledgement of a write, so it
/// is cloned on each hop through the cluster. Backing it with a shared
/// `Arc<str>` turns those clones into reference-count bumps instead of fresh
/// string allocations.
#[derive(Debug, PartialEq, Eq, Hash, Clone, serde::Serialize, serde::Deserialize)]
pub struct ClientKey(Arc<str>);

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientKey {
    fn from(key: &str) -> Self {
        Self(Arc::from(key))
    }
}

/// Used to signal errors in messages.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub enum LockstepError {
    /// The requested key does not exist.
    KeyDoesNotExist,
    /// The timestamp of a broadcast write does not match its declared
    /// consistency mode.
    ModeMismatch,
    /// A vector timestamp did not have one entry per cluster member.
    VectorLength,
    /// The sender id of the message is not a valid cluster member index.
    UnknownSender,
    /// Failed to serialize a message.
    Serialize,
}

impl fmt::Display for LockstepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyDoesNotExist => write!(f, "The requested key does not exist."),
            Self::ModeMismatch => write!(
                f,
                "The timestamp of the broadcast write does not match its declared consistency mode."
            ),
            Self::VectorLength => write!(
                f,
                "A vector timestamp did not have one entry per cluster member."
            ),
            Self::UnknownSender => {
                write!(f, "The sender id is not a valid cluster member index.")
            }
            Self::Serialize => write!(f, "Serialization error."),
        }
    }
}

impl Error for LockstepError {}

impl From<serde_json::Error> for LockstepError {
    fn from(_: serde_json::Error) -> Self {
        Self::Serialize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_keys_from_different_allocations() {
        let a = ClientKey::from("balance");
        let b = ClientKey::from(String::from("balance").as_str());
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "balance");
    }
}
