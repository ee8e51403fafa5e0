//! Types for parsing lockstep configuration files.
//!
//! The top level config type is [`Config`].

use serde::{Deserialize, Serialize};

/// The top level config type.
///
/// This type can be read and written to config files using the
/// [`serde::Serialize`] and [`serde::Deserialize`] implementations. The
/// cluster shape is fixed for the lifetime of every process that reads it.
#[derive(Debug, Eq, PartialEq, Hash, Clone, Copy, Serialize, Deserialize)]
pub struct Config {
    /// The number of workers in the cluster.
    ///
    /// Worker ids are the indices `0..workers`; each worker process is told
    /// its id on the command line and derives its topics from it.
    pub workers: usize,
}

impl Config {
    /// The number of replicas every write is broadcast to.
    pub fn cluster_size(&self) -> usize {
        self.workers
    }
}
