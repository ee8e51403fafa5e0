#![warn(missing_docs)]

//! A small replicated key-value store built around a delivery-ordering layer,
//! using [`zenoh`](https://zenoh.io/) for communication.
//!
//! Clients submit writes to any worker; every write is replicated to every
//! peer; each peer applies writes in an order that satisfies the consistency
//! mode chosen per request:
//!
//! - **Sequential:** all replicas apply all writes in the same total order,
//!   implemented with Lamport scalar clocks and an acknowledgement-counting
//!   protocol.
//! - **Causal:** replicas respect happens-before, implemented with vector
//!   clocks.
//!
//! ## Usage Example
//!
//! Open several terminal windows and run the following commands in them (one
//! per terminal window):
//!
//! 1. `cargo run --bin logger` to start the zenoh logger, so that we can see
//!    the messages that are sent. This step is optional.
//! 2. `cargo run --bin coordinator -- example-config.yml` to start the
//!    [coordinator node](nodes::coordinator).
//! 3. `cargo run --bin worker -- example-config.yml <id>` once per entry of
//!    the configured cluster (ids `0`, `1`, ... ) to start the
//!    [worker nodes](nodes::worker).
//! 4. `cargo run --bin client -- example-config.yml` to start the interactive
//!    [client](nodes::client).
//!
//! The client executable shows a `kv>` prompt, in which you can use
//! `put <key> <value>` to issue a sequentially consistent write,
//! `cput <key> <value>` for a causally consistent write, and
//! `get <key> [worker]` to read a key back from a worker.

pub use lockstep_api::{clock, ClientKey, LockstepError};

use eyre::Context;
use std::sync::Arc;

pub mod config;
pub mod messages;
pub mod nodes;
pub mod scheduler;
pub mod store;
pub mod topics;

/// The default zenoh prefix under which all lockstep topics live.
pub fn lockstep_default_zenoh_prefix() -> &'static str {
    "lockstep"
}

/// Helper trait for extracting the payload of zenoh values as strings.
pub trait ZenohValueAsString {
    /// Returns the value's payload interpreted as a UTF-8 string.
    fn as_string(&self) -> eyre::Result<String>;
}

impl ZenohValueAsString for zenoh::prelude::Value {
    fn as_string(&self) -> eyre::Result<String> {
        use zenoh::prelude::SplitBuffer;

        String::from_utf8(self.payload.contiguous().into_owned())
            .context("value payload is not valid utf8")
    }
}

/// Returns a process-wide zenoh session for tests.
///
/// All test nodes share a single session, so messages are routed locally and
/// tests do not depend on network discovery.
pub fn zenoh_test_instance() -> Arc<zenoh::Session> {
    use once_cell::sync::Lazy;
    use zenoh::prelude::ZFuture;

    static INSTANCE: Lazy<Arc<zenoh::Session>> = Lazy::new(|| {
        Arc::new(
            zenoh::open(zenoh::config::Config::default())
                .wait()
                .expect("failed to open zenoh test session"),
        )
    });
    INSTANCE.clone()
}
