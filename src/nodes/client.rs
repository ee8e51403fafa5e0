//! An interactive client for submitting writes and point reads.

use crate::{
    config::Config,
    messages::{ConsistencyMode, ReadRequest, ReadResponse, WriteRequest, WriteResponse},
    topics::{ClientThread, CoordinatorThread, WorkerThread},
    LockstepError, ZenohValueAsString,
};
use eyre::{eyre, Context};
use rand::Rng;
use std::{
    io::{BufRead, Write},
    sync::Arc,
    time::Duration,
};
use zenoh::prelude::{Receiver, ZFuture};

const RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

/// A parsed client command.
#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    /// Write `key = value` under the given consistency mode.
    Put {
        mode: ConsistencyMode,
        key: &'a str,
        value: &'a str,
    },
    /// Read `key` from the given worker, or from a random one.
    Get { key: &'a str, worker: Option<usize> },
    Quit,
    Empty,
    Unknown,
}

fn parse_command(line: &str) -> Command<'_> {
    let parts: Vec<_> = line.split_whitespace().collect();
    match parts.as_slice() {
        [] => Command::Empty,
        ["quit"] | ["exit"] => Command::Quit,
        ["put", key, value] => Command::Put {
            mode: ConsistencyMode::Sequential,
            key,
            value,
        },
        ["cput", key, value] => Command::Put {
            mode: ConsistencyMode::Causal,
            key,
            value,
        },
        ["get", key] => Command::Get { key, worker: None },
        ["get", key, worker] => match worker.parse() {
            Ok(worker) => Command::Get {
                key,
                worker: Some(worker),
            },
            Err(_) => Command::Unknown,
        },
        _ => Command::Unknown,
    }
}

/// Runs an interactive `kv>` prompt on the given input/output streams.
///
/// Writes go through the coordinator; reads go directly to a worker. Every
/// request is answered on a per-client response topic, with a timeout.
pub fn run_interactive(
    config: &Config,
    input: &mut dyn BufRead,
    output: &mut dyn Write,
    error_output: &mut dyn Write,
    zenoh: Arc<zenoh::Session>,
    zenoh_prefix: String,
) -> eyre::Result<()> {
    let node_id = format!("client-{}", uuid::Uuid::new_v4());
    let response_topic = ClientThread::new(node_id).response_topic(&zenoh_prefix);
    let mut subscriber = zenoh
        .subscribe(&response_topic)
        .wait()
        .map_err(|e| eyre!(e))
        .context("failed to declare response subscriber")?;

    let mut line = String::new();
    loop {
        write!(output, "kv> ").context("failed to write prompt")?;
        output.flush().context("failed to flush prompt")?;

        line.clear();
        if input.read_line(&mut line).context("failed to read input")? == 0 {
            break;
        }

        let result = match parse_command(&line) {
            Command::Empty => Ok(()),
            Command::Quit => break,
            Command::Put { mode, key, value } => put(
                &zenoh,
                &zenoh_prefix,
                &mut subscriber,
                &response_topic,
                mode,
                key,
                value,
                output,
            ),
            Command::Get { key, worker } => {
                let worker =
                    worker.unwrap_or_else(|| rand::thread_rng().gen_range(0..config.workers));
                if worker >= config.workers {
                    writeln!(error_output, "No such worker: {}", worker)
                        .context("failed to write error")?;
                    Ok(())
                } else {
                    get(
                        &zenoh,
                        &zenoh_prefix,
                        &mut subscriber,
                        &response_topic,
                        worker,
                        key,
                        output,
                    )
                }
            }
            Command::Unknown => {
                writeln!(error_output, "Unknown command: `{}`", line.trim())
                    .context("failed to write error")?;
                Ok(())
            }
        };
        if let Err(err) = result {
            writeln!(error_output, "Error: {:?}", err).context("failed to write error")?;
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn put(
    zenoh: &zenoh::Session,
    zenoh_prefix: &str,
    subscriber: &mut zenoh::subscriber::Subscriber<'_>,
    response_topic: &str,
    mode: ConsistencyMode,
    key: &str,
    value: &str,
    output: &mut dyn Write,
) -> eyre::Result<()> {
    let request = WriteRequest {
        mode,
        key: key.into(),
        value: value.to_owned(),
        response_topic: response_topic.to_owned(),
    };
    let serialized =
        serde_json::to_string(&request).context("failed to serialize write request")?;
    zenoh
        .put(&CoordinatorThread::write_topic(zenoh_prefix), serialized.as_str())
        .wait()
        .map_err(|e| eyre!(e))
        .context("failed to submit write request")?;

    let sample = subscriber
        .receiver()
        .recv_timeout(RESPONSE_TIMEOUT)
        .map_err(|_| eyre!("timed out waiting for a write response"))?;
    let response: WriteResponse = serde_json::from_str(&sample.value.as_string()?)
        .context("failed to deserialize write response")?;

    if response.status == 0 {
        writeln!(output, "OK").context("failed to write result")?;
    } else {
        writeln!(output, "Rejected with status {}", response.status)
            .context("failed to write result")?;
    }
    Ok(())
}

fn get(
    zenoh: &zenoh::Session,
    zenoh_prefix: &str,
    subscriber: &mut zenoh::subscriber::Subscriber<'_>,
    response_topic: &str,
    worker: usize,
    key: &str,
    output: &mut dyn Write,
) -> eyre::Result<()> {
    let request = ReadRequest {
        key: key.into(),
        response_topic: response_topic.to_owned(),
    };
    let serialized = serde_json::to_string(&request).context("failed to serialize read request")?;
    zenoh
        .put(
            &WorkerThread::new(worker).read_topic(zenoh_prefix),
            serialized.as_str(),
        )
        .wait()
        .map_err(|e| eyre!(e))
        .context("failed to submit read request")?;

    let sample = subscriber
        .receiver()
        .recv_timeout(RESPONSE_TIMEOUT)
        .map_err(|_| eyre!("timed out waiting for a read response"))?;
    let response: ReadResponse = serde_json::from_str(&sample.value.as_string()?)
        .context("failed to deserialize read response")?;

    match response.value {
        Ok(value) => writeln!(output, "{}", value).context("failed to write result")?,
        Err(LockstepError::KeyDoesNotExist) => {
            writeln!(output, "(nil)").context("failed to write result")?
        }
        Err(err) => writeln!(output, "Error: {}", err).context("failed to write result")?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_parse() {
        assert_eq!(
            parse_command("put a 1\n"),
            Command::Put {
                mode: ConsistencyMode::Sequential,
                key: "a",
                value: "1"
            }
        );
        assert_eq!(
            parse_command("cput x hello"),
            Command::Put {
                mode: ConsistencyMode::Causal,
                key: "x",
                value: "hello"
            }
        );
        assert_eq!(
            parse_command("get a"),
            Command::Get {
                key: "a",
                worker: None
            }
        );
        assert_eq!(
            parse_command("get a 2"),
            Command::Get {
                key: "a",
                worker: Some(2)
            }
        );
        assert_eq!(parse_command("  \n"), Command::Empty);
        assert_eq!(parse_command("quit"), Command::Quit);
        assert_eq!(parse_command("put a"), Command::Unknown);
        assert_eq!(parse_command("get a x"), Command::Unknown);
    }
}
