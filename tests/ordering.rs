use lockstep::{
    config::Config,
    messages::{
        ConsistencyMode, ReadRequest, ReadResponse, ServerStatus, WorkerStatus, WriteRequest,
        WriteResponse,
    },
    nodes::{coordinator, worker},
    topics::{ClientThread, CoordinatorThread, WorkerThread},
    zenoh_test_instance, ZenohValueAsString,
};
use eyre::Context;
use pretty_assertions::assert_eq;
use std::{
    collections::HashSet,
    thread,
    time::{Duration, Instant},
};
use zenoh::prelude::{Receiver, ZFuture};

#[test]
fn sequential_writes_converge_on_every_worker() {
    let _ = set_up_logger();

    let config = Config { workers: 3 };
    let zenoh = zenoh_test_instance();
    let zenoh_prefix = uuid::Uuid::new_v4().to_string();

    let mut status_subscriber = zenoh
        .subscribe(&CoordinatorThread::status_topic(&zenoh_prefix))
        .wait()
        .unwrap();

    let _coordinator_thread = {
        let zenoh = zenoh.clone();
        let zenoh_prefix = zenoh_prefix.clone();
        thread::spawn(move || {
            coordinator::run(&config, zenoh, zenoh_prefix)
                .context("Coordinator task failed")
                .unwrap()
        })
    };
    let _worker_threads: Vec<_> = (0..config.workers)
        .map(|worker_id| {
            let zenoh = zenoh.clone();
            let zenoh_prefix = zenoh_prefix.clone();
            thread::spawn(move || {
                worker::run(&config, zenoh, zenoh_prefix, worker_id)
                    .context("Worker task failed")
                    .unwrap()
            })
        })
        .collect();

    // a worker reports readiness only once all its subscriptions are in
    // place; a broadcast sent before that would be lost and stall the
    // sequential queue forever
    await_ready_workers(&mut status_subscriber, config.workers);

    // the writes are retried until the coordinator and a worker answer, so
    // the test does not depend on the coordinator's startup timing
    put_via_coordinator(&zenoh, &zenoh_prefix, ConsistencyMode::Sequential, "a", "1");
    put_via_coordinator(&zenoh, &zenoh_prefix, ConsistencyMode::Sequential, "b", "2");
    put_via_coordinator(&zenoh, &zenoh_prefix, ConsistencyMode::Sequential, "c", "3");

    // every worker must deliver every write, regardless of which worker
    // accepted it
    for worker_id in 0..config.workers {
        await_value(&zenoh, &zenoh_prefix, worker_id, "a", "1");
        await_value(&zenoh, &zenoh_prefix, worker_id, "b", "2");
        await_value(&zenoh, &zenoh_prefix, worker_id, "c", "3");
    }
}

#[test]
fn causal_chain_is_replicated_in_order() {
    let _ = set_up_logger();

    let config = Config { workers: 2 };
    let zenoh = zenoh_test_instance();
    let zenoh_prefix = uuid::Uuid::new_v4().to_string();

    let mut status_subscriber = zenoh
        .subscribe(&CoordinatorThread::status_topic(&zenoh_prefix))
        .wait()
        .unwrap();

    let _worker_threads: Vec<_> = (0..config.workers)
        .map(|worker_id| {
            let zenoh = zenoh.clone();
            let zenoh_prefix = zenoh_prefix.clone();
            thread::spawn(move || {
                worker::run(&config, zenoh, zenoh_prefix, worker_id)
                    .context("Worker task failed")
                    .unwrap()
            })
        })
        .collect();

    await_ready_workers(&mut status_subscriber, config.workers);

    // worker 0 issues x=a; the write is applied there immediately
    put_at_worker(&zenoh, &zenoh_prefix, 0, ConsistencyMode::Causal, "x", "a");
    assert_eq!(
        read_once(&zenoh, &zenoh_prefix, 0, "x"),
        Some("a".to_owned())
    );

    // worker 1 delivers it once the broadcast arrives
    await_value(&zenoh, &zenoh_prefix, 1, "x", "a");

    // a write issued at worker 1 afterwards depends on x=a and must follow
    // it everywhere
    put_at_worker(&zenoh, &zenoh_prefix, 1, ConsistencyMode::Causal, "y", "b");
    assert_eq!(
        read_once(&zenoh, &zenoh_prefix, 1, "y"),
        Some("b".to_owned())
    );
    await_value(&zenoh, &zenoh_prefix, 0, "y", "b");
    await_value(&zenoh, &zenoh_prefix, 0, "x", "a");
}

/// Blocks until `expected` distinct workers have reported readiness.
fn await_ready_workers(
    status_subscriber: &mut zenoh::subscriber::Subscriber<'_>,
    expected: usize,
) {
    let mut ready = HashSet::new();
    while ready.len() < expected {
        let sample = status_subscriber
            .receiver()
            .recv_timeout(Duration::from_secs(10))
            .expect("workers did not become ready in time");
        let status: WorkerStatus =
            serde_json::from_str(&sample.value.as_string().unwrap()).unwrap();
        if status.status == ServerStatus::Ready {
            ready.insert(status.worker_id);
        }
    }
}

/// Submits a write through the coordinator, retrying until a worker confirms
/// receipt.
fn put_via_coordinator(
    zenoh: &zenoh::Session,
    zenoh_prefix: &str,
    mode: ConsistencyMode,
    key: &str,
    value: &str,
) {
    let topic = CoordinatorThread::write_topic(zenoh_prefix);
    put_with_retry(zenoh, zenoh_prefix, &topic, mode, key, value);
}

/// Submits a write directly to the given worker, retrying until it confirms
/// receipt.
fn put_at_worker(
    zenoh: &zenoh::Session,
    zenoh_prefix: &str,
    worker: usize,
    mode: ConsistencyMode,
    key: &str,
    value: &str,
) {
    let topic = WorkerThread::new(worker).write_topic(zenoh_prefix);
    put_with_retry(zenoh, zenoh_prefix, &topic, mode, key, value);
}

fn put_with_retry(
    zenoh: &zenoh::Session,
    zenoh_prefix: &str,
    write_topic: &str,
    mode: ConsistencyMode,
    key: &str,
    value: &str,
) {
    for _ in 0..20 {
        let client = ClientThread::new(format!("test-{}", uuid::Uuid::new_v4()));
        let response_topic = client.response_topic(zenoh_prefix);
        let mut subscriber = zenoh.subscribe(&response_topic).wait().unwrap();

        let request = WriteRequest {
            mode,
            key: key.into(),
            value: value.to_owned(),
            response_topic,
        };
        zenoh
            .put(write_topic, serde_json::to_string(&request).unwrap().as_str())
            .wait()
            .unwrap();

        if let Ok(sample) = subscriber.receiver().recv_timeout(Duration::from_secs(1)) {
            let response: WriteResponse =
                serde_json::from_str(&sample.value.as_string().unwrap()).unwrap();
            assert_eq!(response.status, 0);
            return;
        }
    }
    panic!("write {}={} was never accepted", key, value);
}

/// Performs a single point read at the given worker.
fn read_once(
    zenoh: &zenoh::Session,
    zenoh_prefix: &str,
    worker: usize,
    key: &str,
) -> Option<String> {
    let client = ClientThread::new(format!("test-{}", uuid::Uuid::new_v4()));
    let response_topic = client.response_topic(zenoh_prefix);
    let mut subscriber = zenoh.subscribe(&response_topic).wait().unwrap();

    let request = ReadRequest {
        key: key.into(),
        response_topic,
    };
    zenoh
        .put(
            &WorkerThread::new(worker).read_topic(zenoh_prefix),
            serde_json::to_string(&request).unwrap().as_str(),
        )
        .wait()
        .unwrap();

    let sample = subscriber
        .receiver()
        .recv_timeout(Duration::from_secs(2))
        .ok()?;
    let response: ReadResponse =
        serde_json::from_str(&sample.value.as_string().unwrap()).unwrap();
    response.value.ok()
}

/// Polls the given worker until `key` reads as `expected`.
fn await_value(
    zenoh: &zenoh::Session,
    zenoh_prefix: &str,
    worker: usize,
    key: &str,
    expected: &str,
) {
    let deadline = Instant::now() + Duration::from_secs(20);
    loop {
        if read_once(zenoh, zenoh_prefix, worker, key).as_deref() == Some(expected) {
            return;
        }
        assert!(
            Instant::now() < deadline,
            "worker {} did not converge to {}={} in time",
            worker,
            key,
            expected
        );
        thread::sleep(Duration::from_millis(100));
    }
}

fn set_up_logger() -> Result<(), fern::InitError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}] {}",
                record.target(),
                record.level(),
                message
            ))
        })
        .level(log::LevelFilter::Info)
        .chain(std::io::stdout())
        .apply()?;
    Ok(())
}
