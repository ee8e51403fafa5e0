use crate::{
    clock::{ScalarStamp, VectorStamp},
    messages::{Acknowledge, BroadcastWrite, WriteStamp},
    nodes::worker::WorkerNode,
    scheduler::{BcastAckTask, CausalTask, PendingWrite, Scheduler, SequencedWrite},
    LockstepError,
};

impl WorkerNode {
    /// Handles a write replicated from a peer (or from this worker itself, in
    /// sequential mode).
    pub fn bcast_write_handler(&self, message: BroadcastWrite) {
        log::debug!(
            "received {:?} broadcast write from worker {}",
            message.mode,
            message.sender
        );
        if message.mode != message.stamp_mode() {
            log::warn!(
                "rejecting broadcast write from worker {}: {}",
                message.sender,
                LockstepError::ModeMismatch
            );
            return;
        }
        let BroadcastWrite {
            sender,
            stamp,
            key,
            value,
            ..
        } = message;

        match stamp {
            WriteStamp::Sequential(sender_clock) => {
                // having received the broadcast is an event of its own
                self.sequential.update_and_increment(sender_clock);

                let stamp = ScalarStamp::new(sender_clock, sender);
                let write = PendingWrite {
                    stamp,
                    sender,
                    key,
                    value,
                };
                // acknowledged towards everyone once it reaches our queue head
                let ack_task = BcastAckTask::new(
                    self.zenoh.clone(),
                    self.zenoh_prefix.clone(),
                    self.cluster_size,
                    Acknowledge {
                        sender: self.worker_id,
                        sender_clock: self.sequential.current_stamp().counter,
                        stamp,
                    },
                );
                self.sequential.add_task(SequencedWrite::new(write, Some(ack_task)));
            }
            WriteStamp::Causal(vector) => {
                let write = PendingWrite {
                    stamp: VectorStamp::new(vector),
                    sender,
                    key,
                    value,
                };
                self.causal.add_task(CausalTask::Remote(write));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        messages::{BroadcastWrite, ConsistencyMode, WriteStamp},
        nodes::worker::worker_test_instance,
        zenoh_test_instance,
    };

    #[test]
    fn sequential_broadcast_advances_clock_and_enqueues() {
        let zenoh = zenoh_test_instance();
        let zenoh_prefix = uuid::Uuid::new_v4().to_string();

        let worker = worker_test_instance(zenoh, zenoh_prefix, 1, 3);
        worker.bcast_write_handler(BroadcastWrite {
            mode: ConsistencyMode::Sequential,
            sender: 0,
            stamp: WriteStamp::Sequential(5),
            key: "a".into(),
            value: "1".to_owned(),
        });

        // clock merged to the sender's value and advanced past it
        assert!(worker.sequential.current_stamp().counter >= 6);
        assert_eq!(worker.sequential.queued_writes(), 1);
        // not delivered before the acks are in
        assert!(worker.store.is_empty());
    }

    #[test]
    fn causal_broadcast_is_enqueued_until_deliverable() {
        let zenoh = zenoh_test_instance();
        let zenoh_prefix = uuid::Uuid::new_v4().to_string();

        let worker = worker_test_instance(zenoh, zenoh_prefix, 1, 2);
        // a write from the future: one of worker 0's writes is missing
        worker.bcast_write_handler(BroadcastWrite {
            mode: ConsistencyMode::Causal,
            sender: 0,
            stamp: WriteStamp::Causal(vec![2, 0]),
            key: "x".into(),
            value: "2".to_owned(),
        });
        assert_eq!(worker.causal.queued_writes(), 1);
        assert_eq!(worker.causal.deliver_ready(), 0);

        worker.bcast_write_handler(BroadcastWrite {
            mode: ConsistencyMode::Causal,
            sender: 0,
            stamp: WriteStamp::Causal(vec![1, 0]),
            key: "x".into(),
            value: "1".to_owned(),
        });
        assert_eq!(worker.causal.deliver_ready(), 2);
        assert_eq!(worker.store.get(&"x".into()), Some("2".to_owned()));
    }

    #[test]
    fn mismatched_mode_is_rejected() {
        let zenoh = zenoh_test_instance();
        let zenoh_prefix = uuid::Uuid::new_v4().to_string();

        let worker = worker_test_instance(zenoh, zenoh_prefix, 1, 2);
        // declared causal, but stamped with a scalar clock
        worker.bcast_write_handler(BroadcastWrite {
            mode: ConsistencyMode::Causal,
            sender: 0,
            stamp: WriteStamp::Sequential(3),
            key: "a".into(),
            value: "1".to_owned(),
        });

        assert_eq!(worker.sequential.queued_writes(), 0);
        assert_eq!(worker.causal.queued_writes(), 0);
        // a rejected record must not advance the clock either
        assert_eq!(worker.sequential.current_stamp().counter, 0);
        assert!(worker.store.is_empty());
    }
}
