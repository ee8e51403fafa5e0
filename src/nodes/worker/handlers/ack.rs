use crate::{messages::Acknowledge, nodes::worker::WorkerNode};

impl WorkerNode {
    /// Handles an acknowledgement of a sequential broadcast write.
    ///
    /// Marking the bitmap slot wakes the sequential delivery loop, which
    /// re-evaluates its queue head.
    pub fn ack_handler(&self, message: Acknowledge) {
        self.sequential.update_and_increment(message.sender_clock);
        let slots = self.sequential.update_ack(&message.stamp, message.sender);
        log::debug!(
            "ack for {} from worker {}: {:?}",
            message.stamp.id(),
            message.sender,
            slots
        );
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        clock::ScalarStamp,
        messages::Acknowledge,
        nodes::worker::worker_test_instance,
        zenoh_test_instance,
    };

    #[test]
    fn ack_marks_the_sender_slot() {
        let zenoh = zenoh_test_instance();
        let zenoh_prefix = uuid::Uuid::new_v4().to_string();

        let worker = worker_test_instance(zenoh, zenoh_prefix, 2, 3);
        let stamp = ScalarStamp::new(4, 0);
        worker.ack_handler(Acknowledge {
            sender: 1,
            sender_clock: 9,
            stamp,
        });

        assert_eq!(
            worker.sequential.update_ack(&stamp, 1),
            vec![false, true, false]
        );
        assert!(worker.sequential.current_stamp().counter >= 10);
    }
}
