//! Single-slot response correlator.
//!
//! The mailbox is the only synchronization point between the foreground
//! dispatcher and the background listener. It holds at most one pending
//! request; the at-most-one-in-flight protocol invariant is carried by the
//! slot type rather than a queue.

use crate::error::ClientError;
use parking_lot::Mutex;
use rdtp_protocol::Response;
use tokio::sync::oneshot;

enum Slot {
    /// No request pending.
    Idle,
    /// One dispatcher call is waiting on the held sender's receiver.
    Armed(oneshot::Sender<Response>),
    /// Connection is down; arming fails until `reset`.
    Closed,
}

/// Thread-safe single-slot handoff between listener and dispatcher.
pub struct Mailbox {
    slot: Mutex<Slot>,
}

impl Mailbox {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Idle),
        }
    }

    /// Arms the mailbox for one outstanding request and returns the ticket
    /// the dispatcher awaits.
    ///
    /// Fails with `RequestInFlight` if a request is already pending and with
    /// `Disconnected` if the mailbox has been closed.
    pub fn arm(&self) -> Result<oneshot::Receiver<Response>, ClientError> {
        let mut slot = self.slot.lock();
        match *slot {
            Slot::Armed(_) => Err(ClientError::RequestInFlight),
            Slot::Closed => Err(ClientError::Disconnected),
            Slot::Idle => {
                let (tx, rx) = oneshot::channel();
                *slot = Slot::Armed(tx);
                Ok(rx)
            }
        }
    }

    /// Delivers a response, waking the armed waiter. Called only by the
    /// listener; never blocks.
    ///
    /// Returns the response back when nobody is waiting (unsolicited, or the
    /// waiter timed out a moment ago) so the caller can report and discard it.
    pub fn deliver(&self, response: Response) -> Result<(), Response> {
        let mut slot = self.slot.lock();
        match std::mem::replace(&mut *slot, Slot::Idle) {
            Slot::Armed(tx) => tx.send(response),
            Slot::Idle => Err(response),
            Slot::Closed => {
                *slot = Slot::Closed;
                Err(response)
            }
        }
    }

    /// Clears a pending arm after the dispatcher gave up waiting, so a late
    /// response is classified as unsolicited instead of being delivered to an
    /// unrelated later caller.
    pub fn disarm(&self) {
        let mut slot = self.slot.lock();
        if matches!(*slot, Slot::Armed(_)) {
            *slot = Slot::Idle;
        }
    }

    /// Closes the mailbox. Dropping an armed sender resolves the waiting
    /// receiver immediately, which the dispatcher surfaces as `Disconnected`;
    /// subsequent arms fail until `reset`.
    pub fn close(&self) {
        *self.slot.lock() = Slot::Closed;
    }

    /// Reopens the mailbox after a reconnect.
    pub fn reset(&self) {
        *self.slot.lock() = Slot::Idle;
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdtp_protocol::Status;

    #[test]
    fn test_deliver_wakes_armed_waiter() {
        let mailbox = Mailbox::new();
        let rx = mailbox.arm().unwrap();

        mailbox.deliver(Response::ok(["tok123"])).unwrap();

        let response = tokio_test::block_on(rx).unwrap();
        assert_eq!(response.args, vec!["tok123"]);
    }

    #[test]
    fn test_unsolicited_response_is_returned() {
        let mailbox = Mailbox::new();
        let rejected = mailbox.deliver(Response::ok(["x"])).unwrap_err();
        assert_eq!(rejected.args, vec!["x"]);
    }

    #[test]
    fn test_second_arm_fails_while_pending() {
        let mailbox = Mailbox::new();
        let _rx = mailbox.arm().unwrap();
        assert!(matches!(mailbox.arm(), Err(ClientError::RequestInFlight)));
    }

    #[test]
    fn test_disarm_leaves_no_residue() {
        let mailbox = Mailbox::new();
        let rx = mailbox.arm().unwrap();
        drop(rx);
        mailbox.disarm();

        // The late response for the abandoned request is unsolicited
        assert!(mailbox.deliver(Response::new(Status::Ok, vec![])).is_err());

        // And the next request can arm normally
        let rx = mailbox.arm().unwrap();
        mailbox.deliver(Response::ok(["fresh"])).unwrap();
        let response = tokio_test::block_on(rx).unwrap();
        assert_eq!(response.args, vec!["fresh"]);
    }

    #[test]
    fn test_close_wakes_waiter_and_blocks_arming() {
        let mailbox = Mailbox::new();
        let rx = mailbox.arm().unwrap();

        mailbox.close();

        // Receiver resolves with a closed-channel error, not a hang
        assert!(tokio_test::block_on(rx).is_err());
        assert!(matches!(mailbox.arm(), Err(ClientError::Disconnected)));

        mailbox.reset();
        assert!(mailbox.arm().is_ok());
    }
}
