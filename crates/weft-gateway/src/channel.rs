//! One server-side channel per client socket.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Why an offer to a channel's outbound queue did not land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferError {
    /// Queue at capacity: the client is a slow consumer.
    Full,
    /// The write pump already went away.
    Closed,
}

/// A registered client socket: identity, room membership, the bounded
/// outbound frame queue, and the done-signal both pumps coordinate on.
pub struct Channel {
    user_id: i64,
    room_id: i64,
    sender: mpsc::Sender<String>,
    done: CancellationToken,
}

impl Channel {
    #[must_use]
    pub fn new(
        user_id: i64,
        room_id: i64,
        sender: mpsc::Sender<String>,
        done: CancellationToken,
    ) -> Self {
        Self {
            user_id,
            room_id,
            sender,
            done,
        }
    }

    #[must_use]
    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    #[must_use]
    pub fn room_id(&self) -> i64 {
        self.room_id
    }

    /// Non-blocking offer of an outbound frame.
    pub fn offer(&self, frame: String) -> Result<(), OfferError> {
        self.sender.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => OfferError::Full,
            mpsc::error::TrySendError::Closed(_) => OfferError::Closed,
        })
    }

    /// Signal both pumps to wind the socket down.
    pub fn close(&self) {
        self.done.cancel();
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.done.is_cancelled()
    }

    /// The done-signal, for pump loops to select on.
    #[must_use]
    pub fn done(&self) -> CancellationToken {
        self.done.clone()
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("user_id", &self.user_id)
            .field("room_id", &self.room_id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(capacity: usize) -> (Channel, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Channel::new(1, 2, tx, CancellationToken::new()), rx)
    }

    #[tokio::test]
    async fn offer_is_fifo() {
        let (ch, mut rx) = channel(4);
        ch.offer("a".into()).unwrap();
        ch.offer("b".into()).unwrap();
        assert_eq!(rx.recv().await.unwrap(), "a");
        assert_eq!(rx.recv().await.unwrap(), "b");
    }

    #[tokio::test]
    async fn full_queue_reports_slow_consumer() {
        let (ch, _rx) = channel(1);
        ch.offer("a".into()).unwrap();
        assert_eq!(ch.offer("b".into()), Err(OfferError::Full));
    }

    #[tokio::test]
    async fn dropped_receiver_reports_closed() {
        let (ch, rx) = channel(1);
        drop(rx);
        assert_eq!(ch.offer("a".into()), Err(OfferError::Closed));
    }

    #[tokio::test]
    async fn close_cancels_done() {
        let (ch, _rx) = channel(1);
        let done = ch.done();
        assert!(!done.is_cancelled());
        ch.close();
        assert!(done.is_cancelled());
        assert!(ch.is_closed());
    }
}
