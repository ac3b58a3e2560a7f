//! Event queue between container watchers and the printer loop.
//!
//! Submission is a hand-off: [`EventSender::handle_event`] resolves only once
//! the loop has taken the event off the queue. Senders are served in FIFO
//! order, so events are processed in the order they were accepted.

use tokio::sync::{mpsc, oneshot};

use crate::event::ContainerEvent;

/// An event waiting to be accepted by the loop.
#[derive(Debug)]
struct Envelope {
    event: ContainerEvent,
    accepted: oneshot::Sender<()>,
}

/// Cloneable handle used to submit events to a [`LogPrinter`](crate::LogPrinter).
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Envelope>,
}

impl EventSender {
    /// Submit an event, waiting until the printer loop accepts it.
    ///
    /// Events submitted after the loop returned are dropped.
    pub async fn handle_event(&self, event: ContainerEvent) {
        let (accepted, ack) = oneshot::channel();
        let kind = event.kind();
        if self.sender.send(Envelope { event, accepted }).await.is_err() {
            tracing::debug!(kind, "Printer loop closed, dropping event");
            return;
        }
        // Err means the loop returned with the event still queued.
        let _ = ack.await;
    }

    /// Ask the printer to stop forwarding output.
    ///
    /// Goes through the same queue as container events and therefore waits
    /// behind them.
    pub async fn cancel(&self) {
        self.handle_event(ContainerEvent::UserCancel).await;
    }

    /// Whether the printer loop has gone away.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Receiving side, owned by the printer.
#[derive(Debug)]
pub(crate) struct EventQueue {
    receiver: mpsc::Receiver<Envelope>,
}

impl EventQueue {
    /// Next event, acknowledging its sender. `None` once every sender is gone.
    pub(crate) async fn next(&mut self) -> Option<ContainerEvent> {
        let Envelope { event, accepted } = self.receiver.recv().await?;
        let _ = accepted.send(());
        Some(event)
    }
}

/// Create a connected sender/queue pair.
pub(crate) fn channel() -> (EventSender, EventQueue) {
    let (sender, receiver) = mpsc::channel(1);
    (EventSender { sender }, EventQueue { receiver })
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    #[tokio::test]
    async fn submission_waits_for_acceptance() {
        let (sender, mut queue) = channel();

        let submit = tokio::spawn(async move {
            sender.handle_event(ContainerEvent::attach("web-1", "web")).await;
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!submit.is_finished());

        assert_eq!(
            queue.next().await,
            Some(ContainerEvent::attach("web-1", "web"))
        );
        submit.await.unwrap();
    }

    #[tokio::test]
    async fn events_keep_submission_order() {
        let (sender, mut queue) = channel();

        let producer = tokio::spawn(async move {
            for i in 0..5 {
                sender
                    .handle_event(ContainerEvent::log("web-1", "web", i.to_string()))
                    .await;
            }
            sender.cancel().await;
        });

        for i in 0..5 {
            assert_eq!(
                queue.next().await,
                Some(ContainerEvent::log("web-1", "web", i.to_string()))
            );
        }
        assert_eq!(queue.next().await, Some(ContainerEvent::UserCancel));
        producer.await.unwrap();
        assert_eq!(queue.next().await, None);
    }

    #[tokio::test]
    async fn send_after_close_is_dropped() {
        let (sender, queue) = channel();
        drop(queue);

        assert!(sender.is_closed());
        sender.handle_event(ContainerEvent::UserCancel).await;
    }
}
