use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::entities::payment::PaymentStatus;

/// Domain events emitted after state changes commit.
///
/// Delivery is best-effort: a full or closed channel is logged and dropped,
/// it never fails the originating request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    ProductCreated(Uuid),
    ProductUpdated(Uuid),
    ProductDeleted(Uuid),
    StockLevelSet {
        product_id: Uuid,
        stock: i32,
    },
    PaymentCreated {
        payment_id: Uuid,
        product_id: Uuid,
    },
    PaymentStatusChanged {
        payment_id: Uuid,
        old_status: PaymentStatus,
        new_status: PaymentStatus,
    },
    PaymentCancelled {
        payment_id: Uuid,
        product_id: Uuid,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the channel is gone.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("event dropped: {}", e);
        }
    }
}

/// Consumes events from the channel until all senders are dropped.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    info!("event processor started");
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::PaymentStatusChanged {
                payment_id,
                old_status,
                new_status,
            } => {
                info!(%payment_id, %old_status, %new_status, "payment status changed");
            }
            Event::PaymentCreated {
                payment_id,
                product_id,
            } => {
                info!(%payment_id, %product_id, "payment created");
            }
            Event::PaymentCancelled {
                payment_id,
                product_id,
            } => {
                info!(%payment_id, %product_id, "payment cancelled");
            }
            other => debug!(event = ?other, "event processed"),
        }
    }
    info!("event processor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_or_log_does_not_error_on_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        // Must not panic or return an error surface.
        sender.send_or_log(Event::ProductCreated(Uuid::new_v4())).await;
    }

    #[tokio::test]
    async fn events_round_trip_through_channel() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let id = Uuid::new_v4();
        sender
            .send(Event::StockLevelSet {
                product_id: id,
                stock: 7,
            })
            .await
            .unwrap();

        match rx.recv().await.unwrap() {
            Event::StockLevelSet { product_id, stock } => {
                assert_eq!(product_id, id);
                assert_eq!(stock, 7);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
