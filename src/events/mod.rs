use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};
use uuid::Uuid;

/// Stock alert categories emitted by the periodic scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockAlertType {
    #[serde(rename = "LOW_STOCK")]
    LowStock,
    #[serde(rename = "EXCESS_STOCK")]
    ExcessStock,
    #[serde(rename = "EXPIRING")]
    Expiring,
}

/// Events that can occur in the system. They are consumed by the processing
/// loop and re-broadcast to connected subscribers; delivery is best-effort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Delivery events
    DeliveryCreated(Uuid),
    DeliveryUpdated(Uuid),
    DeliveryStatusChanged {
        delivery_id: Uuid,
        old_status: String,
        new_status: String,
    },
    DeliveryVoided(Uuid),
    ProofOfDeliveryAdded(Uuid),

    // Inventory events
    InventoryItemCreated(Uuid),
    InventoryItemUpdated(Uuid),
    InventoryStockAdjusted {
        item_id: Uuid,
        delta: i32,
        reason: String,
    },

    // Stock movement events
    MovementCreated(Uuid),
    MovementVoided(Uuid),
    MovementCancelled(Uuid),

    // Alert events
    StockAlert {
        item_id: Uuid,
        current_stock: i32,
        minimum_threshold: Option<i32>,
        maximum_threshold: Option<i32>,
        alert_type: StockAlertType,
        timestamp: DateTime<Utc>,
    },
    StockExpiry {
        item_id: Uuid,
        batch_number: Option<String>,
        expiry_date: DateTime<Utc>,
        quantity: i32,
        timestamp: DateTime<Utc>,
    },

    // Supplier invoice events
    SupplierInvoiceCreated(Uuid),

    // Generic event for custom messages
    Generic {
        message: String,
        timestamp: DateTime<Utc>,
        metadata: serde_json::Value,
    },
}

impl Event {
    /// Topic name published to subscribers, mirroring the socket channel
    /// naming used by clients (`delivery:created`, `movement:created`, ...).
    pub fn topic(&self) -> &'static str {
        match self {
            Event::DeliveryCreated(_) => "delivery:created",
            Event::DeliveryUpdated(_) => "delivery:updated",
            Event::DeliveryStatusChanged { .. } => "delivery:status",
            Event::DeliveryVoided(_) => "delivery:voided",
            Event::ProofOfDeliveryAdded(_) => "delivery:proof",
            Event::InventoryItemCreated(_) => "inventory:created",
            Event::InventoryItemUpdated(_) => "inventory:updated",
            Event::InventoryStockAdjusted { .. } => "inventory:stock",
            Event::MovementCreated(_) => "movement:created",
            Event::MovementVoided(_) => "movement:voided",
            Event::MovementCancelled(_) => "movement:cancelled",
            Event::StockAlert { .. } => "stock:alert",
            Event::StockExpiry { .. } => "stock:expiry",
            Event::SupplierInvoiceCreated(_) => "supplier-invoice:created",
            Event::Generic { .. } => "generic",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event. Failures are reported to the caller; services treat
    /// them as best-effort and log rather than fail the primary operation.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Fire-and-forget send used for secondary effects.
    pub async fn send_best_effort(&self, event: Event) {
        if let Err(err) = self.send(event).await {
            warn!(error = %err, "event dropped");
        }
    }
}

/// Broadcast side of the pub/sub side-channel; each connected client holds a
/// receiver.
pub type EventBroadcast = broadcast::Sender<Event>;

/// Consumes events from the channel, logs them, and fans them out to
/// subscribers. Runs until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>, broadcast_tx: EventBroadcast) {
    while let Some(event) = rx.recv().await {
        info!(topic = event.topic(), payload = ?event, "event");

        // No subscribers is not an error; the side-channel is best-effort.
        let _ = broadcast_tx.send(event);
    }

    warn!("event processing loop has ended");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_are_forwarded_to_subscribers() {
        let (tx, rx) = mpsc::channel(8);
        let (broadcast_tx, mut broadcast_rx) = broadcast::channel(8);
        let sender = EventSender::new(tx);

        tokio::spawn(process_events(rx, broadcast_tx));

        let id = Uuid::new_v4();
        sender.send(Event::DeliveryCreated(id)).await.unwrap();

        let received = broadcast_rx.recv().await.unwrap();
        match received {
            Event::DeliveryCreated(got) => assert_eq!(got, id),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn topics_match_socket_channel_names() {
        assert_eq!(Event::DeliveryCreated(Uuid::nil()).topic(), "delivery:created");
        assert_eq!(Event::MovementCreated(Uuid::nil()).topic(), "movement:created");
    }
}
