// Copyright 2025 Cowboy AI, LLC.

//! Domain events for the storefront core
//!
//! Events represent facts that have occurred in the domain. They are
//! immutable; handlers publish them after a mutation has both applied
//! locally and been confirmed by the owning service.

use crate::entity::{LineItemId, OrderId, ProductId};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Base trait for all domain events
pub trait DomainEvent: Send + Sync + std::fmt::Debug {
    /// Get the aggregate ID this event relates to
    fn aggregate_id(&self) -> Uuid;

    /// Get the event type name
    fn event_type(&self) -> &'static str;

    /// Get the schema version
    fn version(&self) -> &'static str {
        "v1"
    }
}

/// A row was appended to the cart
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ItemAdded {
    /// The cart the row belongs to
    pub cart_id: Uuid,
    /// The new row
    pub item_id: LineItemId,
    /// The product the row references
    pub product_id: ProductId,
    /// Initial quantity
    pub quantity: u32,
}

impl DomainEvent for ItemAdded {
    fn aggregate_id(&self) -> Uuid {
        self.cart_id
    }
    fn event_type(&self) -> &'static str {
        "ItemAdded"
    }
}

/// A row's quantity changed and the change was persisted
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct QuantityChanged {
    /// The cart the row belongs to
    pub cart_id: Uuid,
    /// The affected row
    pub item_id: LineItemId,
    /// Quantity after the change
    pub quantity: u32,
}

impl DomainEvent for QuantityChanged {
    fn aggregate_id(&self) -> Uuid {
        self.cart_id
    }
    fn event_type(&self) -> &'static str {
        "QuantityChanged"
    }
}

/// A row was removed from the cart
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ItemRemoved {
    /// The cart the row belonged to
    pub cart_id: Uuid,
    /// The removed row
    pub item_id: LineItemId,
}

impl DomainEvent for ItemRemoved {
    fn aggregate_id(&self) -> Uuid {
        self.cart_id
    }
    fn event_type(&self) -> &'static str {
        "ItemRemoved"
    }
}

/// The selected rows were cleared (batch removal, partial success allowed)
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SelectionCleared {
    /// The cart that was cleared
    pub cart_id: Uuid,
    /// Rows removed remotely and locally
    pub removed: Vec<LineItemId>,
    /// Rows whose remote delete failed and which therefore remain
    pub retained: Vec<LineItemId>,
}

impl DomainEvent for SelectionCleared {
    fn aggregate_id(&self) -> Uuid {
        self.cart_id
    }
    fn event_type(&self) -> &'static str {
        "SelectionCleared"
    }
}

/// The cart was handed off to the contract flow
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CartSubmitted {
    /// The cart that was submitted
    pub cart_id: Uuid,
    /// Contract target: product of the first selected row
    pub target_product_id: ProductId,
}

impl DomainEvent for CartSubmitted {
    fn aggregate_id(&self) -> Uuid {
        self.cart_id
    }
    fn event_type(&self) -> &'static str {
        "CartSubmitted"
    }
}

/// A contract session passed its gate and was confirmed
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ContractConfirmed {
    /// The contract session
    pub contract_id: Uuid,
    /// The licensed product
    pub target_product_id: ProductId,
}

impl DomainEvent for ContractConfirmed {
    fn aggregate_id(&self) -> Uuid {
        self.contract_id
    }
    fn event_type(&self) -> &'static str {
        "ContractConfirmed"
    }
}

/// An order was created by the order service
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OrderPlaced {
    /// The new order
    pub order_id: OrderId,
    /// Total amount reported by the service
    pub total_amount: f64,
}

impl DomainEvent for OrderPlaced {
    fn aggregate_id(&self) -> Uuid {
        (&self.order_id).into()
    }
    fn event_type(&self) -> &'static str {
        "OrderPlaced"
    }
}

/// Event publisher trait for handlers to emit events
pub trait EventPublisher: Send + Sync {
    /// Publish domain events
    fn publish_events(&self, events: Vec<Box<dyn DomainEvent>>) -> Result<(), String>;
}

/// Recording event publisher for testing
#[derive(Clone, Default)]
pub struct RecordingEventPublisher {
    published_events: Arc<RwLock<Vec<String>>>,
}

impl RecordingEventPublisher {
    /// Create a new recording publisher
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the type names of all published events, in publish order
    pub fn published_event_types(&self) -> Vec<String> {
        self.published_events
            .read()
            .map(|g| g.clone())
            .unwrap_or_default()
    }
}

impl EventPublisher for RecordingEventPublisher {
    fn publish_events(&self, events: Vec<Box<dyn DomainEvent>>) -> Result<(), String> {
        let mut published = self.published_events.write().map_err(|e| e.to_string())?;
        for event in events {
            published.push(event.event_type().to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_types_and_aggregate_ids() {
        let cart_id = Uuid::new_v4();
        let item_id = LineItemId::new();

        let ev = QuantityChanged {
            cart_id,
            item_id,
            quantity: 3,
        };
        assert_eq!(ev.event_type(), "QuantityChanged");
        assert_eq!(ev.aggregate_id(), cart_id);
        assert_eq!(ev.version(), "v1");

        let ev = SelectionCleared {
            cart_id,
            removed: vec![item_id],
            retained: vec![],
        };
        assert_eq!(ev.event_type(), "SelectionCleared");
        assert_eq!(ev.aggregate_id(), cart_id);
    }

    #[test]
    fn test_event_serde_roundtrip() {
        let ev = CartSubmitted {
            cart_id: Uuid::new_v4(),
            target_product_id: ProductId::new(),
        };

        let json = serde_json::to_string(&ev).unwrap();
        let back: CartSubmitted = serde_json::from_str(&json).unwrap();
        assert_eq!(back.cart_id, ev.cart_id);
        assert_eq!(back.target_product_id, ev.target_product_id);
    }

    #[test]
    fn test_recording_publisher_preserves_order() {
        let publisher = RecordingEventPublisher::new();
        let cart_id = Uuid::new_v4();

        let events: Vec<Box<dyn DomainEvent>> = vec![
            Box::new(ItemRemoved {
                cart_id,
                item_id: LineItemId::new(),
            }),
            Box::new(CartSubmitted {
                cart_id,
                target_product_id: ProductId::new(),
            }),
        ];

        publisher.publish_events(events).unwrap();
        assert_eq!(
            publisher.published_event_types(),
            vec!["ItemRemoved", "CartSubmitted"]
        );
    }
}
