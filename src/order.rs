// Copyright 2025 Cowboy AI, LLC.

//! Order collaborator: order schema and lifecycle contract
//!
//! Orders are owned by the backend; this module defines the validated
//! payload shapes and the trait the checkout flow consumes. Status is
//! a closed enum, so an unknown status string is rejected at the wire
//! boundary instead of leaking into the core.

use crate::entity::{OrderId, ProductId, UserId};
use crate::errors::{DomainError, DomainResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Created, awaiting payment
    Pending,
    /// Paid, license being prepared
    Paid,
    /// License delivered
    Completed,
    /// Cancelled before completion
    Cancelled,
}

impl OrderStatus {
    /// Whether the order can still be cancelled
    pub fn is_cancellable(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// One line of an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// The licensed product
    pub product_id: ProductId,
    /// Product display name as of order time
    pub name: String,
    /// Unit price as of order time
    pub unit_price: f64,
    /// Licensed quantity
    pub quantity: u32,
}

/// An order as reported by the order service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Order id
    pub id: OrderId,
    /// The user who placed the order
    pub user_id: UserId,
    /// Ordered lines
    pub items: Vec<OrderItem>,
    /// Total amount charged
    pub total_amount: f64,
    /// Lifecycle status
    pub status: OrderStatus,
    /// When the order was placed
    pub created_at: DateTime<Utc>,
    /// When the order last changed
    pub updated_at: DateTime<Utc>,
}

/// Request line for order creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    /// Product to license
    pub product_id: ProductId,
    /// Quantity to license
    pub quantity: u32,
}

/// Order service contract
#[async_trait]
pub trait OrderService: Send + Sync {
    /// Create an order for the given lines
    async fn create_order(&self, items: Vec<OrderItemRequest>) -> DomainResult<Order>;

    /// Fetch the caller's orders, newest first
    async fn fetch_orders(&self) -> DomainResult<Vec<Order>>;

    /// Cancel a pending order
    async fn cancel_order(&self, id: OrderId) -> DomainResult<Order>;
}

/// In-memory order service for tests and demos
#[derive(Default)]
pub struct InMemoryOrderService {
    orders: RwLock<Vec<Order>>,
    user_id: UserId,
    unit_price: f64,
}

impl InMemoryOrderService {
    /// Create an empty service pricing every line at `unit_price`
    pub fn new(unit_price: f64) -> Self {
        Self {
            orders: RwLock::default(),
            user_id: UserId::new(),
            unit_price,
        }
    }
}

#[async_trait]
impl OrderService for InMemoryOrderService {
    async fn create_order(&self, items: Vec<OrderItemRequest>) -> DomainResult<Order> {
        if items.is_empty() {
            return Err(DomainError::Validation(
                "an order needs at least one line".to_string(),
            ));
        }
        let lines: Vec<OrderItem> = items
            .into_iter()
            .map(|req| OrderItem {
                product_id: req.product_id,
                name: format!("product {}", req.product_id),
                unit_price: self.unit_price,
                quantity: req.quantity,
            })
            .collect();
        let total_amount = lines
            .iter()
            .map(|l| l.unit_price * f64::from(l.quantity))
            .sum();
        let now = Utc::now();
        let order = Order {
            id: OrderId::new(),
            user_id: self.user_id,
            items: lines,
            total_amount,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.orders
            .write()
            .map_err(|e| DomainError::network(e.to_string()))?
            .insert(0, order.clone());
        Ok(order)
    }

    async fn fetch_orders(&self) -> DomainResult<Vec<Order>> {
        Ok(self
            .orders
            .read()
            .map_err(|e| DomainError::network(e.to_string()))?
            .clone())
    }

    async fn cancel_order(&self, id: OrderId) -> DomainResult<Order> {
        let mut orders = self
            .orders
            .write()
            .map_err(|e| DomainError::network(e.to_string()))?;
        let order = orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| DomainError::not_found("Order", id))?;
        if !order.status.is_cancellable() {
            return Err(DomainError::Validation(format!(
                "order {} is not cancellable",
                id
            )));
        }
        order.status = OrderStatus::Cancelled;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }
}
