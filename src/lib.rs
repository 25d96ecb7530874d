// Copyright 2025 Cowboy AI, LLC.

//! Client-side domain core for a heritage-IP licensing storefront
//!
//! This crate models the cart and checkout flow of a storefront where
//! users license intangible-cultural-heritage IP (embroidery patterns,
//! porcelain designs, and the like). It owns the local state and the
//! rules; catalog, cart storage, and order creation live behind
//! injected collaborator traits.
//!
//! The main pieces:
//!
//! - [`cart::Cart`] — the cart aggregate: line items in insertion
//!   order, local-only selection, quantity changes mirrored to the
//!   owning service optimistically with rollback on failure
//! - [`contract::ContractSession`] — the submission gate between cart
//!   and order: a `Drafting -> AwaitingConfirmation -> Submitted`
//!   state machine whose guards check signature first, then terms
//! - [`checkout::CheckoutFlow`] — the orchestration layer wiring the
//!   aggregate, the gate, and the collaborators together
//! - [`session::SessionManager`] — explicit auth state with an
//!   injected unauthenticated handler
//!
//! Collaborator payloads are validated at the boundary: ids must be
//! UUIDs, order status is a closed enum, and field names stay
//! camelCase on the wire.

#![warn(missing_docs)]

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod contract;
pub mod entity;
pub mod errors;
pub mod events;
pub mod mutation;
pub mod navigation;
pub mod notification;
pub mod order;
pub mod session;
pub mod state_machine;

pub use cart::{Cart, CartService, ClearOutcome, LineItem};
pub use catalog::{CatalogService, Product, ProductPage, ProductQuery};
pub use checkout::{CheckoutFlow, LoadState, RedirectToLogin};
pub use contract::{ContractSession, ContractState, SignatureCapture};
pub use entity::{
    AggregateRoot, CartId, ContractId, Entity, EntityId, LineItemId, OrderId, ProductId, UserId,
};
pub use errors::{DomainError, DomainResult, GuardReason};
pub use events::{DomainEvent, EventPublisher};
pub use navigation::{Navigator, Route};
pub use notification::{Notification, Notifier, Severity};
pub use order::{Order, OrderItemRequest, OrderService, OrderStatus};
pub use session::{Session, SessionManager, UnauthenticatedHandler, User, UserRole};
pub use state_machine::{GuardedMachine, GuardedTransitions, State, StateTransition};
