// Copyright 2025 Cowboy AI, LLC.

//! Optimistic mutation contract for cart operations
//!
//! Every remote-mirrored cart mutation follows one contract: an
//! intent (for logging), a local apply that yields a rollback, a
//! remote call, and rollback-on-failure. A failed mutation leaves the
//! cart exactly as it was before the attempt. Mutations are named
//! with imperative verbs, like commands.

use crate::cart::{Cart, CartService};
use crate::entity::LineItemId;
use crate::errors::DomainResult;
use async_trait::async_trait;

/// Undoes a locally applied mutation
pub struct Rollback(Box<dyn FnOnce(&mut Cart) + Send>);

impl Rollback {
    /// Build a rollback from a closure
    pub fn new(f: impl FnOnce(&mut Cart) + Send + 'static) -> Self {
        Self(Box::new(f))
    }

    /// Revert the cart to its pre-mutation state
    pub fn revert(self, cart: &mut Cart) {
        (self.0)(cart)
    }
}

impl std::fmt::Debug for Rollback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Rollback")
    }
}

/// A cart mutation: local apply, remote persist, rollback on failure
#[async_trait]
pub trait CartMutation: Send + Sync {
    /// Describe the intent for logging
    fn intent(&self) -> String;

    /// Apply the mutation to local state, returning how to undo it
    fn apply(&self, cart: &mut Cart) -> DomainResult<Rollback>;

    /// Mirror the mutation to the owning service
    async fn persist(&self, service: &dyn CartService) -> DomainResult<()>;
}

/// Run a mutation: apply locally, persist remotely, roll back the
/// local change if the remote call fails.
pub async fn execute(
    cart: &mut Cart,
    service: &dyn CartService,
    mutation: &dyn CartMutation,
) -> DomainResult<()> {
    let rollback = mutation.apply(cart)?;
    tracing::debug!(intent = %mutation.intent(), "cart mutation applied locally");

    match mutation.persist(service).await {
        Ok(()) => Ok(()),
        Err(err) => {
            tracing::warn!(
                intent = %mutation.intent(),
                error = %err,
                "remote persist failed; rolling back local state"
            );
            rollback.revert(cart);
            Err(err)
        }
    }
}

/// Set a row's quantity
#[derive(Debug, Clone, Copy)]
pub struct SetQuantity {
    id: LineItemId,
    from: u32,
    to: u32,
}

impl SetQuantity {
    /// Mutation changing a row's quantity from `from` to `to`
    pub fn new(id: LineItemId, from: u32, to: u32) -> Self {
        Self { id, from, to }
    }
}

#[async_trait]
impl CartMutation for SetQuantity {
    fn intent(&self) -> String {
        format!("set quantity of {} to {}", self.id, self.to)
    }

    fn apply(&self, cart: &mut Cart) -> DomainResult<Rollback> {
        cart.apply_quantity(self.id, self.to)?;
        let (id, from) = (self.id, self.from);
        Ok(Rollback::new(move |cart| {
            // The row is known to exist; a concurrent local removal
            // cannot interleave (single-writer model).
            let _ = cart.apply_quantity(id, from);
        }))
    }

    async fn persist(&self, service: &dyn CartService) -> DomainResult<()> {
        service.set_quantity(self.id, self.to).await.map(|_| ())
    }
}

/// Remove a row from the cart
#[derive(Debug, Clone, Copy)]
pub struct RemoveItem {
    id: LineItemId,
}

impl RemoveItem {
    /// Mutation removing one row
    pub fn new(id: LineItemId) -> Self {
        Self { id }
    }
}

#[async_trait]
impl CartMutation for RemoveItem {
    fn intent(&self) -> String {
        format!("remove item {}", self.id)
    }

    fn apply(&self, cart: &mut Cart) -> DomainResult<Rollback> {
        let (index, row) = cart.take_row(self.id)?;
        Ok(Rollback::new(move |cart| cart.restore_row(index, row)))
    }

    async fn persist(&self, service: &dyn CartService) -> DomainResult<()> {
        service.remove_item(self.id).await
    }
}
