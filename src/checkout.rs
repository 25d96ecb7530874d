// Copyright 2025 Cowboy AI, LLC.

//! Checkout orchestration
//!
//! [`CheckoutFlow`] wires the cart aggregate, the contract gate, and
//! the external collaborators together: cart mutations publish domain
//! events, refusals surface as notifications, auth failures clear the
//! session and redirect to sign-in, and a confirmed contract becomes
//! an order.

use crate::cart::{Cart, CartService, ClearOutcome};
use crate::contract::ContractSession;
use crate::entity::{LineItemId, ProductId};
use crate::errors::{DomainError, DomainResult};
use crate::events::{
    CartSubmitted, ContractConfirmed, DomainEvent, EventPublisher, ItemAdded, ItemRemoved,
    OrderPlaced, QuantityChanged, SelectionCleared,
};
use crate::navigation::{Navigator, Route};
use crate::notification::{Notification, Notifier};
use crate::order::{Order, OrderItemRequest, OrderService};
use crate::session::{SessionManager, UnauthenticatedHandler};
use crate::AggregateRoot;
use std::sync::Arc;

/// Remote-backed screen state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    /// Nothing fetched yet
    #[default]
    Idle,
    /// Fetch in flight
    Loading,
    /// Fetched and usable
    Ready,
    /// Fetch failed; a retry may recover
    Failed,
}

/// Unauthenticated handler that redirects to the sign-in page
pub struct RedirectToLogin {
    navigator: Arc<dyn Navigator>,
}

impl RedirectToLogin {
    /// Redirect through the given navigator
    pub fn new(navigator: Arc<dyn Navigator>) -> Self {
        Self { navigator }
    }
}

impl UnauthenticatedHandler for RedirectToLogin {
    fn on_unauthenticated(&self) {
        self.navigator.push(Route::Login);
    }
}

/// The checkout flow: one cart, at most one live contract session
pub struct CheckoutFlow {
    cart: Cart,
    contract: Option<ContractSession>,
    pending_quantity: u32,
    load_state: LoadState,
    cart_service: Arc<dyn CartService>,
    order_service: Arc<dyn OrderService>,
    session: Arc<SessionManager>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    publisher: Arc<dyn EventPublisher>,
}

impl CheckoutFlow {
    /// Wire a flow from its collaborators
    pub fn new(
        cart_service: Arc<dyn CartService>,
        order_service: Arc<dyn OrderService>,
        session: Arc<SessionManager>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            cart: Cart::new(),
            contract: None,
            pending_quantity: 1,
            load_state: LoadState::Idle,
            cart_service,
            order_service,
            session,
            navigator,
            notifier,
            publisher,
        }
    }

    /// The cart aggregate
    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    /// The live contract session, if the cart was submitted
    pub fn contract(&self) -> Option<&ContractSession> {
        self.contract.as_ref()
    }

    /// Screen state of the last cart fetch
    pub fn load_state(&self) -> LoadState {
        self.load_state
    }

    /// Fetch the cart, replacing local rows and resetting selection.
    pub async fn load_cart(&mut self) -> DomainResult<()> {
        self.session.token().map_err(|e| self.report(e))?;
        self.load_state = LoadState::Loading;
        match self.cart.load(self.cart_service.as_ref()).await {
            Ok(()) => {
                self.load_state = LoadState::Ready;
                Ok(())
            }
            Err(err) => {
                self.load_state = LoadState::Failed;
                Err(self.report(err))
            }
        }
    }

    /// Add a product to the cart
    pub async fn add_item(&mut self, product_id: ProductId, quantity: u32) -> DomainResult<()> {
        let item_id = match self
            .cart
            .add_item(self.cart_service.as_ref(), product_id, quantity)
            .await
        {
            Ok(id) => id,
            Err(err) => return Err(self.report(err)),
        };
        self.publish(Box::new(ItemAdded {
            cart_id: self.cart.id().into(),
            item_id,
            product_id,
            quantity,
        }));
        self.notifier.notify(Notification::info("Added to cart"));
        Ok(())
    }

    /// Toggle every row's selection. Local only, no event.
    pub fn select_all(&mut self, checked: bool) {
        self.cart.select_all(checked);
    }

    /// Toggle one row's selection. Local only, no event.
    pub fn select_item(&mut self, id: LineItemId, checked: bool) -> DomainResult<()> {
        self.cart.select_item(id, checked).map_err(|e| self.report(e))
    }

    /// Increment a row's quantity
    pub async fn increase(&mut self, id: LineItemId) -> DomainResult<()> {
        if let Err(err) = self.cart.increase(self.cart_service.as_ref(), id).await {
            return Err(self.report(err));
        }
        self.publish_quantity(id);
        Ok(())
    }

    /// Decrement a row's quantity (floored at 1)
    pub async fn decrease(&mut self, id: LineItemId) -> DomainResult<()> {
        if let Err(err) = self.cart.decrease(self.cart_service.as_ref(), id).await {
            return Err(self.report(err));
        }
        self.publish_quantity(id);
        Ok(())
    }

    /// Remove one row
    pub async fn remove(&mut self, id: LineItemId) -> DomainResult<()> {
        if let Err(err) = self.cart.remove(self.cart_service.as_ref(), id).await {
            return Err(self.report(err));
        }
        self.publish(Box::new(ItemRemoved {
            cart_id: self.cart.id().into(),
            item_id: id,
        }));
        Ok(())
    }

    /// Remove every selected row; partial success is reported, not
    /// rolled back.
    pub async fn clear_selected(&mut self) -> DomainResult<ClearOutcome> {
        let outcome = self.cart.clear_selected(self.cart_service.as_ref()).await?;
        if !outcome.removed.is_empty() || !outcome.failed.is_empty() {
            self.publish(Box::new(SelectionCleared {
                cart_id: self.cart.id().into(),
                removed: outcome.removed.clone(),
                retained: outcome.failed.iter().map(|(id, _)| *id).collect(),
            }));
        }
        if !outcome.is_complete() {
            self.notifier
                .notify(Notification::warning("Some items could not be removed"));
        }
        Ok(outcome)
    }

    /// Submit the cart: open a contract session for the first selected
    /// row and navigate to the contract page.
    pub fn submit_order(&mut self) -> DomainResult<ProductId> {
        let target = match self.cart.submit() {
            Ok(target) => target,
            Err(err) => return Err(self.report(err)),
        };
        self.pending_quantity = self
            .cart
            .selected_items()
            .first()
            .map(|i| i.quantity)
            .unwrap_or(1);
        self.contract = Some(ContractSession::new(target));
        self.publish(Box::new(CartSubmitted {
            cart_id: self.cart.id().into(),
            target_product_id: target,
        }));
        self.navigator.push(Route::Contract(target));
        Ok(target)
    }

    /// Toggle terms acceptance on the live contract session
    pub fn set_terms_accepted(&mut self, accepted: bool) -> DomainResult<()> {
        let session = self.contract_mut()?;
        session.set_terms_accepted(accepted)
    }

    /// Record a signature-capture update on the live contract session
    pub fn signature_changed(&mut self, present: bool) -> DomainResult<()> {
        let session = self.contract_mut()?;
        session.signature_changed(present)
    }

    /// Run the contract gate; a refusal names the failed guard.
    pub fn submit_contract(&mut self) -> DomainResult<()> {
        let result = {
            let session = self.contract_mut()?;
            session.submit().map(|_| ())
        };
        result.map_err(|e| self.report(e))
    }

    /// Dismiss the confirmation prompt
    pub fn cancel_contract(&mut self) -> DomainResult<()> {
        let session = self.contract_mut()?;
        session.cancel()
    }

    /// Confirm the contract and create the order, then navigate to
    /// the order list. The session is consumed either way; a failed
    /// order creation is reported and the user retries from the cart.
    pub async fn confirm_contract(&mut self) -> DomainResult<Order> {
        let confirmed = {
            let session = self.contract_mut()?;
            let contract_id = session.id();
            session.confirm().map(|target| (contract_id, target))
        };
        let (contract_id, target) = match confirmed {
            Ok(pair) => pair,
            Err(err) => return Err(self.report(err)),
        };
        self.publish(Box::new(ContractConfirmed {
            contract_id: contract_id.into(),
            target_product_id: target,
        }));

        let request = vec![OrderItemRequest {
            product_id: target,
            quantity: self.pending_quantity,
        }];
        let order = match self.order_service.create_order(request).await {
            Ok(order) => order,
            Err(err) => return Err(self.report(err)),
        };
        self.publish(Box::new(OrderPlaced {
            order_id: order.id,
            total_amount: order.total_amount,
        }));
        self.contract = None;
        self.navigator.push(Route::Order);
        Ok(order)
    }

    fn contract_mut(&mut self) -> DomainResult<&mut ContractSession> {
        self.contract
            .as_mut()
            .ok_or_else(|| DomainError::not_found("ContractSession", "current"))
    }

    fn publish_quantity(&self, id: LineItemId) {
        if let Some(item) = self.cart.item(id) {
            self.publish(Box::new(QuantityChanged {
                cart_id: self.cart.id().into(),
                item_id: id,
                quantity: item.quantity,
            }));
        }
    }

    fn publish(&self, event: Box<dyn DomainEvent>) {
        if let Err(err) = self.publisher.publish_events(vec![event]) {
            tracing::warn!(error = %err, "event publish failed");
        }
    }

    fn report(&self, err: DomainError) -> DomainError {
        let err = self.session.absorb(err);
        self.notifier.notify(Notification::from_error(&err));
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::{sample_row, InMemoryCartService, LineItem};
    use crate::events::RecordingEventPublisher;
    use crate::navigation::RecordingNavigator;
    use crate::notification::{RecordingNotifier, Severity};
    use crate::order::InMemoryOrderService;
    use crate::session::Session;

    struct Fixture {
        cart_service: Arc<InMemoryCartService>,
        navigator: Arc<RecordingNavigator>,
        notifier: Arc<RecordingNotifier>,
        publisher: Arc<RecordingEventPublisher>,
        flow: CheckoutFlow,
    }

    fn fixture() -> Fixture {
        let cart_service = Arc::new(InMemoryCartService::new());
        let order_service = Arc::new(InMemoryOrderService::new(100.0));
        let navigator = Arc::new(RecordingNavigator::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let publisher = Arc::new(RecordingEventPublisher::new());
        let session = Arc::new(SessionManager::new(Arc::new(RedirectToLogin::new(
            navigator.clone(),
        ))));
        session.sign_in(Session::from_token("tok"));

        let flow = CheckoutFlow::new(
            cart_service.clone(),
            order_service,
            session,
            navigator.clone(),
            notifier.clone(),
            publisher.clone(),
        );
        Fixture {
            cart_service,
            navigator,
            notifier,
            publisher,
            flow,
        }
    }

    fn seeded_row(fx: &Fixture, name: &str, price: f64, quantity: u32) -> LineItem {
        let row = sample_row(name, "embroidery", price, quantity);
        fx.cart_service.seed_row(row.clone());
        row
    }

    #[tokio::test]
    async fn test_load_reaches_ready() {
        let mut fx = fixture();
        seeded_row(&fx, "Row", 10.0, 1);

        assert_eq!(fx.flow.load_state(), LoadState::Idle);
        fx.flow.load_cart().await.unwrap();
        assert_eq!(fx.flow.load_state(), LoadState::Ready);
        assert_eq!(fx.flow.cart().len(), 1);
    }

    #[tokio::test]
    async fn test_signed_out_load_redirects_once_and_notifies() {
        let mut fx = fixture();
        fx.flow.session.sign_out();

        let err = fx.flow.load_cart().await.unwrap_err();
        assert!(matches!(err, DomainError::Unauthenticated));

        // Exactly one redirect, plus the user-facing message
        assert_eq!(fx.navigator.routes(), vec![Route::Login]);
        let shown = fx.notifier.shown();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].severity, Severity::Warning);
        assert!(shown[0].message.contains("sign in"));
    }

    #[tokio::test]
    async fn test_submit_order_opens_contract_and_navigates() {
        let mut fx = fixture();
        let row = seeded_row(&fx, "Row", 10.0, 2);
        fx.flow.load_cart().await.unwrap();
        fx.flow.select_item(row.id, true).unwrap();

        let target = fx.flow.submit_order().unwrap();
        assert_eq!(target, row.product_id);
        assert!(fx.flow.contract().is_some());
        assert_eq!(fx.navigator.last(), Some(Route::Contract(target)));
        assert_eq!(fx.publisher.published_event_types(), vec!["CartSubmitted"]);
    }

    #[tokio::test]
    async fn test_submit_order_with_empty_selection_warns() {
        let mut fx = fixture();
        seeded_row(&fx, "Row", 10.0, 1);
        fx.flow.load_cart().await.unwrap();

        let err = fx.flow.submit_order().unwrap_err();
        assert!(matches!(err, DomainError::EmptySelection));
        assert!(fx.flow.contract().is_none());
        assert_eq!(fx.notifier.shown()[0].severity, Severity::Warning);

        // Refusal issues no navigation and no event
        assert!(fx.navigator.routes().is_empty());
        assert!(fx.publisher.published_event_types().is_empty());
    }

    #[tokio::test]
    async fn test_guard_refusal_surfaces_notification() {
        let mut fx = fixture();
        let row = seeded_row(&fx, "Row", 10.0, 1);
        fx.flow.load_cart().await.unwrap();
        fx.flow.select_item(row.id, true).unwrap();
        fx.flow.submit_order().unwrap();

        // No signature yet
        let err = fx.flow.submit_contract().unwrap_err();
        assert!(err.is_guard_failure());
        let shown = fx.notifier.shown();
        assert_eq!(shown.last().unwrap().severity, Severity::Warning);
        assert!(shown.last().unwrap().message.contains("sign"));
    }

    #[tokio::test]
    async fn test_full_flow_places_order() {
        let mut fx = fixture();
        let row = seeded_row(&fx, "Row", 10.0, 3);
        fx.flow.load_cart().await.unwrap();
        fx.flow.select_item(row.id, true).unwrap();
        fx.flow.submit_order().unwrap();

        fx.flow.signature_changed(true).unwrap();
        fx.flow.set_terms_accepted(true).unwrap();
        fx.flow.submit_contract().unwrap();
        let order = fx.flow.confirm_contract().await.unwrap();

        // Quantity carried over from the selected row
        assert_eq!(order.items[0].quantity, 3);
        assert_eq!(fx.navigator.last(), Some(Route::Order));
        assert!(fx.flow.contract().is_none());
        assert_eq!(
            fx.publisher.published_event_types(),
            vec!["CartSubmitted", "ContractConfirmed", "OrderPlaced"]
        );
    }

    #[tokio::test]
    async fn test_quantity_changes_publish_events() {
        let mut fx = fixture();
        let row = seeded_row(&fx, "Row", 10.0, 2);
        fx.flow.load_cart().await.unwrap();

        fx.flow.increase(row.id).await.unwrap();
        fx.flow.decrease(row.id).await.unwrap();

        assert_eq!(
            fx.publisher.published_event_types(),
            vec!["QuantityChanged", "QuantityChanged"]
        );
    }
}
