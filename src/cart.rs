//! Cart aggregate: line items, selection, quantity, pricing, submit gating
//!
//! The cart is the sole owner of its line items. Rows keep their
//! insertion order across every mutation; selection is local-only
//! state, while quantity changes and removals are mirrored to the
//! external cart service through the optimistic mutation contract in
//! [`crate::mutation`].

use crate::catalog::CatalogService;
use crate::entity::{CartId, CartMarker, Entity, LineItemId, ProductId};
use crate::errors::{DomainError, DomainResult};
use crate::mutation::{self, RemoveItem, SetQuantity};
use crate::AggregateRoot;
use async_trait::async_trait;
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// One product entry in the cart
///
/// Carries a copy of the product's display fields, taken at add-time;
/// the catalog remains the source of truth for everything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// Cart row id, unique per row
    pub id: LineItemId,
    /// The product this row references
    pub product_id: ProductId,
    /// Display copy: product name
    pub name: String,
    /// Display copy: craft type tag
    #[serde(rename = "type")]
    pub kind: String,
    /// Display copy: unit price
    pub unit_price: f64,
    /// Display copy: image reference
    pub image_url: String,
    /// Quantity, always >= 1
    pub quantity: u32,
    /// Included in totals and checkout. Not persisted server-side;
    /// defaults to false on load.
    #[serde(default)]
    pub selected: bool,
}

impl LineItem {
    /// Subtotal this row contributes when selected
    pub fn subtotal(&self) -> f64 {
        self.unit_price * self.quantity as f64
    }
}

/// Cart service contract (owned externally)
///
/// Each call may fail with `Network` or `NotFound`.
#[async_trait]
pub trait CartService: Send + Sync {
    /// Fetch the full cart
    async fn fetch_cart(&self) -> DomainResult<Vec<LineItem>>;

    /// Add a product to the cart; returns the stored row
    async fn add_item(&self, product_id: ProductId, quantity: u32) -> DomainResult<LineItem>;

    /// Persist a row's quantity; returns the updated row
    async fn set_quantity(&self, item_id: LineItemId, quantity: u32) -> DomainResult<LineItem>;

    /// Delete a row
    async fn remove_item(&self, item_id: LineItemId) -> DomainResult<()>;
}

/// Result of [`Cart::clear_selected`]: per-row independent outcomes.
///
/// Rows whose remote delete succeeded are gone locally; rows whose
/// delete failed are retained. Partial success is visible, never
/// rolled back.
#[derive(Debug, Default)]
pub struct ClearOutcome {
    /// Rows removed remotely and locally
    pub removed: Vec<LineItemId>,
    /// Rows retained because their remote delete failed
    pub failed: Vec<(LineItemId, DomainError)>,
}

impl ClearOutcome {
    /// True when every dispatched removal succeeded
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Cart aggregate
#[derive(Debug, Clone)]
pub struct Cart {
    entity: Entity<CartMarker>,
    version: u64,
    items: IndexMap<LineItemId, LineItem>,
}

impl Default for Cart {
    fn default() -> Self {
        Self::new()
    }
}

impl AggregateRoot for Cart {
    type Id = CartId;

    fn id(&self) -> Self::Id {
        self.entity.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn increment_version(&mut self) {
        self.version += 1;
        self.entity.touch();
    }
}

impl Cart {
    /// Create an empty cart
    pub fn new() -> Self {
        Self {
            entity: Entity::new(),
            version: 0,
            items: IndexMap::new(),
        }
    }

    /// Rows in insertion order
    pub fn items(&self) -> impl Iterator<Item = &LineItem> {
        self.items.values()
    }

    /// Look up one row
    pub fn item(&self, id: LineItemId) -> Option<&LineItem> {
        self.items.get(&id)
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when the cart holds no rows
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Ids of selected rows, in insertion order
    pub fn selected_ids(&self) -> Vec<LineItemId> {
        self.items
            .values()
            .filter(|i| i.selected)
            .map(|i| i.id)
            .collect()
    }

    /// Selected rows, in insertion order
    pub fn selected_items(&self) -> Vec<&LineItem> {
        self.items.values().filter(|i| i.selected).collect()
    }

    /// True iff the cart is non-empty and every row is selected
    pub fn all_selected(&self) -> bool {
        !self.items.is_empty() && self.items.values().all(|i| i.selected)
    }

    /// Sum of `unit_price * quantity` over selected rows, rounded to
    /// two decimals for display. Unselected rows contribute zero.
    pub fn compute_total(&self) -> f64 {
        let total: f64 = self
            .items
            .values()
            .filter(|i| i.selected)
            .map(LineItem::subtotal)
            .sum();
        round2(total)
    }

    /// Set every row's selection flag. Local only.
    pub fn select_all(&mut self, checked: bool) {
        for item in self.items.values_mut() {
            item.selected = checked;
        }
    }

    /// Set one row's selection flag. Local only.
    pub fn select_item(&mut self, id: LineItemId, checked: bool) -> DomainResult<()> {
        let item = self
            .items
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("LineItem", id))?;
        item.selected = checked;
        Ok(())
    }

    /// Gate to the contract flow: the product id of the first selected
    /// row in insertion order, or `EmptySelection` when nothing is
    /// selected. Only one contract target is produced even when
    /// several rows are selected.
    pub fn submit(&self) -> DomainResult<ProductId> {
        self.items
            .values()
            .find(|i| i.selected)
            .map(|i| i.product_id)
            .ok_or(DomainError::EmptySelection)
    }

    /// Replace the entire item set with fetched rows, all unselected.
    pub async fn load(&mut self, service: &dyn CartService) -> DomainResult<()> {
        let rows = service.fetch_cart().await?;
        self.items = rows
            .into_iter()
            .map(|mut row| {
                row.selected = false;
                row.quantity = row.quantity.max(1);
                (row.id, row)
            })
            .collect();
        self.increment_version();
        Ok(())
    }

    /// Add a product to the cart. The remote call runs first; the row
    /// it returns is appended, so a failed call leaves the cart
    /// unchanged.
    pub async fn add_item(
        &mut self,
        service: &dyn CartService,
        product_id: ProductId,
        quantity: u32,
    ) -> DomainResult<LineItemId> {
        if quantity < 1 {
            return Err(DomainError::Validation(
                "quantity must be at least 1".to_string(),
            ));
        }
        let mut row = service.add_item(product_id, quantity).await?;
        row.selected = false;
        row.quantity = row.quantity.max(1);
        let id = row.id;
        self.items.insert(id, row);
        self.increment_version();
        Ok(id)
    }

    /// Increment a row's quantity and persist it.
    ///
    /// Optimistic: applied locally, rolled back if the remote call
    /// fails. Callers should await one quantity change per row before
    /// dispatching the next; two in-flight changes on the same row may
    /// settle out of order.
    pub async fn increase(
        &mut self,
        service: &dyn CartService,
        id: LineItemId,
    ) -> DomainResult<()> {
        let from = self.quantity_of(id)?;
        let to = from.saturating_add(1);
        mutation::execute(self, service, &SetQuantity::new(id, from, to)).await
    }

    /// Decrement a row's quantity, floored at 1, and persist it.
    ///
    /// Decrementing a row already at 1 is a no-op and issues no remote
    /// call.
    pub async fn decrease(
        &mut self,
        service: &dyn CartService,
        id: LineItemId,
    ) -> DomainResult<()> {
        let from = self.quantity_of(id)?;
        if from <= 1 {
            return Ok(());
        }
        mutation::execute(self, service, &SetQuantity::new(id, from, from - 1)).await
    }

    /// Remove one row. Optimistic with rollback: on remote failure the
    /// row is restored at its original position.
    pub async fn remove(&mut self, service: &dyn CartService, id: LineItemId) -> DomainResult<()> {
        if !self.items.contains_key(&id) {
            return Err(DomainError::not_found("LineItem", id));
        }
        mutation::execute(self, service, &RemoveItem::new(id)).await
    }

    /// Remove every selected row, one remote delete per row dispatched
    /// concurrently. Each completion is applied independently in
    /// whatever order it arrives; rows that failed remotely stay in
    /// the cart.
    pub async fn clear_selected(&mut self, service: &dyn CartService) -> DomainResult<ClearOutcome> {
        let ids = self.selected_ids();
        let results = futures::future::join_all(
            ids.into_iter()
                .map(|id| async move { (id, service.remove_item(id).await) }),
        )
        .await;

        let mut outcome = ClearOutcome::default();
        for (id, result) in results {
            match result {
                Ok(()) => {
                    self.items.shift_remove(&id);
                    outcome.removed.push(id);
                }
                Err(err) => {
                    tracing::warn!(item_id = %id, error = %err, "removal failed; row retained");
                    outcome.failed.push((id, err));
                }
            }
        }
        if !outcome.removed.is_empty() {
            self.increment_version();
        }
        Ok(outcome)
    }

    fn quantity_of(&self, id: LineItemId) -> DomainResult<u32> {
        self.item(id)
            .map(|i| i.quantity)
            .ok_or_else(|| DomainError::not_found("LineItem", id))
    }

    // Row-level primitives used by the mutation contract. Crate-private:
    // external callers go through the operations above.

    pub(crate) fn apply_quantity(&mut self, id: LineItemId, quantity: u32) -> DomainResult<()> {
        let item = self
            .items
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("LineItem", id))?;
        item.quantity = quantity.max(1);
        self.increment_version();
        Ok(())
    }

    pub(crate) fn take_row(&mut self, id: LineItemId) -> DomainResult<(usize, LineItem)> {
        let (index, _, row) = self
            .items
            .shift_remove_full(&id)
            .ok_or_else(|| DomainError::not_found("LineItem", id))?;
        self.increment_version();
        Ok((index, row))
    }

    pub(crate) fn restore_row(&mut self, index: usize, row: LineItem) {
        let index = index.min(self.items.len());
        self.items.shift_insert(index, row.id, row);
        self.increment_version();
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// In-memory cart service for tests and demos
///
/// Joins display fields from an [`crate::catalog::InMemoryCatalog`]
/// when one is attached, the way the real backend joins product data
/// into cart rows.
#[derive(Default)]
pub struct InMemoryCartService {
    rows: RwLock<IndexMap<LineItemId, LineItem>>,
    catalog: Option<std::sync::Arc<crate::catalog::InMemoryCatalog>>,
}

impl InMemoryCartService {
    /// Create an empty cart service
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a catalog used to resolve product display fields
    pub fn with_catalog(catalog: std::sync::Arc<crate::catalog::InMemoryCatalog>) -> Self {
        Self {
            rows: RwLock::new(IndexMap::new()),
            catalog: Some(catalog),
        }
    }

    /// Seed a stored row directly
    pub fn seed_row(&self, row: LineItem) {
        if let Ok(mut rows) = self.rows.write() {
            rows.insert(row.id, row);
        }
    }
}

#[async_trait]
impl CartService for InMemoryCartService {
    async fn fetch_cart(&self) -> DomainResult<Vec<LineItem>> {
        let rows = self
            .rows
            .read()
            .map_err(|e| DomainError::network(e.to_string()))?;
        Ok(rows.values().cloned().collect())
    }

    async fn add_item(&self, product_id: ProductId, quantity: u32) -> DomainResult<LineItem> {
        let product = match &self.catalog {
            Some(catalog) => catalog.fetch_product(product_id).await?,
            None => return Err(DomainError::not_found("Product", product_id)),
        };
        let row = LineItem {
            id: LineItemId::new(),
            product_id,
            name: product.name,
            kind: product.kind,
            unit_price: product.price,
            image_url: product.image_url,
            quantity: quantity.max(1),
            selected: false,
        };
        self.rows
            .write()
            .map_err(|e| DomainError::network(e.to_string()))?
            .insert(row.id, row.clone());
        Ok(row)
    }

    async fn set_quantity(&self, item_id: LineItemId, quantity: u32) -> DomainResult<LineItem> {
        let mut rows = self
            .rows
            .write()
            .map_err(|e| DomainError::network(e.to_string()))?;
        let row = rows
            .get_mut(&item_id)
            .ok_or_else(|| DomainError::not_found("LineItem", item_id))?;
        row.quantity = quantity;
        Ok(row.clone())
    }

    async fn remove_item(&self, item_id: LineItemId) -> DomainResult<()> {
        let mut rows = self
            .rows
            .write()
            .map_err(|e| DomainError::network(e.to_string()))?;
        rows.shift_remove(&item_id)
            .map(|_| ())
            .ok_or_else(|| DomainError::not_found("LineItem", item_id))
    }
}

#[cfg(test)]
pub(crate) fn sample_row(name: &str, kind: &str, unit_price: f64, quantity: u32) -> LineItem {
    LineItem {
        id: LineItemId::new(),
        product_id: ProductId::new(),
        name: name.to_string(),
        kind: kind.to_string(),
        unit_price,
        image_url: format!("/images/{kind}.jpg"),
        quantity,
        selected: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cart_with(rows: Vec<LineItem>) -> Cart {
        let mut cart = Cart::new();
        cart.items = rows.into_iter().map(|r| (r.id, r)).collect();
        cart
    }

    /// Total counts only selected rows
    #[test]
    fn test_total_counts_only_selected_rows() {
        let embroidery = sample_row("Embroidery", "embroidery", 2000.0, 1);
        let mut porcelain = sample_row("Porcelain", "porcelain", 1500.0, 1);
        porcelain.selected = true;

        let cart = cart_with(vec![embroidery, porcelain]);
        assert_eq!(cart.compute_total(), 1500.00);
    }

    #[test]
    fn test_total_unaffected_by_unselected_quantity() {
        let mut hidden = sample_row("Hidden", "embroidery", 999.0, 1);
        hidden.quantity = 50;
        let mut counted = sample_row("Counted", "porcelain", 10.0, 3);
        counted.selected = true;

        let cart = cart_with(vec![hidden, counted]);
        assert_eq!(cart.compute_total(), 30.00);
    }

    #[test]
    fn test_total_rounds_to_two_decimals() {
        let mut row = sample_row("Odd price", "embroidery", 0.1, 3);
        row.selected = true;
        let cart = cart_with(vec![row]);
        assert_eq!(cart.compute_total(), 0.30);
    }

    /// all_selected is false for an empty cart even after select_all(true)
    #[test]
    fn test_select_all_on_empty_cart() {
        let mut cart = Cart::new();
        cart.select_all(true);
        assert!(!cart.all_selected());
    }

    #[test]
    fn test_select_all_then_all_selected() {
        let mut cart = cart_with(vec![
            sample_row("A", "embroidery", 1.0, 1),
            sample_row("B", "porcelain", 2.0, 1),
        ]);
        assert!(!cart.all_selected());

        cart.select_all(true);
        assert!(cart.all_selected());

        cart.select_all(false);
        assert!(!cart.all_selected());
        assert_eq!(cart.compute_total(), 0.0);
    }

    #[test]
    fn test_select_item_unknown_id() {
        let mut cart = Cart::new();
        let err = cart.select_item(LineItemId::new(), true).unwrap_err();
        assert!(err.is_not_found());
    }

    /// submit() with nothing selected fails with EmptySelection
    #[test]
    fn test_submit_empty_selection() {
        let cart = cart_with(vec![sample_row("A", "embroidery", 1.0, 1)]);
        let err = cart.submit().unwrap_err();
        assert!(matches!(err, DomainError::EmptySelection));
    }

    /// submit() picks the first selected row by insertion order, not by
    /// price or id
    #[test]
    fn test_submit_picks_first_selected_by_insertion_order() {
        let mut p3 = sample_row("P3", "embroidery", 9999.0, 1);
        let mut p1 = sample_row("P1", "porcelain", 1.0, 1);
        let mut p2 = sample_row("P2", "lacquer", 50.0, 1);
        p3.selected = true;
        p1.selected = true;
        p2.selected = true;
        let expected = p3.product_id;

        let cart = cart_with(vec![p3, p1, p2]);
        assert_eq!(cart.submit().unwrap(), expected);
    }

    #[test]
    fn test_submit_skips_unselected_head() {
        let first = sample_row("First", "embroidery", 1.0, 1);
        let mut second = sample_row("Second", "porcelain", 2.0, 1);
        second.selected = true;
        let expected = second.product_id;

        let cart = cart_with(vec![first, second]);
        assert_eq!(cart.submit().unwrap(), expected);
    }

    /// load replaces the item set and resets selection
    #[tokio::test]
    async fn test_load_resets_selection() {
        let service = InMemoryCartService::new();
        let mut stored = sample_row("Stored", "embroidery", 100.0, 2);
        stored.selected = true; // server should never say this, but be safe
        service.seed_row(stored);

        let mut cart = Cart::new();
        cart.load(&service).await.unwrap();

        assert_eq!(cart.len(), 1);
        assert!(cart.items().all(|i| !i.selected));
        assert!(!cart.all_selected());
    }

    #[tokio::test]
    async fn test_load_clamps_zero_quantity() {
        let service = InMemoryCartService::new();
        let mut stored = sample_row("Stored", "embroidery", 100.0, 1);
        stored.quantity = 0;
        service.seed_row(stored);

        let mut cart = Cart::new();
        cart.load(&service).await.unwrap();
        assert_eq!(cart.items().next().unwrap().quantity, 1);
    }

    /// Two increases persist in order and land at 3
    #[tokio::test]
    async fn test_increase_twice_persists_both() {
        let service = InMemoryCartService::new();
        let row = sample_row("Row", "embroidery", 10.0, 1);
        let id = row.id;
        service.seed_row(row);

        let mut cart = Cart::new();
        cart.load(&service).await.unwrap();

        cart.increase(&service, id).await.unwrap();
        cart.increase(&service, id).await.unwrap();

        assert_eq!(cart.item(id).unwrap().quantity, 3);
        let remote = service.fetch_cart().await.unwrap();
        assert_eq!(remote[0].quantity, 3);
    }

    /// Increase saturates instead of overflowing if the service ever
    /// reports a quantity at the integer ceiling
    #[tokio::test]
    async fn test_increase_saturates_at_max_quantity() {
        let service = InMemoryCartService::new();
        let row = sample_row("Row", "embroidery", 10.0, u32::MAX);
        let id = row.id;
        service.seed_row(row);

        let mut cart = Cart::new();
        cart.load(&service).await.unwrap();

        cart.increase(&service, id).await.unwrap();
        assert_eq!(cart.item(id).unwrap().quantity, u32::MAX);
    }

    /// Decrease never goes below 1, repeated calls included
    #[tokio::test]
    async fn test_decrease_floors_at_one() {
        let service = InMemoryCartService::new();
        let row = sample_row("Row", "embroidery", 10.0, 2);
        let id = row.id;
        service.seed_row(row);

        let mut cart = Cart::new();
        cart.load(&service).await.unwrap();

        cart.decrease(&service, id).await.unwrap();
        assert_eq!(cart.item(id).unwrap().quantity, 1);

        // No-op from here on, and no remote call is issued
        cart.decrease(&service, id).await.unwrap();
        cart.decrease(&service, id).await.unwrap();
        assert_eq!(cart.item(id).unwrap().quantity, 1);
    }

    #[tokio::test]
    async fn test_remove_deletes_row() {
        let service = InMemoryCartService::new();
        let row = sample_row("Row", "embroidery", 10.0, 1);
        let id = row.id;
        service.seed_row(row);

        let mut cart = Cart::new();
        cart.load(&service).await.unwrap();
        cart.remove(&service, id).await.unwrap();

        assert!(cart.is_empty());
        assert!(service.fetch_cart().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_unknown_id() {
        let service = InMemoryCartService::new();
        let mut cart = Cart::new();
        let err = cart.remove(&service, LineItemId::new()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_clear_selected_removes_only_selected() {
        let service = InMemoryCartService::new();
        let keep = sample_row("Keep", "embroidery", 10.0, 1);
        let drop_a = sample_row("DropA", "porcelain", 20.0, 1);
        let drop_b = sample_row("DropB", "lacquer", 30.0, 1);
        let (keep_id, a_id, b_id) = (keep.id, drop_a.id, drop_b.id);
        for row in [keep, drop_a, drop_b] {
            service.seed_row(row);
        }

        let mut cart = Cart::new();
        cart.load(&service).await.unwrap();
        cart.select_item(a_id, true).unwrap();
        cart.select_item(b_id, true).unwrap();

        let outcome = cart.clear_selected(&service).await.unwrap();
        assert!(outcome.is_complete());
        assert_eq!(outcome.removed, vec![a_id, b_id]);
        assert_eq!(cart.len(), 1);
        assert!(cart.item(keep_id).is_some());
    }

    /// Mutations never reorder surviving rows
    #[tokio::test]
    async fn test_insertion_order_stable_across_mutations() {
        let service = InMemoryCartService::new();
        let a = sample_row("A", "embroidery", 1.0, 1);
        let b = sample_row("B", "porcelain", 2.0, 1);
        let c = sample_row("C", "lacquer", 3.0, 1);
        let (a_id, b_id, c_id) = (a.id, b.id, c.id);
        for row in [a, b, c] {
            service.seed_row(row);
        }

        let mut cart = Cart::new();
        cart.load(&service).await.unwrap();
        cart.increase(&service, c_id).await.unwrap();
        cart.remove(&service, b_id).await.unwrap();

        let order: Vec<LineItemId> = cart.items().map(|i| i.id).collect();
        assert_eq!(order, vec![a_id, c_id]);
    }

    #[tokio::test]
    async fn test_add_item_appends_display_copy() {
        let catalog = std::sync::Arc::new(crate::catalog::InMemoryCatalog::new());
        let product = crate::catalog::sample_product("Embroidery", "embroidery", 2000.0);
        let product_id = product.id;
        catalog.insert(product);
        let service = InMemoryCartService::with_catalog(catalog);

        let mut cart = Cart::new();
        let id = cart.add_item(&service, product_id, 2).await.unwrap();

        let row = cart.item(id).unwrap();
        assert_eq!(row.name, "Embroidery");
        assert_eq!(row.unit_price, 2000.0);
        assert_eq!(row.quantity, 2);
        assert!(!row.selected);
    }

    /// A failed add leaves the cart unchanged
    #[tokio::test]
    async fn test_add_item_failure_leaves_cart_unchanged() {
        let service = InMemoryCartService::new(); // no catalog: every add fails
        let mut cart = Cart::new();

        let err = cart.add_item(&service, ProductId::new(), 1).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_add_item_rejects_zero_quantity() {
        let service = InMemoryCartService::new();
        let mut cart = Cart::new();
        let err = cart.add_item(&service, ProductId::new(), 0).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    /// Wire format: camelCase fields, selection defaults to false
    #[test]
    fn test_line_item_wire_format() {
        let row = sample_row("Embroidery", "embroidery", 2000.0, 1);
        let value = serde_json::to_value(&row).unwrap();
        assert!(value.get("productId").is_some());
        assert!(value.get("unitPrice").is_some());
        assert!(value.get("type").is_some());

        let json = r#"{
            "id": "7f2c1b4e-8a3d-4e5f-9b6a-1c2d3e4f5a6b",
            "productId": "0f2c1b4e-8a3d-4e5f-9b6a-1c2d3e4f5a6b",
            "name": "Embroidery",
            "type": "embroidery",
            "unitPrice": 2000.0,
            "imageUrl": "/images/embroidery.jpg",
            "quantity": 1
        }"#;
        let row: LineItem = serde_json::from_str(json).unwrap();
        assert!(!row.selected);
    }
}
