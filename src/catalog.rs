//! Catalog collaborator: product schema and lookup contract
//!
//! The catalog is owned externally; this module defines the validated
//! shape of its payloads and the trait the core consumes. Field names
//! stay camelCase on the wire to match the backend API.

use crate::entity::ProductId;
use crate::errors::{DomainError, DomainResult};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// One licensing option: a duration at a price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LicenseTerm {
    /// Human-readable duration ("1 year", "permanent", ...)
    pub duration: String,
    /// Price for that duration
    pub price: f64,
}

/// Licensing information attached to a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LicenseInfo {
    /// Offered license types ("commercial", "personal", "education", ...)
    pub types: Vec<String>,
    /// Offered terms
    pub terms: Vec<LicenseTerm>,
}

/// A catalog product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Product id
    pub id: ProductId,
    /// Display name
    pub name: String,
    /// Craft type tag ("embroidery", "porcelain", ...)
    #[serde(rename = "type")]
    pub kind: String,
    /// Catalog category
    pub category: String,
    /// Unit price
    pub price: f64,
    /// Short description
    pub description: String,
    /// Main image
    pub image_url: String,
    /// Long-form detail text
    pub detail: String,
    /// Licensing options
    pub license: LicenseInfo,
    /// Usage restrictions
    pub restrictions: Vec<String>,
    /// Gallery images
    #[serde(default)]
    pub images: Vec<String>,
    /// When the catalog entry was created
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// When the catalog entry was last updated
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Query parameters for listing products
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    /// Filter by category
    pub category: Option<String>,
    /// Filter by craft type
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Sort key understood by the backend
    pub sort: Option<String>,
    /// Page size
    pub limit: Option<u32>,
    /// Page number
    pub page: Option<u32>,
}

/// One page of a product listing
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    /// Products on this page
    pub data: Vec<Product>,
    /// Total matching products
    pub total: u64,
}

/// Catalog service contract
///
/// All calls may fail with `Network`; lookups of unknown ids fail with
/// `NotFound`.
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Fetch one product by id
    async fn fetch_product(&self, id: ProductId) -> DomainResult<Product>;

    /// List products matching a query
    async fn list_products(&self, query: ProductQuery) -> DomainResult<ProductPage>;

    /// Full-text search
    async fn search(&self, query: &str) -> DomainResult<Vec<Product>>;

    /// All known categories
    async fn categories(&self) -> DomainResult<Vec<String>>;
}

/// In-memory catalog for tests and demos
#[derive(Default)]
pub struct InMemoryCatalog {
    products: RwLock<HashMap<ProductId, Product>>,
}

impl InMemoryCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a product
    pub fn insert(&self, product: Product) {
        if let Ok(mut products) = self.products.write() {
            products.insert(product.id, product);
        }
    }
}

#[async_trait]
impl CatalogService for InMemoryCatalog {
    async fn fetch_product(&self, id: ProductId) -> DomainResult<Product> {
        self.products
            .read()
            .map_err(|e| DomainError::network(e.to_string()))?
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("Product", id))
    }

    async fn list_products(&self, query: ProductQuery) -> DomainResult<ProductPage> {
        let products = self
            .products
            .read()
            .map_err(|e| DomainError::network(e.to_string()))?;
        let mut data: Vec<Product> = products
            .values()
            .filter(|p| {
                query.category.as_deref().map_or(true, |c| p.category == c)
                    && query.kind.as_deref().map_or(true, |k| p.kind == k)
            })
            .cloned()
            .collect();
        data.sort_by(|a, b| a.name.cmp(&b.name));
        let total = data.len() as u64;
        if let Some(limit) = query.limit {
            let page = query.page.unwrap_or(1).max(1);
            let start = ((page - 1) * limit) as usize;
            data = data.into_iter().skip(start).take(limit as usize).collect();
        }
        Ok(ProductPage { data, total })
    }

    async fn search(&self, query: &str) -> DomainResult<Vec<Product>> {
        let products = self
            .products
            .read()
            .map_err(|e| DomainError::network(e.to_string()))?;
        Ok(products
            .values()
            .filter(|p| p.name.contains(query) || p.description.contains(query))
            .cloned()
            .collect())
    }

    async fn categories(&self) -> DomainResult<Vec<String>> {
        let products = self
            .products
            .read()
            .map_err(|e| DomainError::network(e.to_string()))?;
        let mut categories: Vec<String> = products.values().map(|p| p.category.clone()).collect();
        categories.sort();
        categories.dedup();
        Ok(categories)
    }
}

#[cfg(test)]
pub(crate) fn sample_product(name: &str, kind: &str, price: f64) -> Product {
    Product {
        id: ProductId::new(),
        name: name.to_string(),
        kind: kind.to_string(),
        category: "heritage".to_string(),
        price,
        description: format!("{name} licensing"),
        image_url: format!("/images/{kind}.jpg"),
        detail: String::new(),
        license: LicenseInfo {
            types: vec!["commercial".to_string(), "personal".to_string()],
            terms: vec![LicenseTerm {
                duration: "1 year".to_string(),
                price,
            }],
        },
        restrictions: vec![],
        images: vec![],
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    }
}
