//! Navigation collaborator
//!
//! The core never navigates directly; it asks an injected [`Navigator`]
//! to move to a typed [`Route`]. Routes render to the path strings the
//! shell understands.

use crate::entity::ProductId;
use std::fmt;
use std::sync::RwLock;

/// Destinations the storefront core can request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Product detail page
    Product(ProductId),
    /// Contract page for the product being licensed
    Contract(ProductId),
    /// Order list page
    Order,
    /// Sign-in page
    Login,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Product(id) => write!(f, "/product/{id}"),
            Self::Contract(id) => write!(f, "/contract/{id}"),
            Self::Order => write!(f, "/order"),
            Self::Login => write!(f, "/login"),
        }
    }
}

/// Navigation seam
pub trait Navigator: Send + Sync {
    /// Move to a route
    fn push(&self, route: Route);
}

/// Records pushed routes for tests
#[derive(Default)]
pub struct RecordingNavigator {
    routes: RwLock<Vec<Route>>,
}

impl RecordingNavigator {
    /// New recorder with no routes
    pub fn new() -> Self {
        Self::default()
    }

    /// All pushed routes, in order
    pub fn routes(&self) -> Vec<Route> {
        self.routes.read().map(|g| g.clone()).unwrap_or_default()
    }

    /// The most recent route, if any
    pub fn last(&self) -> Option<Route> {
        self.routes().last().cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn push(&self, route: Route) {
        if let Ok(mut routes) = self.routes.write() {
            routes.push(route);
        }
    }
}
