// Copyright 2025 Cowboy AI, LLC.

//! Authenticated session state
//!
//! Collaborator calls require a bearer token. The session is an
//! explicit object rather than ambient global state, and the reaction
//! to an expired or missing token is injected as a handler so the core
//! never reaches for a navigation side effect directly.

use crate::errors::{DomainError, DomainResult};
use crate::entity::UserId;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

/// Role of the signed-in user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Regular storefront user
    User,
    /// Platform administration
    Admin,
}

/// The signed-in user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// User id
    pub id: UserId,
    /// Display name
    pub username: String,
    /// Contact address
    pub email: String,
    /// Role
    pub role: UserRole,
    /// Avatar image, if set
    #[serde(default)]
    pub avatar: Option<String>,
    /// When the account was created
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// When the account was last updated
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// An authenticated session: a bearer token plus the user it belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token attached to every collaborator call
    pub token: String,
    /// The signed-in user, when known
    pub user: Option<User>,
}

impl Session {
    /// Session from a bare token
    pub fn from_token(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            user: None,
        }
    }
}

/// Injected reaction to a missing or rejected token
pub trait UnauthenticatedHandler: Send + Sync {
    /// Called once per auth failure, after the session is cleared
    fn on_unauthenticated(&self);
}

/// Holds the current session and routes auth failures to the handler
pub struct SessionManager {
    session: RwLock<Option<Session>>,
    handler: Arc<dyn UnauthenticatedHandler>,
}

impl SessionManager {
    /// Start signed out
    pub fn new(handler: Arc<dyn UnauthenticatedHandler>) -> Self {
        Self {
            session: RwLock::new(None),
            handler,
        }
    }

    /// Install a session after sign-in
    pub fn sign_in(&self, session: Session) {
        if let Ok(mut guard) = self.session.write() {
            *guard = Some(session);
        }
    }

    /// Drop the session
    pub fn sign_out(&self) {
        if let Ok(mut guard) = self.session.write() {
            *guard = None;
        }
    }

    /// Current session, if signed in
    pub fn session(&self) -> Option<Session> {
        self.session.read().ok().and_then(|g| g.clone())
    }

    /// Token for an outgoing call. Signed out means the handler fires
    /// and the call never happens.
    pub fn token(&self) -> DomainResult<String> {
        match self.session() {
            Some(session) => Ok(session.token),
            None => {
                self.handler.on_unauthenticated();
                Err(DomainError::Unauthenticated)
            }
        }
    }

    /// Route a collaborator error: `Unauthenticated` with a live
    /// session clears it and fires the handler, everything else passes
    /// through. Already signed out means the handler has fired.
    pub fn absorb(&self, err: DomainError) -> DomainError {
        if matches!(err, DomainError::Unauthenticated) && self.session().is_some() {
            self.sign_out();
            self.handler.on_unauthenticated();
        }
        err
    }
}

/// Counting handler for tests
#[derive(Default)]
pub struct RecordingUnauthenticatedHandler {
    fired: std::sync::atomic::AtomicUsize,
}

impl RecordingUnauthenticatedHandler {
    /// New handler with zero firings
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times the handler fired
    pub fn fired(&self) -> usize {
        self.fired.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl UnauthenticatedHandler for RecordingUnauthenticatedHandler {
    fn on_unauthenticated(&self) {
        self.fired
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> (SessionManager, Arc<RecordingUnauthenticatedHandler>) {
        let handler = Arc::new(RecordingUnauthenticatedHandler::new());
        (SessionManager::new(handler.clone()), handler)
    }

    #[test]
    fn test_token_when_signed_in() {
        let (manager, handler) = manager();
        manager.sign_in(Session::from_token("tok-1"));

        assert_eq!(manager.token().unwrap(), "tok-1");
        assert_eq!(handler.fired(), 0);
    }

    #[test]
    fn test_token_when_signed_out_fires_handler() {
        let (manager, handler) = manager();

        let err = manager.token().unwrap_err();
        assert!(matches!(err, DomainError::Unauthenticated));
        assert_eq!(handler.fired(), 1);
    }

    #[test]
    fn test_absorb_unauthenticated_clears_session() {
        let (manager, handler) = manager();
        manager.sign_in(Session::from_token("tok-1"));

        let err = manager.absorb(DomainError::Unauthenticated);
        assert!(matches!(err, DomainError::Unauthenticated));
        assert!(manager.session().is_none());
        assert_eq!(handler.fired(), 1);
    }

    #[test]
    fn test_absorb_when_signed_out_does_not_refire_handler() {
        let (manager, handler) = manager();

        // token() already fired the handler for this failure
        let err = manager.token().unwrap_err();
        assert_eq!(handler.fired(), 1);

        manager.absorb(err);
        assert_eq!(handler.fired(), 1);
    }

    #[test]
    fn test_absorb_passes_other_errors_through() {
        let (manager, handler) = manager();
        manager.sign_in(Session::from_token("tok-1"));

        let err = manager.absorb(DomainError::network("timeout"));
        assert!(err.is_network());
        assert!(manager.session().is_some());
        assert_eq!(handler.fired(), 0);
    }

    #[test]
    fn test_user_wire_format() {
        let user = User {
            id: UserId::new(),
            username: "mei".to_string(),
            email: "mei@example.com".to_string(),
            role: UserRole::User,
            avatar: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["role"], "user");
        assert!(value.get("createdAt").is_some());

        // Unknown roles are rejected at the boundary
        assert!(serde_json::from_str::<UserRole>("\"moderator\"").is_err());
    }
}
