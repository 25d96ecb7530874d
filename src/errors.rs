// Copyright 2025 Cowboy AI, LLC.

//! Error types for domain operations

use thiserror::Error;

/// Reason a contract-gate transition was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardReason {
    /// The user has not produced a signature mark
    MissingSignature,
    /// The user has not accepted the contract terms
    TermsNotAccepted,
}

impl GuardReason {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Self::MissingSignature => "MissingSignature",
            Self::TermsNotAccepted => "TermsNotAccepted",
        }
    }
}

/// Errors that can occur in domain operations
#[derive(Debug, Clone, Error)]
pub enum DomainError {
    /// Transport or backend unreachable, or a non-2xx response
    #[error("Network error: {message}")]
    Network {
        /// Message from the transport layer
        message: String,
    },

    /// A referenced id is absent
    #[error("Not found: {entity} with id {id}")]
    NotFound {
        /// Type of entity that wasn't found
        entity: String,
        /// ID that was searched for
        id: String,
    },

    /// Submit attempted with nothing selected
    #[error("No items selected")]
    EmptySelection,

    /// A contract-gate guard refused the transition
    #[error("Guard failed: {reason}", reason = .reason.name())]
    GuardFailed {
        /// Which guard refused
        reason: GuardReason,
    },

    /// Invalid state transition
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        /// Current state
        from: String,
        /// Attempted target state
        to: String,
    },

    /// The session token was rejected by the backend
    #[error("Unauthenticated")]
    Unauthenticated,

    /// A collaborator payload failed boundary validation
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::Serialization(err.to_string())
    }
}

impl DomainError {
    /// Convenience constructor for transport failures
    pub fn network(msg: impl Into<String>) -> Self {
        DomainError::Network {
            message: msg.into(),
        }
    }

    /// Convenience constructor for missing entities
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DomainError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, DomainError::NotFound { .. })
    }

    /// Check if this is a transport failure
    pub fn is_network(&self) -> bool {
        matches!(self, DomainError::Network { .. })
    }

    /// Check if this is a refused contract-gate transition
    pub fn is_guard_failure(&self) -> bool {
        matches!(self, DomainError::GuardFailed { .. })
    }
}
