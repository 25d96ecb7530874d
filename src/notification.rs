// Copyright 2025 Cowboy AI, LLC.

//! User-facing notifications
//!
//! Refusals and failures surface to the user as short messages. The
//! mapping from a domain error to its message lives here so every
//! screen reports the same wording.

use crate::errors::{DomainError, GuardReason};
use std::sync::RwLock;

/// How loud the notification should be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Informational, auto-dismissing
    Info,
    /// A refusal the user can fix
    Warning,
    /// A failure outside the user's control
    Error,
}

/// A message for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Loudness
    pub severity: Severity,
    /// Short message text
    pub message: String,
}

impl Notification {
    /// Info message
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
        }
    }

    /// Warning message
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    /// Error message
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }

    /// Canonical notification for a domain error
    pub fn from_error(err: &DomainError) -> Self {
        match err {
            DomainError::EmptySelection => Self::warning("Select at least one item first"),
            DomainError::GuardFailed {
                reason: GuardReason::MissingSignature,
            } => Self::warning("Please sign before submitting"),
            DomainError::GuardFailed {
                reason: GuardReason::TermsNotAccepted,
            } => Self::warning("Please accept the contract terms"),
            DomainError::Unauthenticated => Self::warning("Please sign in to continue"),
            DomainError::NotFound { entity, .. } => {
                Self::error(format!("{entity} is no longer available"))
            }
            DomainError::Network { .. } => Self::error("Network error, please try again"),
            _ => Self::error("Something went wrong, please try again"),
        }
    }
}

/// Notification sink
pub trait Notifier: Send + Sync {
    /// Show a notification
    fn notify(&self, notification: Notification);
}

/// Records notifications for tests
#[derive(Default)]
pub struct RecordingNotifier {
    shown: RwLock<Vec<Notification>>,
}

impl RecordingNotifier {
    /// New recorder with nothing shown
    pub fn new() -> Self {
        Self::default()
    }

    /// All notifications, in display order
    pub fn shown(&self) -> Vec<Notification> {
        self.shown.read().map(|g| g.clone()).unwrap_or_default()
    }

    /// Message texts only
    pub fn messages(&self) -> Vec<String> {
        self.shown().into_iter().map(|n| n.message).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        if let Ok(mut shown) = self.shown.write() {
            shown.push(notification);
        }
    }
}
