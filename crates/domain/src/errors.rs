//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Main error type for Roundtable
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum RoundtableError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("user {user_id} already has an open application for slot {slot_id}")]
    DuplicateApplication { user_id: i64, slot_id: Uuid },

    #[error("meeting {meeting_id} is full (capacity {capacity})")]
    MeetingFull { meeting_id: Uuid, capacity: usize },

    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("window reconciliation failed: {0}")]
    Reconciliation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Delivery outcome reported by the notification gateway.
///
/// Transient failures are retried by the dispatcher with backoff; permanent
/// failures (e.g. a recipient that blocked the bot) are logged and skipped.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum DeliveryError {
    #[error("transient delivery failure: {0}")]
    Transient(String),

    #[error("permanent delivery failure: {0}")]
    Permanent(String),
}

impl DeliveryError {
    /// Whether the dispatcher may retry this failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Result type alias for Roundtable operations
pub type Result<T> = std::result::Result<T, RoundtableError>;
