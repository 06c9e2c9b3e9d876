//! User applications against a recurring slot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::impl_domain_status_conversions;
use crate::types::UserId;

/// Lifecycle status of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl_domain_status_conversions!(ApplicationStatus {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
    Cancelled => "cancelled",
});

impl ApplicationStatus {
    /// Whether an administrator has already ruled on the application.
    pub fn is_decided(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }

    /// An open application blocks further submissions for the same
    /// (applicant, slot) pair; only cancellation frees the pair up again.
    pub fn is_open(self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}

/// Admin decision on a pending application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationOutcome {
    Approved,
    Rejected,
}

impl From<ApplicationOutcome> for ApplicationStatus {
    fn from(outcome: ApplicationOutcome) -> Self {
        match outcome {
            ApplicationOutcome::Approved => ApplicationStatus::Approved,
            ApplicationOutcome::Rejected => ApplicationStatus::Rejected,
        }
    }
}

/// A user's request to be matched into a meeting for a recurring slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: Uuid,
    pub user_id: UserId,
    pub slot_id: Uuid,
    pub status: ApplicationStatus,
    pub admin_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl Application {
    pub fn new(user_id: UserId, slot_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            slot_id,
            status: ApplicationStatus::Pending,
            admin_note: None,
            created_at: Utc::now(),
            decided_at: None,
        }
    }
}
