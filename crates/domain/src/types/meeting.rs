//! Concrete meetings and their member rosters.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::impl_domain_status_conversions;
use crate::types::UserId;

/// Lifecycle status of a meeting.
///
/// The only legal forward path is planned -> confirmed -> completed;
/// cancelled is reachable from planned or confirmed. Completed and
/// cancelled are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingStatus {
    Planned,
    Confirmed,
    Completed,
    Cancelled,
}

impl_domain_status_conversions!(MeetingStatus {
    Planned => "planned",
    Confirmed => "confirmed",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl MeetingStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether the state machine allows moving to `next`.
    pub fn can_transition(self, next: MeetingStatus) -> bool {
        matches!(
            (self, next),
            (Self::Planned, Self::Confirmed)
                | (Self::Confirmed, Self::Completed)
                | (Self::Planned, Self::Cancelled)
                | (Self::Confirmed, Self::Cancelled)
        )
    }
}

/// A concrete, dated/timed/venued meeting instance with a member roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meeting {
    pub id: Uuid,
    pub name: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub city: String,
    pub venue: String,
    pub venue_address: Option<String>,
    pub status: MeetingStatus,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Meeting {
    /// Local start instant of the meeting.
    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }
}

/// Roster entry of a meeting. Owned exclusively by its meeting; deleting the
/// meeting removes the row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingMember {
    pub meeting_id: Uuid,
    pub user_id: UserId,
    /// Name shown to other members in reminder texts; supplied by the
    /// front-end when the member is added.
    pub display_name: Option<String>,
    pub joined_at: DateTime<Utc>,
    pub added_by: Option<UserId>,
}
