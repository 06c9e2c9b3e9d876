//! Durable record of sent meeting reminders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::impl_domain_status_conversions;
use crate::types::UserId;

/// Category of reminder sent ahead of a meeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    DayBefore,
    HourBefore,
}

impl_domain_status_conversions!(ReminderKind {
    DayBefore => "day_before",
    HourBefore => "hour_before",
});

/// One sent (or claimed) reminder. At most one record may exist per
/// (meeting, user, kind); the dispatcher's at-most-once guarantee rests on
/// this row being inserted check-then-set before delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderRecord {
    pub id: Uuid,
    pub meeting_id: Uuid,
    pub user_id: UserId,
    pub kind: ReminderKind,
    pub sent_at: DateTime<Utc>,
}
