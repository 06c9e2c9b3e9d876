//! Meeting registry - creation, rosters, the status state machine, and
//! deletion with application revert.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc};
use roundtable_domain::{
    Meeting, MeetingMember, MeetingPolicy, MeetingStatus, Result, RoundtableError, UserId,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::messages;
use crate::ports::{MeetingRepository, NotificationGateway};

/// Parameters for creating a meeting.
#[derive(Debug, Clone)]
pub struct NewMeeting {
    pub name: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub city: String,
    pub venue: String,
    pub venue_address: Option<String>,
    pub created_by: Option<UserId>,
}

/// Meeting lifecycle service.
pub struct MeetingService {
    meetings: Arc<dyn MeetingRepository>,
    gateway: Arc<dyn NotificationGateway>,
    policy: MeetingPolicy,
}

impl MeetingService {
    pub fn new(
        meetings: Arc<dyn MeetingRepository>,
        gateway: Arc<dyn NotificationGateway>,
        policy: MeetingPolicy,
    ) -> Self {
        Self { meetings, gateway, policy }
    }

    /// Create a meeting in the `planned` state.
    pub async fn create(&self, new: NewMeeting, today: NaiveDate) -> Result<Meeting> {
        if new.name.trim().is_empty() {
            return Err(RoundtableError::Validation("meeting name must not be empty".into()));
        }
        if new.venue.trim().is_empty() {
            return Err(RoundtableError::Validation("meeting venue must not be empty".into()));
        }
        if new.date < today {
            return Err(RoundtableError::Validation(format!(
                "meeting date {} is in the past",
                new.date
            )));
        }

        let meeting = Meeting {
            id: Uuid::new_v4(),
            name: new.name,
            date: new.date,
            time: new.time,
            city: new.city,
            venue: new.venue,
            venue_address: new.venue_address,
            status: MeetingStatus::Planned,
            created_by: new.created_by,
            created_at: Utc::now(),
        };
        self.meetings.insert(&meeting).await?;
        info!(meeting_id = %meeting.id, date = %meeting.date, city = %meeting.city, "meeting created");
        Ok(meeting)
    }

    /// Add a member to the roster.
    ///
    /// Adding an existing member is a no-op; adding beyond the configured
    /// capacity fails with [`RoundtableError::MeetingFull`] and leaves the
    /// roster unchanged.
    pub async fn add_member(
        &self,
        meeting_id: Uuid,
        user_id: UserId,
        display_name: Option<String>,
        added_by: Option<UserId>,
    ) -> Result<()> {
        let meeting = self.get_existing(meeting_id).await?;
        if meeting.status.is_terminal() {
            return Err(RoundtableError::Validation(format!(
                "meeting {meeting_id} is {} and can no longer change",
                meeting.status
            )));
        }

        let roster = self.meetings.members(meeting_id).await?;
        if roster.iter().any(|member| member.user_id == user_id) {
            return Ok(());
        }
        if roster.len() >= self.policy.max_size {
            return Err(RoundtableError::MeetingFull {
                meeting_id,
                capacity: self.policy.max_size,
            });
        }

        let member = MeetingMember {
            meeting_id,
            user_id,
            display_name,
            joined_at: Utc::now(),
            added_by,
        };
        self.meetings.add_member(&member).await?;
        info!(meeting_id = %meeting_id, user_id, "member added to meeting");
        Ok(())
    }

    /// Remove a member from the roster. Unconditionally idempotent.
    pub async fn remove_member(&self, meeting_id: Uuid, user_id: UserId) -> Result<()> {
        let removed = self.meetings.remove_member(meeting_id, user_id).await?;
        if removed {
            info!(meeting_id = %meeting_id, user_id, "member removed from meeting");
        }
        Ok(())
    }

    /// Move the meeting through its state machine. Confirming notifies the
    /// roster.
    pub async fn set_status(&self, meeting_id: Uuid, status: MeetingStatus) -> Result<()> {
        let meeting = self.get_existing(meeting_id).await?;
        if meeting.status == status {
            return Ok(());
        }
        if !meeting.status.can_transition(status) {
            return Err(RoundtableError::InvalidTransition {
                from: meeting.status.to_string(),
                to: status.to_string(),
            });
        }

        if status == MeetingStatus::Confirmed {
            let roster_size = self.meetings.members(meeting_id).await?.len();
            if roster_size < self.policy.min_size {
                warn!(
                    meeting_id = %meeting_id,
                    roster_size,
                    min_size = self.policy.min_size,
                    "confirming a meeting below the minimum roster size"
                );
            }
        }

        self.meetings.set_status(meeting_id, status).await?;
        info!(meeting_id = %meeting_id, from = %meeting.status, to = %status, "meeting status changed");

        if status == MeetingStatus::Confirmed {
            let confirmed = Meeting { status, ..meeting };
            self.notify_roster(&confirmed, &messages::confirmation_text(&confirmed)).await?;
        }
        Ok(())
    }

    /// Cancel a planned or confirmed meeting and tell the roster.
    pub async fn cancel(&self, meeting_id: Uuid) -> Result<()> {
        let meeting = self.get_existing(meeting_id).await?;
        if !meeting.status.can_transition(MeetingStatus::Cancelled) {
            return Err(RoundtableError::InvalidTransition {
                from: meeting.status.to_string(),
                to: MeetingStatus::Cancelled.to_string(),
            });
        }

        self.meetings.set_status(meeting_id, MeetingStatus::Cancelled).await?;
        info!(meeting_id = %meeting_id, "meeting cancelled");
        self.notify_roster(&meeting, &messages::cancellation_text(&meeting)).await?;
        Ok(())
    }

    /// Delete a meeting outright. The roster cascades away and every
    /// application this meeting satisfied returns to `pending`, so the
    /// affected users re-enter the admin queue instead of being lost.
    pub async fn delete(&self, meeting_id: Uuid) -> Result<()> {
        self.get_existing(meeting_id).await?;
        let reverted = self.meetings.delete_with_revert(meeting_id).await?;
        info!(meeting_id = %meeting_id, reverted_applications = reverted, "meeting deleted");
        Ok(())
    }

    /// Link the meeting to the recurring slot its members applied for.
    pub async fn link_slot(&self, meeting_id: Uuid, slot_id: Uuid) -> Result<()> {
        self.get_existing(meeting_id).await?;
        self.meetings.link_slot(meeting_id, slot_id).await
    }

    pub async fn get(&self, meeting_id: Uuid) -> Result<Meeting> {
        self.get_existing(meeting_id).await
    }

    pub async fn members(&self, meeting_id: Uuid) -> Result<Vec<MeetingMember>> {
        self.meetings.members(meeting_id).await
    }

    /// Close out meetings whose date has passed: confirmed ones are marked
    /// completed, planned ones that never got confirmed are cancelled.
    pub async fn sweep_past(&self, today: NaiveDate) -> Result<usize> {
        let stale = self.meetings.open_meetings_before(today).await?;
        let mut swept = 0;
        for meeting in stale {
            let target = match meeting.status {
                MeetingStatus::Confirmed => MeetingStatus::Completed,
                MeetingStatus::Planned => MeetingStatus::Cancelled,
                _ => continue,
            };
            if let Err(err) = self.meetings.set_status(meeting.id, target).await {
                warn!(meeting_id = %meeting.id, error = %err, "failed to sweep past meeting");
                continue;
            }
            info!(meeting_id = %meeting.id, status = %target, "past meeting swept");
            swept += 1;
        }
        Ok(swept)
    }

    /// Best-effort roster notification; individual delivery failures are
    /// logged and do not fail the operation.
    async fn notify_roster(&self, meeting: &Meeting, text: &str) -> Result<()> {
        for member in self.meetings.members(meeting.id).await? {
            if let Err(err) = self.gateway.deliver(member.user_id, text).await {
                warn!(
                    meeting_id = %meeting.id,
                    user_id = member.user_id,
                    error = %err,
                    "failed to notify roster member"
                );
            }
        }
        Ok(())
    }

    async fn get_existing(&self, id: Uuid) -> Result<Meeting> {
        self.meetings
            .get(id)
            .await?
            .ok_or_else(|| RoundtableError::NotFound(format!("meeting {id} no longer exists")))
    }
}
