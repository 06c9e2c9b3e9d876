//! Port interfaces between core business logic and infrastructure
//!
//! These traits define the boundaries between core business logic
//! and infrastructure implementations.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use roundtable_domain::{
    Application, ApplicationStatus, AvailableDate, DeliveryError, Meeting, MeetingMember,
    MeetingStatus, RecurringSlot, ReminderKind, Result, SlotOccurrence, UserId,
};
use uuid::Uuid;

/// Persistence of recurring weekly slots.
#[async_trait]
pub trait SlotRepository: Send + Sync {
    /// Insert a new slot definition.
    async fn insert_slot(&self, slot: &RecurringSlot) -> Result<()>;

    /// Fetch a slot by id.
    async fn get_slot(&self, id: Uuid) -> Result<Option<RecurringSlot>>;

    /// All slots currently marked active.
    async fn list_active_slots(&self) -> Result<Vec<RecurringSlot>>;

    /// Activate or deactivate a slot. Slots are never deleted.
    async fn set_slot_active(&self, id: Uuid, active: bool) -> Result<()>;
}

/// Persisted set of bookable (date, slot) occurrences.
#[async_trait]
pub trait AvailabilityStore: Send + Sync {
    /// Rebuild the rolling window in one transaction: prune rows outside
    /// `[today, today + horizon_days]`, then upsert every projected
    /// occurrence, preserving the `is_available` flag of surviving rows.
    /// Returns the number of rows in the window afterwards.
    async fn reconcile_window(
        &self,
        today: NaiveDate,
        horizon_days: u32,
        occurrences: Vec<SlotOccurrence>,
    ) -> Result<usize>;

    /// Bookable occurrences within the range, available ones only.
    async fn list_available(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<AvailableDate>>;

    /// Look up a single occurrence by its natural key.
    async fn find(&self, date: NaiveDate, slot_id: Uuid) -> Result<Option<AvailableDate>>;

    /// Flip the manual availability flag of one occurrence.
    async fn set_availability(&self, id: Uuid, available: bool) -> Result<()>;
}

/// Persistence of user applications.
#[async_trait]
pub trait ApplicationRepository: Send + Sync {
    async fn insert(&self, application: &Application) -> Result<()>;

    async fn get(&self, id: Uuid) -> Result<Option<Application>>;

    /// The non-cancelled application for (user, slot), if any.
    async fn find_open(&self, user_id: UserId, slot_id: Uuid) -> Result<Option<Application>>;

    /// Update status and admin note; implementations stamp `decided_at`
    /// when the new status is a decision.
    async fn update_status(
        &self,
        id: Uuid,
        status: ApplicationStatus,
        note: Option<String>,
    ) -> Result<()>;

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Application>>;

    async fn list_pending_for_slot(&self, slot_id: Uuid) -> Result<Vec<Application>>;
}

/// Persistence of meetings and their rosters.
#[async_trait]
pub trait MeetingRepository: Send + Sync {
    async fn insert(&self, meeting: &Meeting) -> Result<()>;

    async fn get(&self, id: Uuid) -> Result<Option<Meeting>>;

    async fn set_status(&self, id: Uuid, status: MeetingStatus) -> Result<()>;

    /// Delete the meeting, cascade its roster, and revert applications that
    /// were satisfied by it back to pending, all in one transaction.
    /// Returns the number of reverted applications.
    async fn delete_with_revert(&self, id: Uuid) -> Result<usize>;

    /// Add a roster row. Returns false when the member already existed
    /// (no-op).
    async fn add_member(&self, member: &MeetingMember) -> Result<bool>;

    /// Remove a roster row. Returns false when no row existed.
    async fn remove_member(&self, meeting_id: Uuid, user_id: UserId) -> Result<bool>;

    async fn members(&self, meeting_id: Uuid) -> Result<Vec<MeetingMember>>;

    /// Link the meeting to the recurring slot it was formed from. Used only
    /// to annotate reminder text with the member's original preference.
    async fn link_slot(&self, meeting_id: Uuid, slot_id: Uuid) -> Result<()>;

    async fn linked_slot(&self, meeting_id: Uuid) -> Result<Option<RecurringSlot>>;

    /// Confirmed meetings on a specific date (day-before scan).
    async fn confirmed_on_date(&self, date: NaiveDate) -> Result<Vec<Meeting>>;

    /// Confirmed meetings starting within `[from, to]` (hour-before scan).
    async fn confirmed_between(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<Meeting>>;

    /// Planned or confirmed meetings dated strictly before `date`
    /// (past-meeting sweep).
    async fn open_meetings_before(&self, date: NaiveDate) -> Result<Vec<Meeting>>;
}

/// Durable at-most-once ledger of sent reminders.
#[async_trait]
pub trait ReminderLedger: Send + Sync {
    /// Atomically claim (meeting, user, kind). Returns true when this call
    /// created the record; false when a record already existed. The claim
    /// must be a single check-then-set operation, never read-then-write.
    async fn try_claim(&self, meeting_id: Uuid, user_id: UserId, kind: ReminderKind)
        -> Result<bool>;

    /// Release a claim after delivery failed with a retryable error, so a
    /// later cycle may try again.
    async fn release(&self, meeting_id: Uuid, user_id: UserId, kind: ReminderKind) -> Result<()>;

    /// Whether a record exists for (meeting, user, kind).
    async fn was_sent(&self, meeting_id: Uuid, user_id: UserId, kind: ReminderKind)
        -> Result<bool>;
}

/// Small key/value store for scheduler markers (e.g. the last day-before
/// batch date).
#[async_trait]
pub trait ServiceState: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Outbound message delivery, implemented by the messaging front-end
/// integration.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// Deliver `text` to the user. Transient errors may be retried by the
    /// caller; permanent errors must not be.
    async fn deliver(&self, user_id: UserId, text: &str)
        -> std::result::Result<(), DeliveryError>;
}
