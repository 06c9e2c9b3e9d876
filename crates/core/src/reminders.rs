//! Reminder dispatch - the poll-driven engine that sends day-before and
//! hour-before meeting reminders at most once per (meeting, member, kind).
//!
//! Correctness rests on the durable [`ReminderLedger`]: a member is only
//! delivered to after `try_claim` atomically created the record for that
//! (meeting, user, kind). The per-day marker in [`ServiceState`] merely
//! short-cuts the day-before scan; a process restart mid-day cannot re-fire
//! because the ledger is checked per member either way.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, NaiveDate, NaiveDateTime};
use roundtable_domain::constants::{
    DEFAULT_HOUR_BEFORE_MAX_MINUTES, DEFAULT_HOUR_BEFORE_MIN_MINUTES, DELIVERY_MAX_ATTEMPTS,
    DELIVERY_RETRY_BASE_MS, LAST_DAY_BEFORE_RUN_KEY,
};
use roundtable_domain::{
    DeliveryError, Meeting, MeetingMember, RecurringSlot, ReminderKind, Result, SchedulerConfig,
    UserId,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::messages;
use crate::ports::{MeetingRepository, NotificationGateway, ReminderLedger, ServiceState};

/// Tuning for the dispatch cycle.
#[derive(Debug, Clone)]
pub struct ReminderServiceConfig {
    /// Lower edge of the hour-before due band, minutes before start.
    pub hour_before_min_minutes: i64,
    /// Upper edge of the hour-before due band, minutes before start.
    pub hour_before_max_minutes: i64,
    pub day_before_enabled: bool,
    pub hour_before_enabled: bool,
    /// Delivery attempts per member per occurrence.
    pub max_delivery_attempts: usize,
    /// Base delay between attempts; grows linearly per attempt.
    pub retry_base_delay: Duration,
}

impl Default for ReminderServiceConfig {
    fn default() -> Self {
        Self {
            hour_before_min_minutes: DEFAULT_HOUR_BEFORE_MIN_MINUTES,
            hour_before_max_minutes: DEFAULT_HOUR_BEFORE_MAX_MINUTES,
            day_before_enabled: true,
            hour_before_enabled: true,
            max_delivery_attempts: DELIVERY_MAX_ATTEMPTS,
            retry_base_delay: Duration::from_millis(DELIVERY_RETRY_BASE_MS),
        }
    }
}

impl From<&SchedulerConfig> for ReminderServiceConfig {
    fn from(config: &SchedulerConfig) -> Self {
        Self {
            hour_before_min_minutes: config.hour_before_min_minutes,
            hour_before_max_minutes: config.hour_before_max_minutes,
            day_before_enabled: config.day_before_enabled,
            hour_before_enabled: config.hour_before_enabled,
            ..Self::default()
        }
    }
}

/// Outcome of one dispatch cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub day_before_sent: usize,
    pub hour_before_sent: usize,
    pub failures: usize,
    /// True when the cycle was skipped because another one was in flight.
    pub skipped_overlap: bool,
}

/// Whether a meeting starting at `meeting_start` is inside the hour-before
/// due band as seen from `now`.
pub fn hour_before_due(
    meeting_start: NaiveDateTime,
    now: NaiveDateTime,
    min_minutes: i64,
    max_minutes: i64,
) -> bool {
    let minutes_until = (meeting_start - now).num_minutes();
    minutes_until >= min_minutes && minutes_until <= max_minutes
}

/// Result of one claim-then-send attempt.
enum DispatchOutcome {
    Delivered,
    AlreadyRecorded,
    SkippedPermanent,
    FailedTransient,
}

/// The reminder dispatcher.
pub struct ReminderService {
    meetings: Arc<dyn MeetingRepository>,
    ledger: Arc<dyn ReminderLedger>,
    state: Arc<dyn ServiceState>,
    gateway: Arc<dyn NotificationGateway>,
    config: ReminderServiceConfig,
    // Single-flight guard: due-window checks are not safe under concurrent
    // cycles.
    cycle_guard: Mutex<()>,
}

impl ReminderService {
    pub fn new(
        meetings: Arc<dyn MeetingRepository>,
        ledger: Arc<dyn ReminderLedger>,
        state: Arc<dyn ServiceState>,
        gateway: Arc<dyn NotificationGateway>,
        config: ReminderServiceConfig,
    ) -> Self {
        Self { meetings, ledger, state, gateway, config, cycle_guard: Mutex::new(()) }
    }

    /// Run one dispatch cycle at instant `now` (local time of the venue
    /// region, matching how meetings are stored).
    ///
    /// The day-before and hour-before paths are independent; within a batch
    /// member order is unspecified. One member's delivery failure never
    /// blocks the rest.
    pub async fn run_cycle(&self, now: NaiveDateTime) -> Result<CycleReport> {
        let Ok(_guard) = self.cycle_guard.try_lock() else {
            warn!("reminder cycle already in flight; skipping this invocation");
            return Ok(CycleReport { skipped_overlap: true, ..CycleReport::default() });
        };

        let mut report = CycleReport::default();

        if self.config.day_before_enabled {
            self.day_before_pass(now.date(), &mut report).await;
        }
        if self.config.hour_before_enabled {
            self.hour_before_pass(now, &mut report).await;
        }

        debug!(
            day_before = report.day_before_sent,
            hour_before = report.hour_before_sent,
            failures = report.failures,
            "reminder cycle completed"
        );
        Ok(report)
    }

    /// Meetings happening tomorrow, once per calendar day.
    async fn day_before_pass(&self, today: NaiveDate, report: &mut CycleReport) {
        match self.last_day_before_run().await {
            Ok(Some(last)) if last == today => return,
            Ok(_) => {}
            Err(err) => {
                warn!(error = %err, "failed to read day-before marker");
                report.failures += 1;
                return;
            }
        }

        let tomorrow = today + ChronoDuration::days(1);
        let meetings = match self.meetings.confirmed_on_date(tomorrow).await {
            Ok(meetings) => meetings,
            Err(err) => {
                warn!(error = %err, "day-before scan failed");
                report.failures += 1;
                return;
            }
        };

        let mut all_settled = true;
        for meeting in &meetings {
            all_settled &=
                self.dispatch_to_roster(meeting, ReminderKind::DayBefore, report).await;
        }

        // The marker only bounds the scan frequency; the ledger above is
        // what prevents re-sends after a restart. While any member still has
        // a retryable failure the marker stays put, so the next poll rescans
        // and retries the released claims.
        if all_settled {
            if let Err(err) =
                self.state.set(LAST_DAY_BEFORE_RUN_KEY, &today.format("%Y-%m-%d").to_string()).await
            {
                warn!(error = %err, "failed to persist day-before marker");
                report.failures += 1;
            }
        }

        if !meetings.is_empty() {
            info!(meetings = meetings.len(), date = %tomorrow, "day-before reminders dispatched");
        }
    }

    /// Meetings whose start falls inside `[now + min, now + max]`.
    async fn hour_before_pass(&self, now: NaiveDateTime, report: &mut CycleReport) {
        let from = now + ChronoDuration::minutes(self.config.hour_before_min_minutes);
        let to = now + ChronoDuration::minutes(self.config.hour_before_max_minutes);

        let meetings = match self.meetings.confirmed_between(from, to).await {
            Ok(meetings) => meetings,
            Err(err) => {
                warn!(error = %err, "hour-before scan failed");
                report.failures += 1;
                return;
            }
        };

        for meeting in meetings.iter().filter(|meeting| {
            hour_before_due(
                meeting.starts_at(),
                now,
                self.config.hour_before_min_minutes,
                self.config.hour_before_max_minutes,
            )
        }) {
            self.dispatch_to_roster(meeting, ReminderKind::HourBefore, report).await;
        }
    }

    /// Dispatch one reminder kind to a meeting's roster. Returns false when
    /// any member is left with a retryable failure (a released claim or an
    /// infrastructure error).
    async fn dispatch_to_roster(
        &self,
        meeting: &Meeting,
        kind: ReminderKind,
        report: &mut CycleReport,
    ) -> bool {
        let roster = match self.meetings.members(meeting.id).await {
            Ok(roster) => roster,
            Err(err) => {
                warn!(meeting_id = %meeting.id, error = %err, "failed to load roster");
                report.failures += 1;
                return false;
            }
        };
        let slot = match self.meetings.linked_slot(meeting.id).await {
            Ok(slot) => slot,
            Err(err) => {
                // Preference annotation is decoration; the reminder still
                // goes out without it.
                warn!(meeting_id = %meeting.id, error = %err, "failed to load linked slot");
                None
            }
        };

        let mut all_settled = true;
        for member in &roster {
            match self.dispatch_one(meeting, slot.as_ref(), &roster, member, kind).await {
                Ok(DispatchOutcome::Delivered) => match kind {
                    ReminderKind::DayBefore => report.day_before_sent += 1,
                    ReminderKind::HourBefore => report.hour_before_sent += 1,
                },
                Ok(DispatchOutcome::AlreadyRecorded) => {}
                Ok(DispatchOutcome::SkippedPermanent) => {
                    report.failures += 1;
                }
                Ok(DispatchOutcome::FailedTransient) => {
                    report.failures += 1;
                    all_settled = false;
                }
                Err(err) => {
                    warn!(
                        meeting_id = %meeting.id,
                        user_id = member.user_id,
                        kind = %kind,
                        error = %err,
                        "reminder dispatch failed"
                    );
                    report.failures += 1;
                    all_settled = false;
                }
            }
        }
        all_settled
    }

    /// Claim-then-send for one member.
    async fn dispatch_one(
        &self,
        meeting: &Meeting,
        slot: Option<&RecurringSlot>,
        roster: &[MeetingMember],
        member: &MeetingMember,
        kind: ReminderKind,
    ) -> Result<DispatchOutcome> {
        if !self.ledger.try_claim(meeting.id, member.user_id, kind).await? {
            debug!(
                meeting_id = %meeting.id,
                user_id = member.user_id,
                kind = %kind,
                "reminder already recorded; skipping"
            );
            return Ok(DispatchOutcome::AlreadyRecorded);
        }

        let text = match kind {
            ReminderKind::DayBefore => {
                messages::day_before_text(meeting, slot, roster, member.user_id)
            }
            ReminderKind::HourBefore => messages::hour_before_text(meeting, slot),
        };

        match self.deliver_with_retry(member.user_id, &text).await {
            Ok(()) => Ok(DispatchOutcome::Delivered),
            Err(DeliveryError::Permanent(reason)) => {
                // Keep the claim: a permanent failure must never be retried.
                warn!(
                    meeting_id = %meeting.id,
                    user_id = member.user_id,
                    kind = %kind,
                    reason = %reason,
                    "permanent delivery failure; member skipped"
                );
                Ok(DispatchOutcome::SkippedPermanent)
            }
            Err(DeliveryError::Transient(reason)) => {
                // Release the claim so the next cycle may retry while the
                // meeting is still inside its due window.
                if let Err(release_err) =
                    self.ledger.release(meeting.id, member.user_id, kind).await
                {
                    warn!(
                        meeting_id = %meeting.id,
                        user_id = member.user_id,
                        error = %release_err,
                        "failed to release reminder claim"
                    );
                }
                warn!(
                    meeting_id = %meeting.id,
                    user_id = member.user_id,
                    kind = %kind,
                    attempts = self.config.max_delivery_attempts,
                    reason = %reason,
                    "delivery attempts exhausted; will retry next cycle"
                );
                Ok(DispatchOutcome::FailedTransient)
            }
        }
    }

    /// Bounded retry with linearly growing backoff. Permanent errors break
    /// out immediately.
    async fn deliver_with_retry(
        &self,
        user_id: UserId,
        text: &str,
    ) -> std::result::Result<(), DeliveryError> {
        let mut last_error = None;
        for attempt in 1..=self.config.max_delivery_attempts {
            match self.gateway.deliver(user_id, text).await {
                Ok(()) => return Ok(()),
                Err(err @ DeliveryError::Permanent(_)) => return Err(err),
                Err(err @ DeliveryError::Transient(_)) => {
                    debug!(user_id, attempt, error = %err, "transient delivery failure");
                    last_error = Some(err);
                    if attempt < self.config.max_delivery_attempts {
                        tokio::time::sleep(self.config.retry_base_delay * attempt as u32).await;
                    }
                }
            }
        }
        Err(last_error.unwrap_or_else(|| DeliveryError::Transient("no attempts made".into())))
    }

    async fn last_day_before_run(&self) -> Result<Option<NaiveDate>> {
        Ok(self
            .state
            .get(LAST_DAY_BEFORE_RUN_KEY)
            .await?
            .and_then(|value| NaiveDate::parse_from_str(&value, "%Y-%m-%d").ok()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveTime, Utc};
    use roundtable_domain::{MeetingStatus, RoundtableError};
    use uuid::Uuid;

    use super::*;
    use crate::ports::MeetingRepository;

    struct MemoryMeetings {
        meetings: Vec<Meeting>,
        members: Vec<MeetingMember>,
    }

    #[async_trait]
    impl MeetingRepository for MemoryMeetings {
        async fn insert(&self, _meeting: &Meeting) -> Result<()> {
            unimplemented!("not used by these tests")
        }

        async fn get(&self, id: Uuid) -> Result<Option<Meeting>> {
            Ok(self.meetings.iter().find(|m| m.id == id).cloned())
        }

        async fn set_status(&self, _id: Uuid, _status: MeetingStatus) -> Result<()> {
            unimplemented!("not used by these tests")
        }

        async fn delete_with_revert(&self, _id: Uuid) -> Result<usize> {
            unimplemented!("not used by these tests")
        }

        async fn add_member(&self, _member: &MeetingMember) -> Result<bool> {
            unimplemented!("not used by these tests")
        }

        async fn remove_member(&self, _meeting_id: Uuid, _user_id: UserId) -> Result<bool> {
            unimplemented!("not used by these tests")
        }

        async fn members(&self, meeting_id: Uuid) -> Result<Vec<MeetingMember>> {
            Ok(self.members.iter().filter(|m| m.meeting_id == meeting_id).cloned().collect())
        }

        async fn link_slot(&self, _meeting_id: Uuid, _slot_id: Uuid) -> Result<()> {
            Ok(())
        }

        async fn linked_slot(&self, _meeting_id: Uuid) -> Result<Option<RecurringSlot>> {
            Ok(None)
        }

        async fn confirmed_on_date(&self, date: NaiveDate) -> Result<Vec<Meeting>> {
            Ok(self
                .meetings
                .iter()
                .filter(|m| m.date == date && m.status == MeetingStatus::Confirmed)
                .cloned()
                .collect())
        }

        async fn confirmed_between(
            &self,
            from: NaiveDateTime,
            to: NaiveDateTime,
        ) -> Result<Vec<Meeting>> {
            Ok(self
                .meetings
                .iter()
                .filter(|m| {
                    m.status == MeetingStatus::Confirmed
                        && m.starts_at() >= from
                        && m.starts_at() <= to
                })
                .cloned()
                .collect())
        }

        async fn open_meetings_before(&self, _date: NaiveDate) -> Result<Vec<Meeting>> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct MemoryLedger {
        records: StdMutex<HashSet<(Uuid, UserId, ReminderKind)>>,
    }

    #[async_trait]
    impl ReminderLedger for MemoryLedger {
        async fn try_claim(
            &self,
            meeting_id: Uuid,
            user_id: UserId,
            kind: ReminderKind,
        ) -> Result<bool> {
            Ok(self.records.lock().unwrap().insert((meeting_id, user_id, kind)))
        }

        async fn release(
            &self,
            meeting_id: Uuid,
            user_id: UserId,
            kind: ReminderKind,
        ) -> Result<()> {
            self.records.lock().unwrap().remove(&(meeting_id, user_id, kind));
            Ok(())
        }

        async fn was_sent(
            &self,
            meeting_id: Uuid,
            user_id: UserId,
            kind: ReminderKind,
        ) -> Result<bool> {
            Ok(self.records.lock().unwrap().contains(&(meeting_id, user_id, kind)))
        }
    }

    #[derive(Default)]
    struct MemoryState {
        values: StdMutex<HashMap<String, String>>,
    }

    #[async_trait]
    impl ServiceState for MemoryState {
        async fn get(&self, key: &str) -> Result<Option<String>> {
            Ok(self.values.lock().unwrap().get(key).cloned())
        }

        async fn set(&self, key: &str, value: &str) -> Result<()> {
            self.values.lock().unwrap().insert(key.to_string(), value.to_string());
            Ok(())
        }
    }

    /// Scripted gateway: pops one response per call, defaults to Ok.
    struct ScriptedGateway {
        responses: StdMutex<HashMap<UserId, Vec<std::result::Result<(), DeliveryError>>>>,
        calls: StdMutex<Vec<UserId>>,
    }

    impl ScriptedGateway {
        fn ok() -> Self {
            Self { responses: StdMutex::new(HashMap::new()), calls: StdMutex::new(Vec::new()) }
        }

        fn with_responses(
            user_id: UserId,
            responses: Vec<std::result::Result<(), DeliveryError>>,
        ) -> Self {
            let gateway = Self::ok();
            gateway.responses.lock().unwrap().insert(user_id, responses);
            gateway
        }

        fn calls_for(&self, user_id: UserId) -> usize {
            self.calls.lock().unwrap().iter().filter(|id| **id == user_id).count()
        }
    }

    #[async_trait]
    impl NotificationGateway for ScriptedGateway {
        async fn deliver(
            &self,
            user_id: UserId,
            _text: &str,
        ) -> std::result::Result<(), DeliveryError> {
            self.calls.lock().unwrap().push(user_id);
            let mut responses = self.responses.lock().unwrap();
            match responses.get_mut(&user_id) {
                Some(queue) if !queue.is_empty() => queue.remove(0),
                _ => Ok(()),
            }
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn confirmed_meeting(d: NaiveDate, hour: u32) -> Meeting {
        Meeting {
            id: Uuid::new_v4(),
            name: "Berlin roundtable".into(),
            date: d,
            time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
            city: "Berlin".into(),
            venue: "Cafe Einstein".into(),
            venue_address: None,
            status: MeetingStatus::Confirmed,
            created_by: None,
            created_at: Utc::now(),
        }
    }

    fn member_of(meeting: &Meeting, user_id: UserId) -> MeetingMember {
        MeetingMember {
            meeting_id: meeting.id,
            user_id,
            display_name: Some(format!("user-{user_id}")),
            joined_at: Utc::now(),
            added_by: None,
        }
    }

    fn fast_config() -> ReminderServiceConfig {
        ReminderServiceConfig {
            retry_base_delay: Duration::from_millis(1),
            ..ReminderServiceConfig::default()
        }
    }

    fn service_with(
        meetings: MemoryMeetings,
        gateway: Arc<ScriptedGateway>,
        ledger: Arc<MemoryLedger>,
        state: Arc<MemoryState>,
    ) -> ReminderService {
        ReminderService::new(Arc::new(meetings), ledger, state, gateway, fast_config())
    }

    #[test]
    fn due_band_matches_reference_windows() {
        let start = date(2024, 6, 5).and_hms_opt(18, 0, 0).unwrap();
        let at = |h: u32, m: u32| date(2024, 6, 5).and_hms_opt(h, m, 0).unwrap();

        assert!(hour_before_due(start, at(17, 10), 40, 80)); // 50 min out
        assert!(hour_before_due(start, at(16, 40), 40, 80)); // 80 min out
        assert!(hour_before_due(start, at(17, 20), 40, 80)); // 40 min out
        assert!(!hour_before_due(start, at(16, 30), 40, 80)); // 90 min out
        assert!(!hour_before_due(start, at(17, 30), 40, 80)); // 30 min out
        assert!(!hour_before_due(start, at(18, 30), 40, 80)); // already started
    }

    #[tokio::test]
    async fn hour_before_fires_once_across_polls() {
        let meeting = confirmed_meeting(date(2024, 6, 5), 18);
        let members = vec![member_of(&meeting, 1), member_of(&meeting, 2)];
        let gateway = Arc::new(ScriptedGateway::ok());
        let ledger = Arc::new(MemoryLedger::default());
        let state = Arc::new(MemoryState::default());
        let service = service_with(
            MemoryMeetings { meetings: vec![meeting.clone()], members },
            gateway.clone(),
            ledger.clone(),
            state,
        );

        // 17:10 - 50 minutes before - inside the band.
        let report =
            service.run_cycle(date(2024, 6, 5).and_hms_opt(17, 10, 0).unwrap()).await.unwrap();
        assert_eq!(report.hour_before_sent, 2);

        // 17:15 - still inside the band, but both members are recorded.
        let report =
            service.run_cycle(date(2024, 6, 5).and_hms_opt(17, 15, 0).unwrap()).await.unwrap();
        assert_eq!(report.hour_before_sent, 0);
        assert_eq!(gateway.calls_for(1), 1);
        assert_eq!(gateway.calls_for(2), 1);
        assert!(ledger.was_sent(meeting.id, 1, ReminderKind::HourBefore).await.unwrap());
    }

    #[tokio::test]
    async fn day_before_does_not_refire_after_restart() {
        let tomorrow = date(2024, 6, 6);
        let meeting = confirmed_meeting(tomorrow, 18);
        let members = vec![member_of(&meeting, 7)];
        let gateway = Arc::new(ScriptedGateway::ok());
        let ledger = Arc::new(MemoryLedger::default());
        let state = Arc::new(MemoryState::default());

        let service = service_with(
            MemoryMeetings { meetings: vec![meeting.clone()], members: members.clone() },
            gateway.clone(),
            ledger.clone(),
            state,
        );
        let now = date(2024, 6, 5).and_hms_opt(9, 0, 0).unwrap();
        let report = service.run_cycle(now).await.unwrap();
        assert_eq!(report.day_before_sent, 1);

        // Simulated restart: fresh service and a *lost* marker, shared ledger.
        let service = service_with(
            MemoryMeetings { meetings: vec![meeting], members },
            gateway.clone(),
            ledger,
            Arc::new(MemoryState::default()),
        );
        let report = service.run_cycle(now).await.unwrap();
        assert_eq!(report.day_before_sent, 0, "ledger must prevent the restart re-fire");
        assert_eq!(gateway.calls_for(7), 1);
    }

    #[tokio::test]
    async fn day_before_marker_waits_for_retryable_members() {
        let tomorrow = date(2024, 6, 6);
        let meeting = confirmed_meeting(tomorrow, 18);
        let members = vec![member_of(&meeting, 1), member_of(&meeting, 2)];
        // Member 2 is down for a whole cycle's worth of attempts, then OK.
        let gateway = Arc::new(ScriptedGateway::with_responses(
            2,
            vec![
                Err(DeliveryError::Transient("down".into())),
                Err(DeliveryError::Transient("down".into())),
                Err(DeliveryError::Transient("down".into())),
                Ok(()),
            ],
        ));
        let state = Arc::new(MemoryState::default());
        let service = service_with(
            MemoryMeetings { meetings: vec![meeting], members },
            gateway.clone(),
            Arc::new(MemoryLedger::default()),
            state.clone(),
        );

        let now = date(2024, 6, 5).and_hms_opt(9, 0, 0).unwrap();
        let report = service.run_cycle(now).await.unwrap();
        assert_eq!(report.day_before_sent, 1);
        assert_eq!(report.failures, 1);
        assert!(
            state.get(LAST_DAY_BEFORE_RUN_KEY).await.unwrap().is_none(),
            "marker must not advance past a retryable member"
        );

        // Next poll the same day: only the failed member is retried.
        let report = service.run_cycle(now).await.unwrap();
        assert_eq!(report.day_before_sent, 1);
        assert_eq!(report.failures, 0);
        assert_eq!(gateway.calls_for(1), 1, "member 1 was never re-sent");
        assert_eq!(
            state.get(LAST_DAY_BEFORE_RUN_KEY).await.unwrap().as_deref(),
            Some("2024-06-05")
        );

        // With the marker set, further polls skip the scan entirely.
        let report = service.run_cycle(now).await.unwrap();
        assert_eq!(report.day_before_sent, 0);
        assert_eq!(gateway.calls_for(2), 4);
    }

    #[tokio::test]
    async fn transient_failure_is_retried_within_the_cycle() {
        let meeting = confirmed_meeting(date(2024, 6, 5), 18);
        let members = vec![member_of(&meeting, 3)];
        let gateway = Arc::new(ScriptedGateway::with_responses(
            3,
            vec![Err(DeliveryError::Transient("gateway hiccup".into())), Ok(())],
        ));
        let ledger = Arc::new(MemoryLedger::default());
        let service = service_with(
            MemoryMeetings { meetings: vec![meeting.clone()], members },
            gateway.clone(),
            ledger.clone(),
            Arc::new(MemoryState::default()),
        );

        let report =
            service.run_cycle(date(2024, 6, 5).and_hms_opt(17, 10, 0).unwrap()).await.unwrap();
        assert_eq!(report.hour_before_sent, 1);
        assert_eq!(report.failures, 0);
        assert_eq!(gateway.calls_for(3), 2);
        assert!(ledger.was_sent(meeting.id, 3, ReminderKind::HourBefore).await.unwrap());
    }

    #[tokio::test]
    async fn exhausted_transient_releases_claim_for_next_cycle() {
        let meeting = confirmed_meeting(date(2024, 6, 5), 18);
        let members = vec![member_of(&meeting, 4)];
        let gateway = Arc::new(ScriptedGateway::with_responses(
            4,
            vec![
                Err(DeliveryError::Transient("down".into())),
                Err(DeliveryError::Transient("down".into())),
                Err(DeliveryError::Transient("down".into())),
                Ok(()),
            ],
        ));
        let ledger = Arc::new(MemoryLedger::default());
        let service = service_with(
            MemoryMeetings { meetings: vec![meeting.clone()], members },
            gateway.clone(),
            ledger.clone(),
            Arc::new(MemoryState::default()),
        );

        let report =
            service.run_cycle(date(2024, 6, 5).and_hms_opt(17, 10, 0).unwrap()).await.unwrap();
        assert_eq!(report.failures, 1);
        assert!(!ledger.was_sent(meeting.id, 4, ReminderKind::HourBefore).await.unwrap());

        // Next poll, still inside the band: the fourth attempt succeeds.
        let report =
            service.run_cycle(date(2024, 6, 5).and_hms_opt(17, 14, 0).unwrap()).await.unwrap();
        assert_eq!(report.hour_before_sent, 1);
        assert_eq!(gateway.calls_for(4), 4);
    }

    #[tokio::test]
    async fn permanent_failure_is_never_retried() {
        let meeting = confirmed_meeting(date(2024, 6, 5), 18);
        let members = vec![member_of(&meeting, 5)];
        let gateway = Arc::new(ScriptedGateway::with_responses(
            5,
            vec![Err(DeliveryError::Permanent("recipient blocked the bot".into()))],
        ));
        let ledger = Arc::new(MemoryLedger::default());
        let service = service_with(
            MemoryMeetings { meetings: vec![meeting.clone()], members },
            gateway.clone(),
            ledger.clone(),
            Arc::new(MemoryState::default()),
        );

        let report =
            service.run_cycle(date(2024, 6, 5).and_hms_opt(17, 10, 0).unwrap()).await.unwrap();
        assert_eq!(report.failures, 1);
        assert_eq!(gateway.calls_for(5), 1, "permanent errors get exactly one attempt");

        // The claim is kept, so the next cycle does not touch the member.
        service.run_cycle(date(2024, 6, 5).and_hms_opt(17, 14, 0).unwrap()).await.unwrap();
        assert_eq!(gateway.calls_for(5), 1);
    }

    #[tokio::test]
    async fn one_failing_member_does_not_block_the_rest() {
        let meeting = confirmed_meeting(date(2024, 6, 5), 18);
        let members = vec![
            member_of(&meeting, 1),
            member_of(&meeting, 2),
            member_of(&meeting, 3),
        ];
        let gateway = Arc::new(ScriptedGateway::with_responses(
            2,
            vec![Err(DeliveryError::Permanent("blocked".into()))],
        ));
        let service = service_with(
            MemoryMeetings { meetings: vec![meeting], members },
            gateway.clone(),
            Arc::new(MemoryLedger::default()),
            Arc::new(MemoryState::default()),
        );

        let report =
            service.run_cycle(date(2024, 6, 5).and_hms_opt(17, 10, 0).unwrap()).await.unwrap();
        assert_eq!(report.hour_before_sent, 2);
        assert_eq!(report.failures, 1);
        assert_eq!(gateway.calls_for(1), 1);
        assert_eq!(gateway.calls_for(3), 1);
    }

    #[tokio::test]
    async fn ledger_errors_fail_soft() {
        struct FailingLedger;

        #[async_trait]
        impl ReminderLedger for FailingLedger {
            async fn try_claim(&self, _: Uuid, _: UserId, _: ReminderKind) -> Result<bool> {
                Err(RoundtableError::Database("ledger unavailable".into()))
            }

            async fn release(&self, _: Uuid, _: UserId, _: ReminderKind) -> Result<()> {
                Ok(())
            }

            async fn was_sent(&self, _: Uuid, _: UserId, _: ReminderKind) -> Result<bool> {
                Ok(false)
            }
        }

        let meeting = confirmed_meeting(date(2024, 6, 5), 18);
        let members = vec![member_of(&meeting, 1)];
        let gateway = Arc::new(ScriptedGateway::ok());
        let service = ReminderService::new(
            Arc::new(MemoryMeetings { meetings: vec![meeting], members }),
            Arc::new(FailingLedger),
            Arc::new(MemoryState::default()),
            gateway.clone(),
            fast_config(),
        );

        let report =
            service.run_cycle(date(2024, 6, 5).and_hms_opt(17, 10, 0).unwrap()).await.unwrap();
        assert_eq!(report.failures, 1);
        assert_eq!(gateway.calls_for(1), 0, "no delivery without a ledger claim");
    }

    #[tokio::test]
    async fn overlapping_cycles_are_skipped() {
        use tokio::sync::Semaphore;

        struct BlockingGateway {
            gate: Semaphore,
        }

        #[async_trait]
        impl NotificationGateway for BlockingGateway {
            async fn deliver(
                &self,
                _user_id: UserId,
                _text: &str,
            ) -> std::result::Result<(), DeliveryError> {
                let _permit = self.gate.acquire().await.expect("semaphore open");
                Ok(())
            }
        }

        let meeting = confirmed_meeting(date(2024, 6, 5), 18);
        let members = vec![member_of(&meeting, 1)];
        let gateway = Arc::new(BlockingGateway { gate: Semaphore::new(0) });
        let service = Arc::new(ReminderService::new(
            Arc::new(MemoryMeetings { meetings: vec![meeting], members }),
            Arc::new(MemoryLedger::default()),
            Arc::new(MemoryState::default()),
            gateway.clone(),
            fast_config(),
        ));

        let now = date(2024, 6, 5).and_hms_opt(17, 10, 0).unwrap();
        let in_flight = tokio::spawn({
            let service = Arc::clone(&service);
            async move { service.run_cycle(now).await }
        });

        // Give the first cycle time to park inside the gateway.
        tokio::time::sleep(Duration::from_millis(20)).await;
        let report = service.run_cycle(now).await.unwrap();
        assert!(report.skipped_overlap);

        gateway.gate.add_permits(8);
        let report = in_flight.await.unwrap().unwrap();
        assert!(!report.skipped_overlap);
        assert_eq!(report.hour_before_sent, 1);
    }
}
