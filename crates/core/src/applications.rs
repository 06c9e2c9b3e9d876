//! Application ledger - submit, decide, cancel.

use std::sync::Arc;

use roundtable_domain::{
    Application, ApplicationOutcome, ApplicationStatus, Result, RoundtableError, UserId,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::messages;
use crate::ports::{ApplicationRepository, NotificationGateway, SlotRepository};

/// Application lifecycle service.
///
/// Enforces the one-open-application-per-(user, slot) invariant and the
/// pending -> approved/rejected/cancelled transitions.
pub struct ApplicationService {
    applications: Arc<dyn ApplicationRepository>,
    slots: Arc<dyn SlotRepository>,
    gateway: Arc<dyn NotificationGateway>,
}

impl ApplicationService {
    pub fn new(
        applications: Arc<dyn ApplicationRepository>,
        slots: Arc<dyn SlotRepository>,
        gateway: Arc<dyn NotificationGateway>,
    ) -> Self {
        Self { applications, slots, gateway }
    }

    /// Submit an application for a recurring slot.
    ///
    /// Fails with [`RoundtableError::DuplicateApplication`] when a
    /// non-cancelled application already exists for the pair.
    pub async fn submit(&self, user_id: UserId, slot_id: Uuid) -> Result<Application> {
        let slot = self
            .slots
            .get_slot(slot_id)
            .await?
            .ok_or_else(|| RoundtableError::NotFound(format!("slot {slot_id} does not exist")))?;
        if !slot.active {
            return Err(RoundtableError::Validation(format!(
                "slot {slot_id} is no longer accepting applications"
            )));
        }

        if self.applications.find_open(user_id, slot_id).await?.is_some() {
            return Err(RoundtableError::DuplicateApplication { user_id, slot_id });
        }

        let application = Application::new(user_id, slot_id);
        self.applications.insert(&application).await?;
        info!(application_id = %application.id, user_id, slot_id = %slot_id, "application submitted");
        Ok(application)
    }

    /// Decide a pending application.
    ///
    /// Re-deciding an already-decided application is a no-op with a warning;
    /// admin front-ends retry idempotently. Deciding a cancelled application
    /// is an error.
    pub async fn decide(
        &self,
        application_id: Uuid,
        outcome: ApplicationOutcome,
        note: Option<String>,
    ) -> Result<Application> {
        let application = self.get_existing(application_id).await?;

        match application.status {
            ApplicationStatus::Pending => {}
            status if status.is_decided() => {
                warn!(
                    application_id = %application_id,
                    status = %status,
                    "application already decided; ignoring repeat decision"
                );
                return Ok(application);
            }
            status => {
                return Err(RoundtableError::InvalidTransition {
                    from: status.to_string(),
                    to: ApplicationStatus::from(outcome).to_string(),
                });
            }
        }

        let status = ApplicationStatus::from(outcome);
        self.applications.update_status(application_id, status, note.clone()).await?;
        info!(application_id = %application_id, status = %status, "application decided");

        let text = messages::application_decision_text(
            matches!(outcome, ApplicationOutcome::Approved),
            note.as_deref(),
        );
        if let Err(err) = self.gateway.deliver(application.user_id, &text).await {
            warn!(
                user_id = application.user_id,
                error = %err,
                "failed to notify applicant of decision"
            );
        }

        self.get_existing(application_id).await
    }

    /// Cancel a pending application. Only the pending state may be cancelled.
    pub async fn cancel(&self, application_id: Uuid) -> Result<()> {
        let application = self.get_existing(application_id).await?;
        if application.status != ApplicationStatus::Pending {
            return Err(RoundtableError::InvalidTransition {
                from: application.status.to_string(),
                to: ApplicationStatus::Cancelled.to_string(),
            });
        }

        self.applications.update_status(application_id, ApplicationStatus::Cancelled, None).await?;
        info!(application_id = %application_id, "application cancelled");
        Ok(())
    }

    /// All applications of one user, newest first (repository ordering).
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Application>> {
        self.applications.list_by_user(user_id).await
    }

    /// Pending applications waiting on a slot, for admin review.
    pub async fn pending_for_slot(&self, slot_id: Uuid) -> Result<Vec<Application>> {
        self.applications.list_pending_for_slot(slot_id).await
    }

    async fn get_existing(&self, id: Uuid) -> Result<Application> {
        self.applications
            .get(id)
            .await?
            .ok_or_else(|| RoundtableError::NotFound(format!("application {id} no longer exists")))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{NaiveTime, Utc};
    use roundtable_domain::{DeliveryError, RecurringSlot, Weekday};

    use super::*;

    #[derive(Default)]
    struct MemoryApplications {
        rows: Mutex<Vec<Application>>,
    }

    #[async_trait]
    impl ApplicationRepository for MemoryApplications {
        async fn insert(&self, application: &Application) -> Result<()> {
            self.rows.lock().unwrap().push(application.clone());
            Ok(())
        }

        async fn get(&self, id: Uuid) -> Result<Option<Application>> {
            Ok(self.rows.lock().unwrap().iter().find(|a| a.id == id).cloned())
        }

        async fn find_open(&self, user_id: UserId, slot_id: Uuid) -> Result<Option<Application>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .find(|a| a.user_id == user_id && a.slot_id == slot_id && a.status.is_open())
                .cloned())
        }

        async fn update_status(
            &self,
            id: Uuid,
            status: ApplicationStatus,
            note: Option<String>,
        ) -> Result<()> {
            let mut rows = self.rows.lock().unwrap();
            let row = rows.iter_mut().find(|a| a.id == id).expect("row exists");
            row.status = status;
            row.admin_note = note;
            if status.is_decided() {
                row.decided_at = Some(Utc::now());
            }
            Ok(())
        }

        async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Application>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|a| a.user_id == user_id)
                .cloned()
                .collect())
        }

        async fn list_pending_for_slot(&self, slot_id: Uuid) -> Result<Vec<Application>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|a| a.slot_id == slot_id && a.status == ApplicationStatus::Pending)
                .cloned()
                .collect())
        }
    }

    struct MemorySlots {
        slots: Vec<RecurringSlot>,
    }

    #[async_trait]
    impl SlotRepository for MemorySlots {
        async fn insert_slot(&self, _slot: &RecurringSlot) -> Result<()> {
            unimplemented!("not used by these tests")
        }

        async fn get_slot(&self, id: Uuid) -> Result<Option<RecurringSlot>> {
            Ok(self.slots.iter().find(|s| s.id == id).cloned())
        }

        async fn list_active_slots(&self) -> Result<Vec<RecurringSlot>> {
            Ok(self.slots.iter().filter(|s| s.active).cloned().collect())
        }

        async fn set_slot_active(&self, _id: Uuid, _active: bool) -> Result<()> {
            unimplemented!("not used by these tests")
        }
    }

    #[derive(Default)]
    struct RecordingGateway {
        delivered: Mutex<Vec<(UserId, String)>>,
    }

    #[async_trait]
    impl NotificationGateway for RecordingGateway {
        async fn deliver(
            &self,
            user_id: UserId,
            text: &str,
        ) -> std::result::Result<(), DeliveryError> {
            self.delivered.lock().unwrap().push((user_id, text.to_string()));
            Ok(())
        }
    }

    fn fixture() -> (ApplicationService, Arc<RecordingGateway>, Uuid) {
        let slot = RecurringSlot::new(
            Weekday::Wednesday,
            NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
            "Berlin",
        )
        .unwrap();
        let slot_id = slot.id;
        let gateway = Arc::new(RecordingGateway::default());
        let service = ApplicationService::new(
            Arc::new(MemoryApplications::default()),
            Arc::new(MemorySlots { slots: vec![slot] }),
            gateway.clone(),
        );
        (service, gateway, slot_id)
    }

    #[tokio::test]
    async fn duplicate_submission_is_rejected_until_cancelled() {
        let (service, _gateway, slot_id) = fixture();

        let first = service.submit(42, slot_id).await.expect("first submit succeeds");
        let second = service.submit(42, slot_id).await;
        assert!(matches!(
            second,
            Err(RoundtableError::DuplicateApplication { user_id: 42, .. })
        ));

        service.cancel(first.id).await.expect("cancel pending application");
        service.submit(42, slot_id).await.expect("resubmit after cancel succeeds");
    }

    #[tokio::test]
    async fn decide_is_idempotent_for_admin_retries() {
        let (service, gateway, slot_id) = fixture();
        let app = service.submit(7, slot_id).await.unwrap();

        let decided = service
            .decide(app.id, ApplicationOutcome::Approved, Some("welcome".into()))
            .await
            .expect("first decision applies");
        assert_eq!(decided.status, ApplicationStatus::Approved);
        assert!(decided.decided_at.is_some());

        // A retry must not flip the status or error out.
        let repeated = service
            .decide(app.id, ApplicationOutcome::Rejected, None)
            .await
            .expect("repeat decision is a no-op");
        assert_eq!(repeated.status, ApplicationStatus::Approved);

        // Exactly one notification went out.
        assert_eq!(gateway.delivered.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn deciding_a_cancelled_application_fails() {
        let (service, _gateway, slot_id) = fixture();
        let app = service.submit(7, slot_id).await.unwrap();
        service.cancel(app.id).await.unwrap();

        let result = service.decide(app.id, ApplicationOutcome::Approved, None).await;
        assert!(matches!(result, Err(RoundtableError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn cancel_requires_pending() {
        let (service, _gateway, slot_id) = fixture();
        let app = service.submit(7, slot_id).await.unwrap();
        service.decide(app.id, ApplicationOutcome::Rejected, None).await.unwrap();

        let result = service.cancel(app.id).await;
        assert!(matches!(result, Err(RoundtableError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn unknown_slot_is_not_found() {
        let (service, _gateway, _slot_id) = fixture();
        let result = service.submit(7, Uuid::new_v4()).await;
        assert!(matches!(result, Err(RoundtableError::NotFound(_))));
    }
}
