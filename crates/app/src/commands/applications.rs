//! Application commands

use std::sync::Arc;
use std::time::Instant;

use roundtable_domain::{Application, ApplicationOutcome, Result, UserId};
use uuid::Uuid;

use crate::utils::logging::log_command_execution;
use crate::AppContext;

/// Submit a user's application for a recurring slot.
pub async fn submit_application(
    ctx: &Arc<AppContext>,
    user_id: UserId,
    slot_id: Uuid,
) -> Result<Application> {
    let start = Instant::now();
    let result = ctx.applications.submit(user_id, slot_id).await;
    log_command_execution("applications::submit", start.elapsed(), result.is_ok());
    result
}

/// Decide a pending application (admin action). Safe to retry.
pub async fn decide_application(
    ctx: &Arc<AppContext>,
    application_id: Uuid,
    outcome: ApplicationOutcome,
    note: Option<String>,
) -> Result<Application> {
    let start = Instant::now();
    let result = ctx.applications.decide(application_id, outcome, note).await;
    log_command_execution("applications::decide", start.elapsed(), result.is_ok());
    result
}

/// Cancel a pending application (user action).
pub async fn cancel_application(ctx: &Arc<AppContext>, application_id: Uuid) -> Result<()> {
    let start = Instant::now();
    let result = ctx.applications.cancel(application_id).await;
    log_command_execution("applications::cancel", start.elapsed(), result.is_ok());
    result
}

/// All applications of one user, for the "my applications" view.
pub async fn list_user_applications(
    ctx: &Arc<AppContext>,
    user_id: UserId,
) -> Result<Vec<Application>> {
    let start = Instant::now();
    let result = ctx.applications.list_for_user(user_id).await;
    log_command_execution("applications::list_for_user", start.elapsed(), result.is_ok());
    result
}

/// Pending applications for one slot, for the admin review queue.
pub async fn list_pending_applications(
    ctx: &Arc<AppContext>,
    slot_id: Uuid,
) -> Result<Vec<Application>> {
    let start = Instant::now();
    let result = ctx.applications.pending_for_slot(slot_id).await;
    log_command_execution("applications::pending_for_slot", start.elapsed(), result.is_ok());
    result
}
