//! Health check command

use std::sync::Arc;
use std::time::Instant;

use roundtable_domain::Result;
use serde::{Deserialize, Serialize};

use crate::utils::logging::log_command_execution;
use crate::AppContext;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub database_ok: bool,
    pub db_path: String,
}

/// Verify the process can reach its database.
pub async fn health_check(ctx: &Arc<AppContext>) -> Result<HealthStatus> {
    let start = Instant::now();
    let database_ok = ctx.db.health_check().is_ok();
    let status = HealthStatus {
        database_ok,
        db_path: ctx.db.path().display().to_string(),
    };
    log_command_execution("health::check", start.elapsed(), database_ok);
    Ok(status)
}
