//! Demo command: one pass through the session lifecycle.

use std::time::Duration;

use chrono::Local;
use keystone_session::{ItemStore, Session, SessionTable, generate_session_id};

use crate::error::CliResult;
use crate::{info, success};

/// Create a session for `id`, wait, fetch it, then refresh it.
///
/// Returns the refreshed session.
pub async fn run<S: ItemStore>(
    table: &SessionTable<S>,
    id: &str,
    wait: Duration,
) -> CliResult<Session> {
    let session = Session::new(id, generate_session_id());
    table.create(&session).await?;
    success(&format!("Created session {} (expires {})", session.session_id, session.expire));

    if !wait.is_zero() {
        info(&format!("Waiting {}s", wait.as_secs()));
        tokio::time::sleep(wait).await;
    }

    let found = table.fetch_active(id, &session.session_id).await?;
    info(&format!("Fetched session created at {}", found.created_at));

    let refreshed = table
        .refresh_expiration(id, &session.session_id, Local::now())
        .await?;
    success(&format!("Refreshed session, now expires {}", refreshed.expire));
    tracing::info!(id, session_id = %refreshed.session_id, expire = %refreshed.expire, "Demo finished");

    Ok(refreshed)
}
