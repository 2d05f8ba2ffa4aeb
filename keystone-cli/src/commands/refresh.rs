//! Refresh command.

use chrono::Local;
use keystone_session::{ItemStore, Session, SessionTable};

use crate::error::CliResult;

/// Extend an existing session to one hour from now.
pub async fn run<S: ItemStore>(
    table: &SessionTable<S>,
    id: &str,
    session_id: &str,
) -> CliResult<Session> {
    Ok(table.refresh_expiration(id, session_id, Local::now()).await?)
}
