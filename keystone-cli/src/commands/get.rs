//! Get command.

use keystone_session::{ItemStore, Session, SessionTable};

use crate::error::CliResult;

/// Fetch a session that is unexpired at `at`, or now when `at` is `None`.
pub async fn run<S: ItemStore>(
    table: &SessionTable<S>,
    id: &str,
    session_id: &str,
    at: Option<&str>,
) -> CliResult<Session> {
    let session = match at {
        Some(reference) => table.fetch_unexpired(id, session_id, reference).await?,
        None => table.fetch_active(id, session_id).await?,
    };
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures;
    use crate::error::CliError;

    #[tokio::test]
    async fn test_get_active() {
        let table = fixtures::table();
        let session = Session::new("1234", "abcde");
        table.create(&session).await.unwrap();

        assert_eq!(run(&table, "1234", "abcde", None).await.unwrap(), session);
    }

    #[tokio::test]
    async fn test_get_after_expiry_is_not_found() {
        let table = fixtures::table();
        let session = Session::new("1234", "abcde");
        table.create(&session).await.unwrap();

        let err = run(&table, "1234", "abcde", Some(session.expire.as_str()))
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::Session(e) if e.is_not_found()));
    }
}
