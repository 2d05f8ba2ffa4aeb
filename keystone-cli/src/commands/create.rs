//! Create command.

use keystone_session::{ItemStore, Session, SessionTable, generate_session_id};

use crate::error::CliResult;

/// Create a session for `id`, generating a session ID when none is given.
pub async fn run<S: ItemStore>(
    table: &SessionTable<S>,
    id: &str,
    session_id: Option<String>,
) -> CliResult<Session> {
    let session = Session::new(id, session_id.unwrap_or_else(generate_session_id));
    table.create(&session).await?;
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures;

    #[tokio::test]
    async fn test_create_with_given_session_id() {
        let table = fixtures::table();
        let session = run(&table, "1234", Some("abcde".into())).await.unwrap();
        assert_eq!(session.session_id, "abcde");
        assert!(table.store().get("Session", "1234", "abcde").is_some());
    }

    #[tokio::test]
    async fn test_create_generates_session_id() {
        let table = fixtures::table();
        let session = run(&table, "1234", None).await.unwrap();
        assert!(!session.session_id.is_empty());
        assert_eq!(table.store().len("Session"), Some(1));
    }

    #[tokio::test]
    async fn test_create_rejects_empty_id() {
        let table = fixtures::table();
        assert!(run(&table, "", Some("abcde".into())).await.is_err());
    }
}
