//! Integration tests for keystone-session

use std::sync::Arc;

use chrono::{Local, NaiveDateTime, TimeDelta, TimeZone};
use keystone_session::attribute::from_item;
use keystone_session::memory::{KeySchema, MemoryStore};
use keystone_session::*;

fn fixture() -> Session {
    Session {
        id: "1234".to_string(),
        session_id: "abcde".to_string(),
        created_at: "2025-02-01 12:34:56".to_string(),
        expire: "2025-02-01 13:34:56".to_string(),
        ttl: 1738384496,
    }
}

async fn seeded_table() -> SessionTable<MemoryStore> {
    let store = MemoryStore::new().with_table("Session", KeySchema::new("id", "sessionId"));
    let table = SessionTable::with_store(store, "Session").unwrap();
    table.create(&fixture()).await.unwrap();
    table
}

#[tokio::test]
async fn test_create_rejects_empty_keys() {
    let store = MemoryStore::new().with_table("Session", KeySchema::new("id", "sessionId"));
    let table = SessionTable::with_store(store, "Session").unwrap();

    let mut session = fixture();
    session.id.clear();
    let err = table.create(&session).await.unwrap_err();
    assert_eq!(err.operation(), Some(Operation::PutItem));

    let mut session = fixture();
    session.session_id.clear();
    assert!(table.create(&session).await.is_err());

    assert_eq!(table.store().len("Session"), Some(0));
}

#[tokio::test]
async fn test_create_overwrites() {
    let table = seeded_table().await;

    let mut replacement = fixture();
    replacement.created_at = "2025-02-01 12:50:00".to_string();
    table.create(&replacement).await.unwrap();

    assert_eq!(table.store().len("Session"), Some(1));
    let found = table
        .fetch_unexpired("1234", "abcde", "2025-02-01 12:55:00")
        .await
        .unwrap();
    assert_eq!(found.created_at, "2025-02-01 12:50:00");
}

#[tokio::test]
async fn test_fetch_before_expiry() {
    let table = seeded_table().await;
    let found = table
        .fetch_unexpired("1234", "abcde", "2025-02-01 12:40:00")
        .await
        .unwrap();
    assert_eq!(found, fixture());
}

#[tokio::test]
async fn test_fetch_misses_are_not_found() {
    let table = seeded_table().await;

    let cases = [
        ("123", "abcde", "2025-02-01 12:40:00"),
        ("1234", "abcd", "2025-02-01 12:40:00"),
        ("1234", "abcde", "2025-02-01 13:40:00"),
        // expire must be strictly after the reference
        ("1234", "abcde", "2025-02-01 13:34:56"),
    ];
    for (id, session_id, reference) in cases {
        let err = table
            .fetch_unexpired(id, session_id, reference)
            .await
            .unwrap_err();
        assert!(err.is_not_found(), "{id}/{session_id}@{reference}: {err}");
    }
}

#[tokio::test]
async fn test_refresh_slides_expiration() {
    let table = seeded_table().await;
    let now = Local.with_ymd_and_hms(2025, 2, 1, 13, 0, 0).unwrap();
    let expected = now + TimeDelta::hours(1);

    let refreshed = table.refresh_expiration("1234", "abcde", now).await.unwrap();
    assert_eq!(
        refreshed,
        Session {
            expire: "2025-02-01 14:00:00".to_string(),
            ttl: expected.timestamp(),
            ..fixture()
        }
    );

    // the new window is visible to reads
    let found = table
        .fetch_unexpired("1234", "abcde", "2025-02-01 13:40:00")
        .await
        .unwrap();
    assert_eq!(found, refreshed);
}

#[tokio::test]
async fn test_refresh_missing_keys_fail() {
    let table = seeded_table().await;
    let now = Local.with_ymd_and_hms(2025, 2, 1, 13, 0, 0).unwrap();

    for (id, session_id) in [("123", "abcde"), ("1234", "abcd")] {
        let err = table
            .refresh_expiration(id, session_id, now)
            .await
            .unwrap_err();
        assert!(err.is_condition_failed(), "{id}/{session_id}: {err}");
    }

    // no item was created
    assert_eq!(table.store().len("Session"), Some(1));
}

#[tokio::test]
async fn test_refresh_is_monotonic() {
    let table = seeded_table().await;
    let first = Local.with_ymd_and_hms(2025, 2, 1, 13, 0, 0).unwrap();
    let second = first + TimeDelta::minutes(10);

    let a = table.refresh_expiration("1234", "abcde", first).await.unwrap();
    let b = table.refresh_expiration("1234", "abcde", second).await.unwrap();

    assert!(b.expire > a.expire);
    assert!(b.ttl > a.ttl);
    assert_eq!(b.ttl - a.ttl, 600);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_refreshes_leave_a_consistent_record() {
    let store = Arc::new(MemoryStore::new().with_table("Session", KeySchema::new("id", "sessionId")));
    let table = SessionTable::with_store(Arc::clone(&store), "Session").unwrap();
    table.create(&fixture()).await.unwrap();

    let base = Local.with_ymd_and_hms(2025, 2, 1, 13, 0, 0).unwrap();
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let table = table.clone();
            let reference = base + TimeDelta::minutes(i);
            tokio::spawn(async move { table.refresh_expiration("1234", "abcde", reference).await })
        })
        .collect();

    let mut returned = Vec::new();
    for handle in handles {
        returned.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(store.len("Session"), Some(1));
    let item = store.get("Session", "1234", "abcde").unwrap();
    let stored: Session = from_item(item).unwrap();

    assert!(returned.contains(&stored), "{stored:?} not among {returned:?}");
    assert_eq!(stored.created_at, fixture().created_at);

    let expire = NaiveDateTime::parse_from_str(&stored.expire, TIMESTAMP_FORMAT).unwrap();
    let expire = Local.from_local_datetime(&expire).unwrap();
    assert_eq!(stored.ttl, expire.timestamp());
}

#[tokio::test]
async fn test_refresh_extends_unevicted_expired_session() {
    let table = seeded_table().await;
    let late = Local.with_ymd_and_hms(2025, 2, 1, 15, 0, 0).unwrap();

    let refreshed = table.refresh_expiration("1234", "abcde", late).await.unwrap();
    assert_eq!(refreshed.expire, "2025-02-01 16:00:00");
}

#[tokio::test]
async fn test_evicted_session_cannot_be_refreshed() {
    let table = seeded_table().await;
    table.store().evict("Session", "1234", "abcde").unwrap();

    let err = table
        .refresh_expiration("1234", "abcde", Local::now())
        .await
        .unwrap_err();
    assert!(err.is_condition_failed());
}

#[tokio::test]
async fn test_new_session_lifecycle() {
    let store = MemoryStore::new().with_table("Session", KeySchema::new("id", "sessionId"));
    let table = SessionTable::with_store(store, "Session").unwrap();

    let session = Session::new("1234", generate_session_id());
    table.create(&session).await.unwrap();

    let found = table.fetch_active(&session.id, &session.session_id).await.unwrap();
    assert_eq!(found, session);
    assert!(found.is_active_at(&now_timestamp()));

    let refreshed = table
        .refresh_expiration(&session.id, &session.session_id, Local::now())
        .await
        .unwrap();
    assert_eq!(refreshed.created_at, session.created_at);
    assert!(refreshed.expire >= session.expire);
}
