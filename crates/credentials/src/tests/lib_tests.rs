use super::*;

async fn memory_store() -> CredentialStore {
    CredentialStore::new("sqlite::memory:")
        .await
        .expect("in-memory store")
}

#[tokio::test]
async fn set_then_get_round_trips() {
    let store = memory_store().await;
    store.set(USER_EMAIL, "ada@example.com").await.expect("set");

    let value = store.get(USER_EMAIL).await.expect("get");
    assert_eq!(value.as_deref(), Some("ada@example.com"));
}

#[tokio::test]
async fn missing_entry_reads_as_none() {
    let store = memory_store().await;
    assert!(store.get(AUTH_TOKEN).await.expect("get").is_none());
}

#[tokio::test]
async fn last_write_wins_on_same_name() {
    let store = memory_store().await;
    store.set(AUTH_TOKEN, "first-token").await.expect("set");
    store.set(AUTH_TOKEN, "second-token").await.expect("set");

    let value = store.get(AUTH_TOKEN).await.expect("get");
    assert_eq!(value.as_deref(), Some("second-token"));
}

#[tokio::test]
async fn entries_are_written_secure_with_future_expiry() {
    let store = memory_store().await;
    store.set(USER_FIRST_NAME, "Ada").await.expect("set");

    let stored = store
        .inspect(USER_FIRST_NAME)
        .await
        .expect("inspect")
        .expect("present");
    assert!(stored.secure);
    assert!(stored.expires_at > Utc::now() + Duration::days(6));
    assert!(stored.expires_at <= Utc::now() + Duration::days(ENTRY_TTL_DAYS));
}

#[tokio::test]
async fn expired_entry_reads_as_none_and_is_purged() {
    let store = memory_store().await;
    store
        .set_with_expiry(AUTH_TOKEN, "stale", Utc::now() - Duration::minutes(1))
        .await
        .expect("set");

    assert!(store.get(AUTH_TOKEN).await.expect("get").is_none());
    // The read path removed the row entirely.
    assert!(store.inspect(AUTH_TOKEN).await.expect("inspect").is_none());
}

#[tokio::test]
async fn remove_deletes_entry() {
    let store = memory_store().await;
    store.set(USER_LAST_NAME, "Lovelace").await.expect("set");
    store.remove(USER_LAST_NAME).await.expect("remove");

    assert!(store.get(USER_LAST_NAME).await.expect("get").is_none());
}

#[tokio::test]
async fn purge_expired_only_touches_stale_rows() {
    let store = memory_store().await;
    store.set(USER_EMAIL, "ada@example.com").await.expect("set");
    store
        .set_with_expiry(AUTH_TOKEN, "stale", Utc::now() - Duration::days(1))
        .await
        .expect("set");

    let purged = store.purge_expired().await.expect("purge");
    assert_eq!(purged, 1);
    assert!(store.get(USER_EMAIL).await.expect("get").is_some());
}

#[tokio::test]
async fn health_check_succeeds_on_fresh_store() {
    let store = memory_store().await;
    store.health_check().await.expect("healthy");
}
