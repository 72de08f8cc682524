// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn list_push_pop_preserves_order() -> anyhow::Result<()> {
    let store = MemoryQueueStore::new();
    store.push_back("q:e1:waiting", "a").await?;
    store.push_back("q:e1:waiting", "b").await?;
    store.push_back("q:e1:waiting", "c").await?;

    assert_eq!(store.list_len("q:e1:waiting").await?, 3);
    assert_eq!(store.list_range("q:e1:waiting").await?, vec!["a", "b", "c"]);
    assert_eq!(store.pop_front("q:e1:waiting").await?, Some("a".to_owned()));
    assert_eq!(store.pop_front("q:e1:waiting").await?, Some("b".to_owned()));
    assert_eq!(store.list_len("q:e1:waiting").await?, 1);
    Ok(())
}

#[tokio::test]
async fn pop_from_missing_list_is_none() -> anyhow::Result<()> {
    let store = MemoryQueueStore::new();
    assert_eq!(store.pop_front("q:none:waiting").await?, None);
    assert_eq!(store.list_len("q:none:waiting").await?, 0);
    assert!(store.list_range("q:none:waiting").await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn set_add_reports_new_membership() -> anyhow::Result<()> {
    let store = MemoryQueueStore::new();
    assert!(store.set_add("q:e1:users", "alice").await?);
    assert!(!store.set_add("q:e1:users", "alice").await?);
    assert!(store.set_contains("q:e1:users", "alice").await?);

    store.set_remove("q:e1:users", "alice").await?;
    assert!(!store.set_contains("q:e1:users", "alice").await?);
    Ok(())
}

#[tokio::test]
async fn ttl_follows_redis_semantics() -> anyhow::Result<()> {
    let store = MemoryQueueStore::new();
    assert_eq!(store.ttl("q:e1:timer").await?, -2);

    store.set_with_ttl("q:e1:timer", "1", 30).await?;
    let ttl = store.ttl("q:e1:timer").await?;
    assert!(ttl > 0 && ttl <= 30, "ttl {ttl} out of range");

    store.expire_now("q:e1:timer").await;
    assert_eq!(store.ttl("q:e1:timer").await?, -2);

    store.delete("q:e1:timer").await?;
    assert_eq!(store.ttl("q:e1:timer").await?, -2);
    Ok(())
}

#[tokio::test]
async fn delete_clears_any_key_type() -> anyhow::Result<()> {
    let store = MemoryQueueStore::new();
    store.push_back("q:e1:active", "a").await?;
    store.set_add("q:e1:users", "a").await?;

    store.delete("q:e1:active").await?;
    store.delete("q:e1:users").await?;

    assert_eq!(store.list_len("q:e1:active").await?, 0);
    assert!(!store.set_contains("q:e1:users", "a").await?);
    Ok(())
}
