// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::error::QueueError;

#[tokio::test]
async fn domain_name_is_unique() -> anyhow::Result<()> {
    let meta = MetaStore::in_memory().await?;
    meta.create_domain("shop").await?;

    let err = meta.create_domain("shop").await.err();
    assert_eq!(err, Some(QueueError::Conflict));
    Ok(())
}

#[tokio::test]
async fn event_unique_per_domain() -> anyhow::Result<()> {
    let meta = MetaStore::in_memory().await?;
    meta.create_domain("shop").await?;
    meta.create_domain("gigs").await?;

    meta.create_event("drop", "shop", 10, 60).await?;
    // Same name under another domain is fine.
    meta.create_event("drop", "gigs", 10, 60).await?;

    let err = meta.create_event("drop", "shop", 5, 30).await.err();
    assert_eq!(err, Some(QueueError::Conflict));
    Ok(())
}

#[tokio::test]
async fn event_round_trip_and_update_stamps() -> anyhow::Result<()> {
    let meta = MetaStore::in_memory().await?;
    meta.create_domain("shop").await?;
    let created = meta.create_event("drop", "shop", 10, 60).await?;

    let fetched = meta.event_by_id(&created.id).await?.ok_or_else(|| anyhow::anyhow!("missing"))?;
    assert_eq!(fetched.queue_limit, 10);
    assert_eq!(fetched.interval_sec, 60);
    assert!(!fetched.is_active);

    let updated = meta
        .update_event(&created.id, None, Some(25), None)
        .await?
        .ok_or_else(|| anyhow::anyhow!("missing"))?;
    assert_eq!(updated.queue_limit, 25);
    assert_eq!(updated.interval_sec, 60);
    assert!(updated.updated_at_ms >= created.updated_at_ms);

    assert!(meta.update_event("nope", None, Some(1), None).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn active_events_reflect_start_stop() -> anyhow::Result<()> {
    let meta = MetaStore::in_memory().await?;
    meta.create_domain("shop").await?;
    let a = meta.create_event("a", "shop", 10, 60).await?;
    let b = meta.create_event("b", "shop", 10, 60).await?;

    assert!(meta.active_events().await?.is_empty());

    meta.set_event_active(&a.id, true).await?;
    meta.set_event_active(&b.id, true).await?;
    assert_eq!(meta.active_events().await?.len(), 2);

    meta.set_event_active(&b.id, false).await?;
    let active = meta.active_events().await?;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, a.id);
    Ok(())
}

#[tokio::test]
async fn entries_read_newest_first_and_capped() -> anyhow::Result<()> {
    let meta = MetaStore::in_memory().await?;
    meta.create_domain("shop").await?;
    let event = meta.create_event("drop", "shop", 10, 60).await?;

    for i in 0..(ENTRIES_CAP + 20) {
        meta.insert_entry(&event.id, &format!("user-{i}")).await?;
    }

    let entries = meta.recent_entries(&event.id).await?;
    assert_eq!(entries.len(), ENTRIES_CAP as usize);
    // Newest first: the last insert comes back at the head.
    assert_eq!(entries[0].user_id, format!("user-{}", ENTRIES_CAP + 19));
    Ok(())
}

#[tokio::test]
async fn token_lookup_only_sees_active_rows() -> anyhow::Result<()> {
    let meta = MetaStore::in_memory().await?;
    let token = TokenRecord {
        id: "t1".into(),
        secret: "s3cret".into(),
        name: Some("ops".into()),
        created_at_ms: 1,
        expires_at_ms: None,
        is_active: true,
        last_used_at_ms: None,
    };
    meta.insert_token(&token).await?;

    assert!(meta.token_by_secret("s3cret").await?.is_some());
    assert!(meta.token_by_secret("wrong").await?.is_none());

    meta.set_token_active("t1", false).await?;
    assert!(meta.token_by_secret("s3cret").await?.is_none());

    // Still listed, just inactive.
    let listed = meta.list_tokens().await?;
    assert_eq!(listed.len(), 1);
    assert!(!listed[0].is_active);
    Ok(())
}

#[tokio::test]
async fn file_backed_store_persists_schema() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let url = format!("sqlite:{}?mode=rwc", dir.path().join("meta.db").display());

    let meta = MetaStore::connect(&url).await?;
    meta.create_domain("shop").await?;
    drop(meta);

    let reopened = MetaStore::connect(&url).await?;
    let domains = reopened.list_domains().await?;
    assert_eq!(domains.len(), 1);
    assert_eq!(domains[0].name, "shop");
    Ok(())
}
