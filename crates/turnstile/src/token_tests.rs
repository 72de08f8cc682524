// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::meta::{MetaStore, TokenRecord};

async fn registry() -> anyhow::Result<(TokenRegistry, MetaStore)> {
    let meta = MetaStore::in_memory().await?;
    Ok((TokenRegistry::new(meta.clone()), meta))
}

#[test]
fn secrets_are_hex_and_unique() {
    let a = generate_secret();
    let b = generate_secret();
    assert_eq!(a.len(), 64);
    assert!(a.bytes().all(|c| c.is_ascii_hexdigit()));
    assert_ne!(a, b);
}

#[tokio::test]
async fn generate_defaults_to_fifteen_days() -> anyhow::Result<()> {
    let (registry, _meta) = registry().await?;
    let token = registry.generate(Some("ops".into()), None, false).await?;

    let expires = token.expires_at_ms.ok_or_else(|| anyhow::anyhow!("no expiry"))?;
    let lifetime = expires - token.created_at_ms;
    assert_eq!(lifetime, 15 * DAY_MS);
    Ok(())
}

#[tokio::test]
async fn never_expires_wins_over_days() -> anyhow::Result<()> {
    let (registry, _meta) = registry().await?;
    let token = registry.generate(None, Some(30), true).await?;
    assert!(token.expires_at_ms.is_none());
    Ok(())
}

#[tokio::test]
async fn validate_accepts_live_secret_and_stamps_use() -> anyhow::Result<()> {
    let (registry, _meta) = registry().await?;
    let token = registry.generate(None, Some(1), false).await?;

    assert!(registry.validate(&token.secret).await?);
    assert!(!registry.validate("deadbeef").await?);

    let listed = registry.list().await?;
    assert_eq!(listed.len(), 1);
    assert!(listed[0].last_used_at_ms.is_some());
    Ok(())
}

#[tokio::test]
async fn revoked_secret_is_rejected() -> anyhow::Result<()> {
    let (registry, _meta) = registry().await?;
    let token = registry.generate(None, None, false).await?;

    assert!(registry.revoke(&token.id).await?);
    assert!(!registry.validate(&token.secret).await?);
    assert!(!registry.revoke("missing").await?);
    Ok(())
}

#[tokio::test]
async fn lapsed_secret_is_deactivated_on_validate() -> anyhow::Result<()> {
    let (registry, meta) = registry().await?;
    let record = TokenRecord {
        id: "t-old".into(),
        secret: "feedface".into(),
        name: None,
        created_at_ms: 0,
        expires_at_ms: Some(1),
        is_active: true,
        last_used_at_ms: None,
    };
    meta.insert_token(&record).await?;

    assert!(!registry.validate("feedface").await?);

    // The lapse was persisted, not just reported.
    let listed = registry.list().await?;
    assert!(!listed[0].is_active);
    Ok(())
}

#[tokio::test]
async fn delete_removes_record() -> anyhow::Result<()> {
    let (registry, _meta) = registry().await?;
    let token = registry.generate(None, None, false).await?;

    assert!(registry.delete(&token.id).await?);
    assert!(registry.list().await?.is_empty());
    assert!(!registry.validate(&token.secret).await?);
    Ok(())
}
