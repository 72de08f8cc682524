// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end queue scenarios exercised through the HTTP surface.

use std::time::Duration;

use turnstile_specs::TestQueue;

/// Direct entry into an empty event: the first joiner is admitted with no
/// wait and a batch window opens behind them.
#[tokio::test]
async fn direct_entry_into_empty_event() -> anyhow::Result<()> {
    let q = TestQueue::start(2, 30).await?;

    let alice = q.join("alice").await;
    assert_eq!(alice["state"], "active");
    assert_eq!(alice["position"], 0);
    assert_eq!(alice["activeUsers"], 1);
    assert_eq!(alice["waitingUsers"], 0);
    assert_eq!(alice["timeRemaining"], 0);

    let ttl = q.window_ttl().await?;
    assert!(ttl > 0 && ttl <= 30, "window ttl {ttl} out of range");
    Ok(())
}

/// Fill the batch, then queue behind it with a visible waiting timer.
#[tokio::test]
async fn fill_and_queue() -> anyhow::Result<()> {
    let q = TestQueue::start(2, 30).await?;

    q.join("alice").await;
    let bob = q.join("bob").await;
    assert_eq!(bob["state"], "active");
    assert_eq!(bob["activeUsers"], 2);

    let carol = q.join("carol").await;
    assert_eq!(carol["state"], "waiting");
    assert_eq!(carol["position"], 1);
    assert_eq!(carol["waitingUsers"], 1);
    assert_eq!(carol["showWaitingTimer"], true);
    assert_eq!(carol["waitingTimerDuration"], 30);
    Ok(())
}

/// Rotation on expiry, driven by the real scheduler: after the 2 s window
/// lapses the batch turns over and the head of the line is promoted.
#[tokio::test]
async fn rotation_on_expiry() -> anyhow::Result<()> {
    let q = TestQueue::start(2, 2).await?;

    q.join("alice").await;
    q.join("bob").await;
    q.join("carol").await;
    assert_eq!(q.active_users().await?, vec!["alice", "bob"]);

    q.run_scheduler();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if q.active_users().await? == vec!["carol"] {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "rotation never happened");
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    assert!(q.waiting_users().await?.is_empty());
    let ttl = q.window_ttl().await?;
    assert!(ttl > 0 && ttl <= 2, "fresh window expected, ttl {ttl}");

    // Evicted users are out entirely; a re-join treats them as newcomers —
    // here straight into the spare slot beside carol.
    let alice = q.join("alice").await;
    assert_eq!(alice["state"], "active");
    assert_eq!(alice["position"], 0);
    Ok(())
}

/// Partial top-up during an open window: spare slots drain the line head
/// without rotating the batch, preserving FIFO order.
#[tokio::test]
async fn partial_topup_during_open_window() -> anyhow::Result<()> {
    let q = TestQueue::start(3, 30).await?;

    let alice = q.join("alice").await;
    assert_eq!(alice["state"], "active");

    // Enqueue B and C behind the open window via the admin surface.
    q.admin_enqueue("bob").await;
    q.admin_enqueue("carol").await;
    assert_eq!(q.waiting_users().await?, vec!["bob", "carol"]);

    // A status probe runs the opportunistic advance, same as a scheduler tick.
    let bob = q.status("bob").await;
    assert_eq!(bob["state"], "active");

    assert_eq!(q.active_users().await?, vec!["alice", "bob", "carol"]);
    assert!(q.waiting_users().await?.is_empty());
    Ok(())
}

/// Enqueueing the same user twice changes nothing.
#[tokio::test]
async fn enqueue_is_idempotent() -> anyhow::Result<()> {
    let q = TestQueue::start(1, 30).await?;

    q.join("alice").await;
    let first = q.admin_enqueue("dave").await;
    let second = q.admin_enqueue("dave").await;

    assert_eq!(first["position"], 1);
    assert_eq!(second["position"], 1);
    assert_eq!(q.waiting_users().await?, vec!["dave"]);
    Ok(())
}

/// Stop clears the batch and window but preserves the waiting line; a
/// subsequent start backfills from its head.
#[tokio::test]
async fn stop_preserves_waiting() -> anyhow::Result<()> {
    let q = TestQueue::start(2, 30).await?;

    q.join("alice").await;
    q.join("bob").await;
    q.join("carol").await;
    q.join("dave").await;
    assert_eq!(q.active_users().await?, vec!["alice", "bob"]);
    assert_eq!(q.waiting_users().await?, vec!["carol", "dave"]);

    let stopped = q.admin_post("/admin/event/stop").await;
    assert_eq!(stopped["success"], true);

    assert!(q.active_users().await?.is_empty());
    assert_eq!(q.window_ttl().await?, -2);
    assert_eq!(q.waiting_users().await?, vec!["carol", "dave"]);

    let started = q.admin_post("/admin/event/start").await;
    assert_eq!(started["success"], true);

    assert_eq!(q.active_users().await?, vec!["carol"]);
    assert_eq!(q.waiting_users().await?, vec!["dave"]);
    let ttl = q.window_ttl().await?;
    assert!(ttl > 0 && ttl <= 30);

    let stored = q
        .state
        .meta
        .event_by_id(&q.event_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("event missing"))?;
    assert!(stored.is_active);
    Ok(())
}

/// A fully drained event reads identically to a never-used one.
#[tokio::test]
async fn drained_event_equals_fresh_event() -> anyhow::Result<()> {
    let q = TestQueue::start(1, 30).await?;

    q.join("alice").await;
    q.expire_window().await;

    // The status probe's opportunistic advance performs the turnover.
    let after = q.status("alice").await;
    assert_eq!(after["state"], "waiting");
    assert_eq!(after["activeUsers"], 0);
    assert_eq!(after["waitingUsers"], 0);
    assert_eq!(after["timeRemaining"], 0);

    assert!(q.active_users().await?.is_empty());
    assert!(q.waiting_users().await?.is_empty());
    assert_eq!(q.window_ttl().await?, -2);

    // And the next joiner is admitted exactly like the first ever was.
    let bob = q.join("bob").await;
    assert_eq!(bob["state"], "active");
    assert_eq!(bob["timeRemaining"], 0);
    Ok(())
}
