//! Gateway integration tests
//!
//! A full `Client` runs against the scripted gateway and REST transports.
//! Run with: cargo test -p integration-tests --test gateway_tests

use std::sync::Arc;
use std::time::Duration;

use integration_tests::{eventually, fixtures::*, test_config, GatewayPeer, TestClient, WAIT};
use serde_json::json;
use shardline_core::Snowflake;
use shardline_gateway::protocol::{GatewayMessage, OpCode};
use shardline_gateway::{Command, Event, EventType, OutboundFrame, ShardState};
use tokio::sync::mpsc;
use tokio::time::timeout;

/// Forward every event of `kind` into a channel
fn collect(client: &shardline_gateway::Client, kind: EventType) -> mpsc::UnboundedReceiver<Arc<Event>> {
    let (tx, rx) = mpsc::unbounded_channel();
    client.on(kind, move |_, event| {
        let tx = tx.clone();
        async move {
            let _ = tx.send(event);
            Ok(())
        }
    });
    rx
}

async fn recv(rx: &mut mpsc::UnboundedReceiver<Arc<Event>>) -> Arc<Event> {
    timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("listener dropped")
}

/// HELLO, IDENTIFY, READY
async fn handshake(peer: &mut GatewayPeer, session_id: &str) {
    peer.push(&GatewayMessage::hello(45_000)).await;
    let identify = peer.next_message().await;
    assert_eq!(identify.op, OpCode::Identify);
    peer.push(&ready(session_id, 1, &[])).await;
}

// ============================================================================
// Connection
// ============================================================================

#[tokio::test]
async fn test_handshake_identifies_and_reports_ready() {
    let mut harness = TestClient::start(test_config(), |_| {});
    let mut ready_events = collect(&harness.client, EventType::Ready);

    let mut peer = harness.next_peer().await;
    assert_eq!(peer.url, "wss://gateway.test/?v=10&encoding=json");

    peer.push(&GatewayMessage::hello(45_000)).await;
    let identify = peer.next_message().await.as_identify().expect("identify payload");
    assert_eq!(identify.token, integration_tests::TEST_TOKEN);
    assert_eq!(identify.shard, [0, 1]);

    peer.push(&ready("session-a", 1, &[100])).await;
    match &*recv(&mut ready_events).await {
        Event::Ready { session_id, user, guilds } => {
            assert_eq!(session_id, "session-a");
            assert_eq!(user.id, Snowflake::new(BOT_ID));
            assert_eq!(guilds, &vec![Snowflake::new(100)]);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    let shard = harness.client.shards()[0].clone();
    assert_eq!(shard.state(), ShardState::Ready);
    assert_eq!(shard.session_id().as_deref(), Some("session-a"));
    assert!(harness.client.cache().cached_current_user().is_some());
    assert!(harness.http.requested()[0].ends_with("/gateway/bot"));

    harness.stop().await.unwrap();
    assert_eq!(shard.state(), ShardState::Disconnected);
}

#[tokio::test]
async fn test_reconnect_request_resumes_session() {
    let mut harness = TestClient::start(test_config(), |_| {});
    let mut reconnected = collect(&harness.client, EventType::Reconnected);
    let mut resumed = collect(&harness.client, EventType::Resumed);

    let mut peer = harness.next_peer().await;
    handshake(&mut peer, "session-b").await;
    peer.push(&guild_create(7, 100, "alpha", vec![])).await;

    let shard = harness.client.shards()[0].clone();
    eventually(|| shard.last_sequence() == Some(7)).await;

    peer.push(&GatewayMessage::reconnect()).await;
    assert_eq!(peer.next_frame().await, OutboundFrame::Close(4000));

    let mut next = harness.next_peer().await;
    next.push(&GatewayMessage::hello(45_000)).await;
    let resume = next.next_message().await.as_resume().expect("resume payload");
    assert_eq!(resume.session_id, "session-b");
    assert_eq!(resume.seq, Some(7));
    recv(&mut reconnected).await;

    next.push(&GatewayMessage::dispatch("RESUMED", 8, json!({}))).await;
    assert!(matches!(&*recv(&mut resumed).await, Event::Resumed));
    assert_eq!(shard.reconnect_count(), 1);
    assert_eq!(shard.state(), ShardState::Ready);

    harness.stop().await.unwrap();
}

#[tokio::test]
async fn test_remote_close_reconnects_and_reports_disconnect() {
    let mut harness = TestClient::start(test_config(), |_| {});
    let mut disconnected = collect(&harness.client, EventType::Disconnected);

    let mut peer = harness.next_peer().await;
    handshake(&mut peer, "session-c").await;
    let shard = harness.client.shards()[0].clone();
    eventually(|| shard.state() == ShardState::Ready).await;

    peer.close(4009, "Session timed out").await;
    match &*recv(&mut disconnected).await {
        Event::Disconnected { code, .. } => assert_eq!(*code, 4009),
        other => panic!("unexpected event: {other:?}"),
    }

    // The session timed out, so the new connection identifies again
    let mut next = harness.next_peer().await;
    next.push(&GatewayMessage::hello(45_000)).await;
    assert_eq!(next.next_message().await.op, OpCode::Identify);

    harness.stop().await.unwrap();
}

#[tokio::test]
async fn test_stop_wakes_long_heartbeat_sleep() {
    let mut harness = TestClient::start(test_config(), |_| {});
    let mut peer = harness.next_peer().await;
    handshake(&mut peer, "session-d").await;
    let shard = harness.client.shards()[0].clone();
    eventually(|| shard.state() == ShardState::Ready).await;

    let started = tokio::time::Instant::now();
    harness.stop().await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(shard.is_stopped());
}

#[tokio::test]
async fn test_presence_fans_out_to_every_shard() {
    let mut harness = TestClient::start(test_config().with_shard_count(2), |_| {});

    let mut peers = Vec::new();
    for _ in 0..2 {
        let mut peer = harness.next_peer().await;
        handshake(&mut peer, "session-e").await;
        peers.push(peer);
    }
    let client = Arc::clone(&harness.client);
    eventually(|| client.shards().iter().all(|s| s.state() == ShardState::Ready)).await;

    harness.client.update_presence("idle", None).await.unwrap();
    for peer in &mut peers {
        let update = peer.next_message().await;
        assert_eq!(update.op, OpCode::PresenceUpdate);
        assert_eq!(update.d["status"], "idle");
    }
    assert!(harness.client.update_presence("sleeping", None).await.is_err());

    harness.stop().await.unwrap();
}

// ============================================================================
// Dispatch into the cache
// ============================================================================

#[tokio::test]
async fn test_member_remove_updates_cache_and_notifies_once() {
    let mut harness = TestClient::start(test_config(), |_| {});
    let mut removals = collect(&harness.client, EventType::GuildMemberRemove);

    let mut peer = harness.next_peer().await;
    handshake(&mut peer, "session-f").await;
    peer.push(&guild_create(2, 100, "alpha", vec![member(7, "solo"), member(8, "shared")])).await;
    peer.push(&guild_create(3, 200, "beta", vec![member(8, "shared")])).await;

    let cache = Arc::clone(harness.client.cache());
    eventually(|| cache.guild_count() == 2).await;
    assert!(cache.global_member(Snowflake::new(7)).is_some());

    // Only mutual guild: gone from the global collection too
    peer.push(&member_remove(4, 100, 7, "solo")).await;
    match &*recv(&mut removals).await {
        Event::GuildMemberRemove { guild_id, user, member } => {
            assert_eq!(*guild_id, Snowflake::new(100));
            assert_eq!(user.id, Snowflake::new(7));
            assert!(member.is_some());
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(cache.cached_member(Snowflake::new(100), Snowflake::new(7)).is_none());
    assert!(cache.global_member(Snowflake::new(7)).is_none());

    // Still in guild 200: stays global
    peer.push(&member_remove(5, 100, 8, "shared")).await;
    recv(&mut removals).await;
    assert!(cache.cached_member(Snowflake::new(100), Snowflake::new(8)).is_none());
    assert!(cache.global_member(Snowflake::new(8)).is_some());

    harness.client.queue().wait_idle().await;
    assert!(removals.try_recv().is_err());
    assert_eq!(
        cache.cached_guild(Snowflake::new(100)).and_then(|g| g.member_count),
        Some(0)
    );

    harness.stop().await.unwrap();
}

#[tokio::test]
async fn test_reaction_on_uncached_message_fetches_it() {
    let mut harness = TestClient::start(test_config(), |_| {});
    harness.http.respond(
        "/channels/10/messages/55",
        200,
        json!({
            "id": "55",
            "channel_id": "10",
            "author": user(9, "poster"),
            "content": "react to me",
            "reactions": [{"count": 1, "me": false, "emoji": {"id": null, "name": "👍"}}]
        }),
    );
    let mut reactions = collect(&harness.client, EventType::MessageReactionAdd);

    let mut peer = harness.next_peer().await;
    handshake(&mut peer, "session-g").await;
    peer.push(&reaction_add(2, 55, 10, 7, "👍")).await;

    match &*recv(&mut reactions).await {
        Event::MessageReactionAdd { message_id, message, .. } => {
            assert_eq!(*message_id, Snowflake::new(55));
            let message = message.as_ref().expect("fetched message");
            assert_eq!(message.reactions.len(), 1);
            assert_eq!(message.reactions[0].count, 1);
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(harness.client.cache().cached_message(Snowflake::new(55)).is_some());

    harness.stop().await.unwrap();
}

#[tokio::test]
async fn test_unknown_dispatch_is_ignored() {
    let mut harness = TestClient::start(test_config(), |_| {});
    let mut peer = harness.next_peer().await;
    handshake(&mut peer, "session-h").await;

    peer.push(&GatewayMessage::dispatch("ENTITLEMENT_CREATE", 2, json!({"id": "1"}))).await;
    peer.push(&guild_create(3, 100, "alpha", vec![])).await;

    let cache = Arc::clone(harness.client.cache());
    eventually(|| cache.guild_count() == 1).await;
    let shard = harness.client.shards()[0].clone();
    assert_eq!(shard.last_sequence(), Some(3));
    assert_eq!(shard.state(), ShardState::Ready);

    harness.stop().await.unwrap();
}

// ============================================================================
// Commands
// ============================================================================

#[tokio::test]
async fn test_prefix_command_replies() {
    let mut harness = TestClient::start(test_config(), |client| {
        client.register_command(
            Command::builder("ping")
                .description("Replies with pong")
                .build(|invocation| async move {
                    invocation.reply("pong").await?;
                    Ok::<(), anyhow::Error>(())
                }),
        );
    });
    harness.http.respond(
        "/channels/10/messages",
        200,
        json!({"id": "900", "channel_id": "10", "author": user(BOT_ID, "shardline"), "content": "pong"}),
    );

    let mut peer = harness.next_peer().await;
    handshake(&mut peer, "session-i").await;
    peer.push(&message_create(2, 500, 10, user(7, "someone"), "!ping")).await;

    let http = Arc::clone(&harness.http);
    eventually(|| http.requested().iter().any(|url| url.ends_with("/channels/10/messages"))).await;
    let reply = harness
        .http
        .requests()
        .into_iter()
        .find(|r| r.url.ends_with("/channels/10/messages"))
        .expect("reply request");
    assert_eq!(reply.body.expect("reply body")["content"], "pong");

    harness.stop().await.unwrap();
}

#[tokio::test]
async fn test_commands_ignore_bots_and_unknown_names() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut harness = TestClient::start(test_config(), move |client| {
        client.register_command(Command::builder("echo").build(move |invocation| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(invocation.rest());
                Ok(())
            }
        }));
    });

    let mut peer = harness.next_peer().await;
    handshake(&mut peer, "session-j").await;

    let bot = json!({"id": "8", "username": "other-bot", "bot": true});
    peer.push(&message_create(2, 501, 10, bot, "!echo from a bot")).await;
    peer.push(&message_create(3, 502, 10, user(7, "someone"), "!unknown thing")).await;
    peer.push(&message_create(4, 503, 10, user(7, "someone"), "!echo hello  there")).await;

    let echoed = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(echoed, "hello there");
    harness.client.queue().wait_idle().await;
    assert!(rx.try_recv().is_err());
    assert_eq!(harness.client.cache().message_count(), 3);

    harness.stop().await.unwrap();
}
