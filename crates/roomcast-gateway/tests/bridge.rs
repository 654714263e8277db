#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use roomcast_core::protocol::{Envelope, MsgKind};
use roomcast_gateway::backbone::bridge::fanout_shard;
use roomcast_gateway::backbone::{Backbone, BackboneBridge};
use roomcast_gateway::obs::GatewayMetrics;
use roomcast_gateway::realtime::{Connection, RoomRegistry};

use common::{recv_env, MemoryBackbone};

struct Fixture {
    bridge: Arc<BackboneBridge>,
    registry: Arc<RoomRegistry>,
    metrics: Arc<GatewayMetrics>,
}

fn fixture(backbone: Option<Arc<MemoryBackbone>>) -> Fixture {
    fixture_with_timeout(backbone, Duration::from_millis(100))
}

fn fixture_with_timeout(backbone: Option<Arc<MemoryBackbone>>, fanout_timeout: Duration) -> Fixture {
    let registry = Arc::new(RoomRegistry::new());
    let metrics = Arc::new(GatewayMetrics::default());
    let bridge = Arc::new(BackboneBridge::new(
        backbone.map(|b| b as Arc<dyn Backbone>),
        Arc::clone(&registry),
        fanout_timeout,
        Arc::clone(&metrics),
    ));
    Fixture {
        bridge,
        registry,
        metrics,
    }
}

fn action(json: &str) -> Envelope {
    let mut env = Envelope::from_json(json).unwrap();
    env.normalize();
    env
}

#[tokio::test]
async fn publish_without_backbone_is_a_noop() {
    let f = fixture(None);
    assert!(!f.bridge.is_enabled());
    f.bridge
        .publish_action(&action(r#"{"type":"action","room":"lobby"}"#))
        .await;
    assert!(f.bridge.start_fanout(CancellationToken::new()).await.is_none());
}

#[tokio::test]
async fn action_is_published_on_room_subject() {
    let backbone = MemoryBackbone::new();
    let f = fixture(Some(Arc::clone(&backbone)));

    f.bridge
        .publish_action(&action(r#"{"type":"action","room":"lobby","id":"a1","payload":{"move":"e4"}}"#))
        .await;

    let published = backbone.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].0, "room.lobby.action");
    let env = Envelope::from_slice(&published[0].1).unwrap();
    assert_eq!(env.id, "a1");
    assert_eq!(env.kind(), MsgKind::Action);
    assert_eq!(env.payload.unwrap().get(), r#"{"move":"e4"}"#);
}

#[tokio::test]
async fn action_without_room_is_skipped() {
    let backbone = MemoryBackbone::new();
    let f = fixture(Some(Arc::clone(&backbone)));

    f.bridge.publish_action(&action(r#"{"type":"action"}"#)).await;

    assert!(backbone.published().is_empty());
    assert_eq!(f.metrics.backbone_publish.get(&[("result", "skipped")]), 1);
}

#[tokio::test]
async fn publish_failure_is_swallowed() {
    let f = fixture(Some(MemoryBackbone::failing()));
    f.bridge
        .publish_action(&action(r#"{"type":"action","room":"lobby"}"#))
        .await;
    assert_eq!(f.metrics.backbone_publish.get(&[("result", "error")]), 1);
}

#[tokio::test]
async fn update_reaches_room_members_only() {
    let f = fixture(None);
    let (a, mut a_rx) = Connection::new("a", 8, CancellationToken::new());
    let (b, mut b_rx) = Connection::new("b", 8, CancellationToken::new());
    let (c, mut c_rx) = Connection::new("c", 8, CancellationToken::new());
    f.registry.join(&a, "lobby");
    f.registry.join(&b, "lobby");
    f.registry.join(&c, "other");

    let delivered = f
        .bridge
        .deliver("room.lobby.update", br#"{"v":7,"type":"update","payload":{"n":1}}"#)
        .await;
    assert_eq!(delivered, 2);

    for rx in [&mut a_rx, &mut b_rx] {
        let env = recv_env(rx).await;
        assert_eq!(env.v, 1);
        assert_eq!(env.kind(), MsgKind::Update);
        assert!(env.ts.is_some());
        assert_eq!(env.id.len(), 16);
        assert_eq!(env.payload.unwrap().get(), r#"{"n":1}"#);
    }
    assert!(c_rx.try_recv().is_err());
}

#[tokio::test]
async fn producer_id_is_kept_on_restamp() {
    let f = fixture(None);
    let (a, mut a_rx) = Connection::new("a", 8, CancellationToken::new());
    f.registry.join(&a, "lobby");

    f.bridge
        .deliver("room.lobby.update", br#"{"type":"update","id":"prod-1"}"#)
        .await;
    assert_eq!(recv_env(&mut a_rx).await.id, "prod-1");
}

#[tokio::test]
async fn malformed_messages_are_dropped() {
    let f = fixture(None);
    let (a, mut a_rx) = Connection::new("a", 8, CancellationToken::new());
    f.registry.join(&a, "lobby");

    assert_eq!(f.bridge.deliver("room.lobby", br#"{"type":"update"}"#).await, 0);
    assert_eq!(f.bridge.deliver("room.lobby.update", b"not json").await, 0);
    assert_eq!(f.metrics.backbone_dropped.get(&[("reason", "subject")]), 1);
    assert_eq!(f.metrics.backbone_dropped.get(&[("reason", "payload")]), 1);
    assert!(a_rx.try_recv().is_err());
}

#[tokio::test]
async fn empty_room_delivers_to_nobody() {
    let f = fixture(None);
    assert_eq!(f.bridge.deliver("room.empty.update", br#"{"type":"update"}"#).await, 0);
}

#[tokio::test(start_paused = true)]
async fn stalled_peer_does_not_block_others() {
    let f = fixture(None);
    let (slow, _slow_rx) = Connection::new("slow", 1, CancellationToken::new());
    let (fast, mut fast_rx) = Connection::new("fast", 8, CancellationToken::new());
    f.registry.join(&slow, "lobby");
    f.registry.join(&fast, "lobby");

    // Nobody drains the slow peer's queue.
    slow.send(&Envelope::pong("fill")).await.unwrap();

    let delivered = f
        .bridge
        .deliver("room.lobby.update", br#"{"type":"update"}"#)
        .await;
    assert_eq!(delivered, 1);
    assert_eq!(f.metrics.fanout_sends.get(&[("result", "timeout")]), 1);
    assert_eq!(recv_env(&mut fast_rx).await.kind(), MsgKind::Update);
}

#[tokio::test]
async fn fanout_task_forwards_subscription_messages() {
    let backbone = MemoryBackbone::new();
    let f = fixture(Some(Arc::clone(&backbone)));
    let (a, mut a_rx) = Connection::new("a", 8, CancellationToken::new());
    f.registry.join(&a, "lobby");

    let shutdown = CancellationToken::new();
    let task = f.bridge.start_fanout(shutdown.clone()).await.unwrap();

    backbone.push("room.lobby.update", r#"{"type":"update","payload":"hi"}"#);
    let env = recv_env(&mut a_rx).await;
    assert_eq!(env.payload.unwrap().get(), r#""hi""#);

    shutdown.cancel();
    task.await.unwrap();
}

#[test]
fn a_room_always_maps_to_one_worker() {
    assert_eq!(fanout_shard("room.lobby.update"), fanout_shard("room.lobby.update"));
    assert_eq!(fanout_shard("room.lobby.update"), fanout_shard("room.lobby.action"));
}

#[tokio::test]
async fn stalled_room_does_not_delay_other_rooms() {
    let backbone = MemoryBackbone::new();
    let f = fixture_with_timeout(Some(Arc::clone(&backbone)), Duration::from_secs(30));

    let stuck_room = "stuck";
    let live_room = (0..)
        .map(|i| format!("live{i}"))
        .find(|r| fanout_shard(&format!("room.{r}.update")) != fanout_shard("room.stuck.update"))
        .unwrap();

    let (slow, _slow_rx) = Connection::new("slow", 1, CancellationToken::new());
    let (fast, mut fast_rx) = Connection::new("fast", 8, CancellationToken::new());
    f.registry.join(&slow, stuck_room);
    f.registry.join(&fast, &live_room);
    slow.send(&Envelope::pong("fill")).await.unwrap();

    let shutdown = CancellationToken::new();
    let task = f.bridge.start_fanout(shutdown.clone()).await.unwrap();

    backbone.push("room.stuck.update", r#"{"type":"update"}"#);
    backbone.push(&format!("room.{live_room}.update"), r#"{"type":"update","id":"live"}"#);
    assert_eq!(recv_env(&mut fast_rx).await.id, "live");

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("fanout did not stop")
        .unwrap();
}

#[tokio::test]
async fn updates_to_one_room_keep_their_order() {
    let backbone = MemoryBackbone::new();
    let f = fixture(Some(Arc::clone(&backbone)));
    let (a, mut a_rx) = Connection::new("a", 64, CancellationToken::new());
    f.registry.join(&a, "lobby");

    let shutdown = CancellationToken::new();
    let task = f.bridge.start_fanout(shutdown.clone()).await.unwrap();

    for i in 0..20 {
        backbone.push("room.lobby.update", &format!(r#"{{"type":"update","id":"u{i}"}}"#));
    }
    for i in 0..20 {
        assert_eq!(recv_env(&mut a_rx).await.id, format!("u{i}"));
    }

    shutdown.cancel();
    task.await.unwrap();
}
