//! End-to-end arena flow through the running task and its handle

use std::time::Duration;

use tokio::time::timeout;
use uuid::Uuid;

use dogfight_server::catalog::JetCatalog;
use dogfight_server::game::arena::CLOSE_SUPERSEDED;
use dogfight_server::game::{outbound, Arena, ArenaHandle, LeaveReason, Outbound, OutboundRx};
use dogfight_server::http::auth::{issue_session, resolve_identity};
use dogfight_server::util::time::unix_secs;
use dogfight_server::ws::protocol::{ClientMsg, ServerMsg};

const SECRET: &str = "integration-secret";
const WAIT: Duration = Duration::from_secs(2);

struct Pilot {
    player_id: String,
    conn_id: Uuid,
    rx: OutboundRx,
}

impl Pilot {
    /// Next item that is not a periodic or reactive state sync
    async fn next_event(&mut self) -> Outbound {
        loop {
            let item = timeout(WAIT, self.rx.recv())
                .await
                .expect("timed out waiting for arena")
                .expect("outbound queue closed");
            if !matches!(item, Outbound::Message(ServerMsg::StateSync { .. })) {
                return item;
            }
        }
    }

    async fn next_message(&mut self) -> ServerMsg {
        match self.next_event().await {
            Outbound::Message(msg) => msg,
            other => panic!("expected a message, got {other:?}"),
        }
    }
}

fn start(sync_interval: Duration) -> ArenaHandle {
    let (arena, handle) = Arena::new(sync_interval);
    tokio::spawn(arena.run());
    handle
}

async fn connect(arena: &ArenaHandle, name: &str) -> Pilot {
    let catalog = JetCatalog::load(None).unwrap();
    let now = unix_secs();
    let token = issue_session(name, "F22", Duration::from_secs(3600), SECRET, now).unwrap();
    let identity = resolve_identity(Some(&token), SECRET, &catalog, now).unwrap();

    let (tx, rx) = outbound::channel();
    let conn_id = Uuid::new_v4();
    let player_id = identity.player_id.clone();
    arena.join(identity, conn_id, tx).await.unwrap();

    Pilot {
        player_id,
        conn_id,
        rx,
    }
}

async fn send(arena: &ArenaHandle, pilot: &Pilot, json: &str) {
    let msg: ClientMsg = serde_json::from_str(json).unwrap();
    arena.inbound(&pilot.player_id, pilot.conn_id, msg).await.unwrap();
}

fn chat_text(msg: &ServerMsg) -> Option<&str> {
    match msg {
        ServerMsg::ChatMessage(entry) => Some(entry.text.as_str()),
        _ => None,
    }
}

#[tokio::test]
async fn pilots_fight_and_chat() {
    let arena = start(Duration::from_secs(3600));

    let mut alpha = connect(&arena, "alpha").await;
    assert!(matches!(alpha.next_message().await, ServerMsg::SessionInit { .. }));
    assert_eq!(chat_text(&alpha.next_message().await), Some("alpha joined the fight"));

    let mut bravo = connect(&arena, "bravo").await;
    assert!(matches!(bravo.next_message().await, ServerMsg::SessionInit { .. }));
    assert!(matches!(bravo.next_message().await, ServerMsg::ChatHistory { ref messages } if messages.len() == 1));
    assert_eq!(chat_text(&bravo.next_message().await), Some("bravo joined the fight"));
    assert_eq!(chat_text(&alpha.next_message().await), Some("bravo joined the fight"));

    // Cannon round: ack for the shooter, projectile for everyone else
    send(&arena, &alpha, r#"{"type":"combat:fire","weapon":"cannon"}"#).await;
    match alpha.next_message().await {
        ServerMsg::FireAck(ack) => {
            assert!(ack.allowed);
            assert_eq!(ack.ammo, 999);
        }
        other => panic!("expected fire ack, got {other:?}"),
    }
    match bravo.next_message().await {
        ServerMsg::Projectile(projectile) => assert_eq!(projectile.shooter_id, "alpha:F22"),
        other => panic!("expected projectile, got {other:?}"),
    }

    // The round lands
    send(
        &arena,
        &alpha,
        r#"{"type":"combat:damage","targetId":"bravo:F22","amount":40,"weapon":"cannon"}"#,
    )
    .await;
    for pilot in [&mut alpha, &mut bravo] {
        match pilot.next_message().await {
            ServerMsg::Damage(damage) => {
                assert_eq!(damage.target_id, "bravo:F22");
                assert_eq!(damage.remaining_health, 110.0);
            }
            other => panic!("expected damage, got {other:?}"),
        }
    }

    // Bravo answers in chat
    send(&arena, &bravo, r#"{"type":"chat:send","text":"  splash one?  "}"#).await;
    for pilot in [&mut alpha, &mut bravo] {
        assert_eq!(chat_text(&pilot.next_message().await), Some("splash one?"));
    }

    assert_eq!(arena.player_count(), 2);

    arena
        .leave(&bravo.player_id, bravo.conn_id, LeaveReason::Closed)
        .await
        .unwrap();
    assert_eq!(chat_text(&alpha.next_message().await), Some("bravo left the fight"));
    assert_eq!(arena.player_count(), 1);
}

#[tokio::test]
async fn reconnect_replaces_the_old_session() {
    let arena = start(Duration::from_secs(3600));

    let mut first = connect(&arena, "alpha").await;
    first.next_message().await;
    first.next_message().await;

    let mut second = connect(&arena, "alpha").await;
    match first.next_event().await {
        Outbound::Close { code, .. } => assert_eq!(code, CLOSE_SUPERSEDED),
        other => panic!("expected close, got {other:?}"),
    }
    // The arena dropped the old queue; at most a stale sync is left behind
    loop {
        match timeout(WAIT, first.rx.recv()).await.unwrap() {
            None => break,
            Some(Outbound::Message(ServerMsg::StateSync { .. })) => {}
            Some(other) => panic!("unexpected item after close: {other:?}"),
        }
    }

    // A late close from the replaced socket does not evict the new one
    arena
        .leave(&first.player_id, first.conn_id, LeaveReason::Closed)
        .await
        .unwrap();
    assert!(matches!(second.next_message().await, ServerMsg::SessionInit { .. }));
    assert_eq!(arena.player_count(), 1);
}

#[tokio::test]
async fn periodic_sync_carries_cannon_status() {
    let arena = start(Duration::from_millis(20));
    let mut alpha = connect(&arena, "alpha").await;

    let sync = loop {
        let item = timeout(WAIT, alpha.rx.recv()).await.unwrap().unwrap();
        if let Outbound::Message(ServerMsg::StateSync { cannon: Some(cannon), fuel, .. }) = item {
            break (cannon, fuel);
        }
    };

    assert_eq!(sync.0.ammo, 1000);
    assert_eq!(sync.0.cooldown_remaining, 0);
    assert_eq!(sync.1, 150.0);
}
