use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use game_core::{GameConfig, RoundState};
use runtime::{
    Distribution, DistributionMode, EventLog, FileEventLog, InMemoryEventLog,
    InMemorySnapshotStore, ReplicatedDistribution, Runtime, RuntimeConfig, RuntimeError,
    RuntimeRole, SubjectFilter,
};
use serde_json::json;
use tokio::time::{sleep, timeout};

fn file_config(dir: &std::path::Path) -> RuntimeConfig {
    RuntimeConfig {
        game_config: GameConfig::default().with_action_cooldown(Duration::ZERO),
        broadcast_interval: Duration::from_millis(10),
        distribution: DistributionMode::File {
            data_dir: dir.to_path_buf(),
        },
        ..RuntimeConfig::default()
    }
}

#[tokio::test]
async fn file_distribution_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    let runtime = Runtime::builder()
        .config(file_config(dir.path()))
        .build()
        .await
        .expect("file-backed runtime starts");
    let handle = runtime.handle();
    assert_eq!(handle.distribution_name(), "replicated");

    handle.add_player("alice").await.unwrap();
    handle.start_round().await.unwrap();
    handle.place_bit("alice", 7, 4).await.unwrap();
    let before = handle.game_state().await;
    drop(handle);
    runtime.shutdown().await.unwrap();

    let runtime = Runtime::builder()
        .config(file_config(dir.path()))
        .build()
        .await
        .expect("runtime restarts from disk");
    let restored = runtime.handle().game_state().await;

    assert_eq!(restored.round_state, RoundState::InProgress);
    assert_eq!(restored.player("alice").unwrap().bits, 9);
    assert_eq!(restored.cell(7, 4), before.cell(7, 4));
    assert_eq!(restored.teams, before.teams);
    assert!(restored.version >= before.version);
    runtime.shutdown().await.unwrap();

    let log = FileEventLog::open(dir.path()).unwrap();
    let subjects: Vec<String> = log
        .read_from(0)
        .unwrap()
        .into_iter()
        .map(|record| record.subject)
        .collect();
    assert_eq!(
        subjects,
        ["game.player_join", "game.round_started", "game.bit_placed"]
    );
}

#[tokio::test]
async fn unwritable_data_dir_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"file").unwrap();

    let result = Runtime::builder().config(file_config(&blocker)).build().await;
    assert!(result.is_err());
}

#[tokio::test]
async fn torn_event_log_tail_does_not_block_restart() {
    let dir = tempfile::tempdir().unwrap();

    let runtime = Runtime::builder()
        .config(file_config(dir.path()))
        .build()
        .await
        .unwrap();
    runtime.handle().add_player("alice").await.unwrap();
    runtime.shutdown().await.unwrap();

    let mut file = OpenOptions::new()
        .append(true)
        .open(dir.path().join("events.log"))
        .unwrap();
    file.write_all(&4096u32.to_le_bytes()).unwrap();
    file.write_all(b"partial").unwrap();
    drop(file);

    let runtime = Runtime::builder()
        .config(file_config(dir.path()))
        .build()
        .await
        .expect("runtime restarts past a torn record");
    let handle = runtime.handle();
    assert!(handle.player("alice").await.is_ok());
    handle.add_player("bob").await.unwrap();
    runtime.shutdown().await.unwrap();

    let records = FileEventLog::open(dir.path())
        .unwrap()
        .read_from(0)
        .unwrap();
    let sequences: Vec<u64> = records.iter().map(|record| record.sequence).collect();
    assert_eq!(sequences, [1, 2]);
    assert_eq!(records[1].subject, "game.player_join");
}

#[tokio::test]
async fn follower_mirrors_the_primary_and_rejects_writes() {
    let distribution = Arc::new(ReplicatedDistribution::new(
        Arc::new(InMemorySnapshotStore::new()),
        Arc::new(InMemoryEventLog::new()),
    ));
    let config = RuntimeConfig {
        broadcast_interval: Duration::from_millis(10),
        ..RuntimeConfig::default()
    };

    let primary = Runtime::builder()
        .config(config.clone())
        .distribution(distribution.clone())
        .build()
        .await
        .unwrap();
    let follower = Runtime::builder()
        .config(config)
        .distribution(distribution.clone())
        .role(RuntimeRole::Follower)
        .build()
        .await
        .unwrap();
    let mirror = follower.handle();
    let mut joins = mirror.event_stream(SubjectFilter::event_type("player_join").unwrap());

    primary.handle().add_player("alice").await.unwrap();

    let envelope = timeout(Duration::from_secs(2), joins.next())
        .await
        .expect("join event before timeout")
        .unwrap();
    assert_eq!(envelope.player_id.as_deref(), Some("alice"));
    assert_eq!(envelope.team_id.as_deref(), Some("Glitchbyte"));

    let (player, team) = timeout(Duration::from_secs(2), async {
        loop {
            if let Ok(found) = mirror.player("alice").await {
                break found;
            }
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("follower applies the primary's snapshot");
    assert_eq!(player.team_id.as_str(), "Glitchbyte");
    assert_eq!(team.active_count, 1);

    assert!(matches!(
        mirror.add_player("bob").await,
        Err(RuntimeError::ReadOnly)
    ));
    assert!(matches!(
        mirror.place_bit("alice", 0, 0).await,
        Err(RuntimeError::ReadOnly)
    ));
    assert!(matches!(
        mirror.start_round().await,
        Err(RuntimeError::ReadOnly)
    ));
    assert!(matches!(
        mirror.remove_player("alice").await,
        Err(RuntimeError::ReadOnly)
    ));

    // Past the primary's first round tick: only the primary writes the store.
    sleep(Duration::from_millis(1_200)).await;
    let stored = distribution.load_snapshot().await.unwrap().unwrap();
    assert!(stored.player("alice").is_some());
    assert_eq!(
        mirror.game_state().await.teams,
        primary.handle().game_state().await.teams
    );

    primary.shutdown().await.unwrap();
    follower.shutdown().await.unwrap();
}

#[tokio::test]
async fn follower_needs_a_shared_store() {
    let result = Runtime::builder()
        .role(RuntimeRole::Follower)
        .build()
        .await;
    assert!(matches!(result, Err(RuntimeError::NoSharedStore)));
}

#[tokio::test]
async fn custom_events_reach_filtered_subscribers() {
    let runtime = Runtime::builder().build().await.unwrap();
    let handle = runtime.handle();

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let subscription = handle.subscribe_events("game.chat".parse().unwrap(), move |envelope| {
        let _ = tx.send(envelope);
    });

    handle.add_player("alice").await.unwrap();
    handle
        .publish_event("chat", json!({ "text": "gg" }))
        .await
        .unwrap();

    let envelope = timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("custom event before timeout")
        .unwrap();
    assert_eq!(envelope.event_type, "chat");
    assert_eq!(envelope.data, json!({ "text": "gg" }));
    assert!(rx.try_recv().is_err());

    assert!(handle.publish_event("bad.type", json!(null)).await.is_err());
    assert!(handle.publish_event("", json!(null)).await.is_err());

    subscription.abort();
    runtime.shutdown().await.unwrap();
}
