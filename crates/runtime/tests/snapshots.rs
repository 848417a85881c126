use std::time::Duration;

use game_core::GameConfig;
use runtime::{GameSnapshot, Runtime};
use tokio::time::timeout;

fn owned_cells(snapshot: &GameSnapshot) -> u32 {
    snapshot
        .grid
        .values()
        .filter(|cell| !cell.owner.is_neutral())
        .count() as u32
}

#[tokio::test(start_paused = true)]
async fn snapshots_are_detached_from_live_state() {
    let runtime = Runtime::builder()
        .game_config(GameConfig::default().with_action_cooldown(Duration::ZERO))
        .build()
        .await
        .unwrap();
    let handle = runtime.handle();
    handle.add_player("alice").await.unwrap();
    handle.start_round().await.unwrap();

    let before = handle.game_state().await;
    handle.place_bit("alice", 0, 0).await.unwrap();
    let after = handle.game_state().await;

    assert_eq!(owned_cells(&before), 0);
    assert_eq!(owned_cells(&after), 1);
    assert!(after.timestamp > before.timestamp);
    assert!(after.version > before.version);

    runtime.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reads_see_consistent_states() {
    let runtime = Runtime::builder()
        .game_config(GameConfig::default().with_action_cooldown(Duration::ZERO))
        .build()
        .await
        .unwrap();
    let handle = runtime.handle();
    for id in ["a", "b", "c", "d"] {
        handle.add_player(id).await.unwrap();
    }
    handle.start_round().await.unwrap();

    let writer = {
        let handle = handle.clone();
        tokio::spawn(async move {
            for i in 0..40 {
                let player = ["a", "b", "c", "d"][i % 4];
                // Balances run dry quickly; rejections are fine here.
                let _ = handle.place_bit(player, (i % 5) as i32, 0).await;
            }
        })
    };

    let readers: Vec<_> = (0..8)
        .map(|_| {
            let handle = handle.clone();
            tokio::spawn(async move {
                for _ in 0..25 {
                    let snapshot = handle.game_state().await;
                    let scored: u32 = snapshot.teams.values().map(|team| team.score).sum();
                    assert_eq!(scored, owned_cells(&snapshot));
                    for team in snapshot.teams.values() {
                        for player in &team.players {
                            assert!(player.bits <= 10);
                        }
                    }
                }
            })
        })
        .collect();

    writer.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }

    runtime.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn watch_yields_the_next_change_not_the_current_value() {
    let runtime = Runtime::builder().build().await.unwrap();
    let handle = runtime.handle();
    let initial = handle.game_state().await;

    let mut watcher = handle.watch_game_state().unwrap();
    handle.add_player("alice").await.unwrap();

    let changed = timeout(Duration::from_secs(1), watcher.next())
        .await
        .expect("broadcast before timeout")
        .unwrap();
    assert!(changed.player("alice").is_some());
    assert!(changed.version > initial.version);
    assert!(initial.player("alice").is_none());

    runtime.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn shutdown_flushes_pending_state_to_watchers() {
    let runtime = Runtime::builder().build().await.unwrap();
    let handle = runtime.handle();
    let mut watcher = handle.watch_game_state().unwrap();

    handle.add_player("late").await.unwrap();
    runtime.shutdown().await.unwrap();

    let last = watcher.next().await.unwrap();
    assert!(last.player("late").is_some());
}
