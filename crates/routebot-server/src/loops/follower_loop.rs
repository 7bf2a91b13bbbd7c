//! Follower tick loop.
//!
//! One task per follower run. It ticks the shared follower on a fixed
//! interval and broadcasts every step; it ends when the run completes, is
//! replaced, or the task is aborted.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use routebot_core::{FollowerTick, PathFollower};
use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};

pub async fn run_follower_loop(
    follower: Arc<Mutex<PathFollower>>,
    tx: broadcast::Sender<FollowerTick>,
    tick_every: Duration,
    run_id: u64,
) {
    let mut ticker = interval(tick_every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let tick = {
            let Ok(mut follower) = follower.lock() else {
                tracing::warn!("Follower lock poisoned, stopping run {}", run_id);
                break;
            };
            if follower.run_id() != run_id {
                break;
            }
            follower.tick(Instant::now())
        };

        let Some(tick) = tick else {
            break;
        };
        // no subscribers is fine
        let _ = tx.send(tick);
        if tick.completed {
            tracing::info!("Follower run {} completed", run_id);
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use routebot_core::Cartesian3;

    #[tokio::test]
    async fn streams_until_completion() {
        let follower = Arc::new(Mutex::new(PathFollower::new()));
        let run_id = {
            let mut f = follower.lock().unwrap();
            let positions = vec![Cartesian3::new(0.0, 0.0, 0.0), Cartesian3::new(6.0, 0.0, 0.0)];
            assert!(f.start(positions, 12.0, Instant::now()));
            f.run_id()
        };
        let (tx, mut rx) = broadcast::channel(256);

        run_follower_loop(follower.clone(), tx, Duration::from_millis(10), run_id).await;

        let mut last = None;
        while let Ok(tick) = rx.try_recv() {
            last = Some(tick);
        }
        let last = last.expect("at least one tick");
        assert!(last.completed);
        assert_eq!(last.position, Cartesian3::new(6.0, 0.0, 0.0));
        assert!(!follower.lock().unwrap().is_running());
    }

    #[tokio::test]
    async fn exits_when_run_was_replaced() {
        let follower = Arc::new(Mutex::new(PathFollower::new()));
        {
            let mut f = follower.lock().unwrap();
            let positions = vec![Cartesian3::new(0.0, 0.0, 0.0), Cartesian3::new(600.0, 0.0, 0.0)];
            f.start(positions.clone(), 12.0, Instant::now());
            f.start(positions, 12.0, Instant::now());
        }
        let (tx, mut rx) = broadcast::channel(16);

        run_follower_loop(follower, tx, Duration::from_millis(5), 1).await;
        assert!(rx.try_recv().is_err());
    }
}
