//! Fixed-interval poll loops.
//!
//! The poller does no I/O itself: each loop only posts a tick into the core's
//! event channel and the core issues the requests.  Ticks are not queued up
//! behind a slow core; a missed tick is delayed, not bunched.

use std::time::Duration;

use beats_proto::config::PollingConfig;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::core::CoreEvent;

pub struct Poller;

impl Poller {
    /// Start the player/queue loop and the session-liveness loop.  The first
    /// tick of each fires one full period after start; the start-up sequence
    /// covers time zero.
    pub fn spawn(config: &PollingConfig, events: mpsc::Sender<CoreEvent>) -> PollerHandle {
        let cancel = CancellationToken::new();
        let player = Duration::from_millis(config.player_interval_ms.max(1));
        let session = Duration::from_secs(config.session_interval_secs.max(1));
        info!(
            "Poller: player every {:?}, session every {:?}",
            player, session
        );

        let tasks = vec![
            tokio::spawn(tick_loop(
                "player",
                player,
                || CoreEvent::PlayerTick,
                events.clone(),
                cancel.clone(),
            )),
            tokio::spawn(tick_loop(
                "session",
                session,
                || CoreEvent::SessionTick,
                events,
                cancel.clone(),
            )),
        ];
        PollerHandle { cancel, tasks }
    }
}

async fn tick_loop(
    name: &'static str,
    period: Duration,
    event: fn() -> CoreEvent,
    events: mpsc::Sender<CoreEvent>,
    cancel: CancellationToken,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if events.send(event()).await.is_err() {
                    debug!("Poller: {} loop: core gone", name);
                    break;
                }
            }
        }
    }
    debug!("Poller: {} loop stopped", name);
}

/// Owner handle for the two loops.  Dropping it without `stop` leaves the
/// loops running until the core's channel closes.
pub struct PollerHandle {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl PollerHandle {
    /// Stop both loops and wait for them to exit.  No tick is delivered
    /// after this returns.
    pub async fn stop(self) {
        self.cancel.cancel();
        for task in self.tasks {
            let _ = task.await;
        }
        info!("Poller: stopped");
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> PollingConfig {
        PollingConfig {
            player_interval_ms: 10,
            session_interval_secs: 3600,
        }
    }

    #[tokio::test]
    async fn test_player_ticks_arrive() {
        let (tx, mut rx) = mpsc::channel(8);
        let handle = Poller::spawn(&fast(), tx);
        for _ in 0..3 {
            let evt = tokio::time::timeout(Duration::from_secs(2), rx.recv())
                .await
                .unwrap()
                .unwrap();
            assert!(matches!(evt, CoreEvent::PlayerTick));
        }
        handle.stop().await;
    }

    #[tokio::test]
    async fn test_stop_ends_both_loops() {
        let (tx, mut rx) = mpsc::channel(8);
        let handle = Poller::spawn(&fast(), tx);
        assert!(!handle.is_stopped());
        handle.stop().await;
        // Both loops dropped their senders; drain what was already queued.
        while rx.recv().await.is_some() {}
    }

    #[tokio::test]
    async fn test_loops_exit_when_core_gone() {
        let (tx, rx) = mpsc::channel(1);
        let handle = Poller::spawn(&fast(), tx);
        drop(rx);
        let deadline = Instant::now() + Duration::from_secs(2);
        while !handle.tasks[0].is_finished() && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(handle.tasks[0].is_finished());
        handle.stop().await;
    }
}
