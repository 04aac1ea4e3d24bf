//! Cancelable fixed-interval background tasks.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Run `tick` every `period` until `token` is cancelled or `tick` returns false.
///
/// The first tick fires one full period after the call. `tick` must not block:
/// anything slow belongs in a task it spawns.
pub(crate) fn spawn_interval<F>(
    name: &'static str,
    period: Duration,
    token: CancellationToken,
    mut tick: F,
) -> JoinHandle<()>
where
    F: FnMut() -> bool + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(task = name, "Interval task cancelled");
                    break;
                }
                _ = interval.tick() => {
                    if !tick() {
                        debug!(task = name, "Interval task owner dropped");
                        break;
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_interval_ticks_after_each_period() {
        let count = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();
        let counter = count.clone();
        let handle = spawn_interval("test", Duration::from_secs(10), token.clone(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(21)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        token.cancel();
        handle.await.unwrap();

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_stops_when_tick_returns_false() {
        let token = CancellationToken::new();
        let handle = spawn_interval("test", Duration::from_secs(1), token, || false);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(handle.is_finished());
    }
}
