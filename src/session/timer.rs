use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::debug;

/// A repeating callback on the tokio runtime
///
/// The callback first fires one full period after the timer is spawned and
/// keeps firing until it returns `false`, the timer is cancelled, or the
/// timer is dropped. Firings never overlap: the next one is scheduled only
/// after the previous callback has returned.
pub struct TickTimer {
    handle: JoinHandle<()>,
}

impl TickTimer {
    /// Start the timer. Must be called from within a tokio runtime.
    pub fn spawn<F>(period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticks.tick().await;
                if !on_tick() {
                    break;
                }
            }

            debug!("tick timer ran out");
        });

        Self { handle }
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Whether the timer has stopped firing for good
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for TickTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting_timer(period: Duration, limit: u32) -> (TickTimer, Arc<AtomicU32>) {
        let count = Arc::new(AtomicU32::new(0));
        let seen = Arc::clone(&count);
        let timer = TickTimer::spawn(period, move || seen.fetch_add(1, Ordering::SeqCst) + 1 < limit);
        (timer, count)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_per_period() {
        let (_timer, count) = counting_timer(Duration::from_millis(200), u32::MAX);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(550)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_callback_declines() {
        let (timer, count) = counting_timer(Duration::from_millis(200), 2);

        tokio::time::sleep(Duration::from_millis(2_000)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(timer.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_and_drop_stop_firing() {
        let (timer, count) = counting_timer(Duration::from_millis(200), u32::MAX);
        tokio::time::sleep(Duration::from_millis(300)).await;
        timer.cancel();
        tokio::time::sleep(Duration::from_millis(1_000)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        let (timer, count) = counting_timer(Duration::from_millis(200), u32::MAX);
        drop(timer);
        tokio::time::sleep(Duration::from_millis(1_000)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
