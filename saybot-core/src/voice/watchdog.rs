// File: saybot-core/src/voice/watchdog.rs
//
// Debounced idle timer: one sleep whose deadline is pushed back on every pulse.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Sending half of a watchdog. Cheap to clone, never blocks.
#[derive(Debug, Clone)]
pub struct Liveness {
    tx: mpsc::Sender<()>,
}

impl Liveness {
    pub fn pulse(&self) {
        // Full means a pulse is already pending, which resets the timer just the same.
        let _ = self.tx.try_send(());
    }
}

pub struct IdleWatchdog {
    timeout: Duration,
    rx: mpsc::Receiver<()>,
}

impl IdleWatchdog {
    pub fn new(timeout: Duration) -> (Liveness, IdleWatchdog) {
        let (tx, rx) = mpsc::channel(1);
        (Liveness { tx }, IdleWatchdog { timeout, rx })
    }

    /// Runs `on_expire` once if `timeout` passes without a pulse.
    ///
    /// The task also ends, without calling `on_expire`, when `cancel` fires or
    /// every `Liveness` handle has been dropped.
    pub fn spawn<F, Fut>(self, cancel: CancellationToken, on_expire: F) -> JoinHandle<()>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let IdleWatchdog { timeout, mut rx } = self;

        tokio::spawn(async move {
            let sleep = tokio::time::sleep(timeout);
            tokio::pin!(sleep);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        trace!("Watchdog cancelled");
                        return;
                    }
                    pulse = rx.recv() => match pulse {
                        Some(()) => sleep.as_mut().reset(Instant::now() + timeout),
                        None => {
                            trace!("Watchdog lost its owner");
                            return;
                        }
                    },
                    _ = &mut sleep => {
                        on_expire().await;
                        return;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce() -> std::future::Ready<()> + Send + 'static) {
        let fired = Arc::new(AtomicUsize::new(0));
        let f = fired.clone();
        (fired, move || {
            f.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        })
    }

    #[tokio::test(start_paused = true)]
    async fn fires_after_quiet_window() {
        let (fired, on_expire) = counter();
        let (_liveness, dog) = IdleWatchdog::new(Duration::from_secs(10));
        let handle = dog.spawn(CancellationToken::new(), on_expire);

        tokio::time::sleep(Duration::from_secs(9)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        handle.await.unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn pulses_push_the_deadline_back() {
        let (fired, on_expire) = counter();
        let (liveness, dog) = IdleWatchdog::new(Duration::from_secs(10));
        let handle = dog.spawn(CancellationToken::new(), on_expire);

        for _ in 0..5 {
            tokio::time::sleep(Duration::from_secs(6)).await;
            liveness.pulse();
        }
        // 30s have passed, never 10s without a pulse.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(10)).await;
        handle.await.unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_and_drop_end_quietly() {
        let (fired, on_expire) = counter();
        let cancel = CancellationToken::new();
        let (_liveness, dog) = IdleWatchdog::new(Duration::from_secs(10));
        let handle = dog.spawn(cancel.clone(), on_expire);
        cancel.cancel();
        handle.await.unwrap();

        let (liveness, dog) = IdleWatchdog::new(Duration::from_secs(10));
        let (fired2, on_expire2) = counter();
        let handle = dog.spawn(CancellationToken::new(), on_expire2);
        drop(liveness);
        handle.await.unwrap();

        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(fired2.load(Ordering::SeqCst), 0);
    }
}
