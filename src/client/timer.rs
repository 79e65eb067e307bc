//! Reconnect Timer
//!
//! Explicit cancellable scheduled task backing the wrapper's reconnect delay.
//! Replaces an implicit timer-handle field so that cancellation on close()
//! is unconditionally safe.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::wrapper::Signal;

// == Reconnect Timer ==
/// A deferred, cancellable task that emits one timer signal after a fixed delay.
#[derive(Debug)]
pub(crate) struct ReconnectTimer {
    cancel: CancellationToken,
}

impl ReconnectTimer {
    /// Arms a timer that sends [`Signal::TimerElapsed`] after `delay`.
    ///
    /// The signal is suppressed if the timer is cancelled first; a send
    /// failure (driver already gone) is ignored.
    pub(crate) fn schedule(delay: Duration, signals: mpsc::UnboundedSender<Signal>) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("reconnect timer cancelled");
                }
                _ = tokio::time::sleep(delay) => {
                    let _ = signals.send(Signal::TimerElapsed);
                }
            }
        });

        Self { cancel }
    }

    /// Cancels the timer. Safe to call at any time, including after firing.
    pub(crate) fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Drop for ReconnectTimer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_after_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _timer = ReconnectTimer::schedule(Duration::from_secs(1), tx);
        tokio::task::yield_now().await;

        tokio::time::advance(Duration::from_millis(999)).await;
        assert!(rx.try_recv().is_err(), "timer fired early");

        tokio::time::advance(Duration::from_millis(2)).await;
        tokio::task::yield_now().await;
        assert!(matches!(rx.try_recv(), Ok(Signal::TimerElapsed)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_suppresses_signal() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let timer = ReconnectTimer::schedule(Duration::from_secs(1), tx);

        timer.cancel();
        tokio::time::advance(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err(), "cancelled timer still fired");
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_timer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let timer = ReconnectTimer::schedule(Duration::from_secs(1), tx);
        drop(timer);

        tokio::time::advance(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err(), "dropped timer still fired");
    }
}
