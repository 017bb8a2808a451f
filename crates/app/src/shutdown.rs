//! Shutdown signal and the periodic task runner built on it.
//!
//! Every long-running loop (room updater, controller, measurer reporters)
//! is a [`spawn_periodic`] task parameterised by a period and a
//! [`ShutdownSignal`]. Triggering the signal stops every loop at its next
//! suspension point; a tick already in progress runs to completion.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Create a connected trigger/signal pair.
#[must_use]
pub fn channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (sender, receiver) = watch::channel(false);
    (ShutdownTrigger(sender), ShutdownSignal(receiver))
}

/// Owner side: fires the shutdown once.
#[derive(Debug)]
pub struct ShutdownTrigger(watch::Sender<bool>);

impl ShutdownTrigger {
    /// Request every task holding a [`ShutdownSignal`] to stop.
    pub fn trigger(&self) {
        self.0.send_replace(true);
    }

    /// Create another signal observing this trigger.
    #[must_use]
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal(self.0.subscribe())
    }
}

/// Observer side, cheap to clone into each task.
#[derive(Debug, Clone)]
pub struct ShutdownSignal(watch::Receiver<bool>);

impl ShutdownSignal {
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolve once shutdown is requested or the trigger is dropped.
    pub async fn triggered(&mut self) {
        let _ = self.0.wait_for(|stopped| *stopped).await;
    }
}

/// Spawn `task` every `period` until `shutdown` fires.
///
/// The first tick runs immediately. `task` receives the tick count,
/// starting at zero. Late ticks are delayed rather than bunched.
pub fn spawn_periodic<F, Fut>(
    name: &'static str,
    period: Duration,
    mut shutdown: ShutdownSignal,
    mut task: F,
) -> JoinHandle<()>
where
    F: FnMut(u64) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut count: u64 = 0;

        tracing::debug!(task = name, period_ms = period.as_millis(), "periodic task started");
        loop {
            tokio::select! {
                biased;
                () = shutdown.triggered() => break,
                _ = interval.tick() => {
                    task(count).await;
                    count = count.wrapping_add(1);
                }
            }
        }
        tracing::debug!(task = name, ticks = count, "periodic task stopped");
    })
}
