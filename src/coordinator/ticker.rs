//! Cancellable repeating timer.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// What a tick callback wants next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Continue,
    Finish,
}

/// A task that runs a callback every `period`.
///
/// The first tick fires one period after spawning, and tick numbers start at
/// 1. The token is checked before every tick and races the callback itself,
/// so once cancelled the callback never starts again and an in-flight one is
/// dropped at its next suspension point.
///
/// Dropping the task cancels it unless it was [`detach`](Self::detach)ed.
pub struct RepeatingTask {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
    cancel_on_drop: bool,
}

impl RepeatingTask {
    /// Spawn a repeating task on the current runtime.
    pub fn spawn<F, Fut>(period: Duration, token: CancellationToken, mut on_tick: F) -> Self
    where
        F: FnMut(u32) -> Fut + Send + 'static,
        Fut: Future<Output = Tick> + Send + 'static,
    {
        let task_token = token.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut tick: u32 = 0;

            loop {
                tokio::select! {
                    biased;
                    _ = task_token.cancelled() => break,
                    _ = interval.tick() => {}
                }
                if task_token.is_cancelled() {
                    break;
                }

                tick = tick.saturating_add(1);
                let outcome = tokio::select! {
                    biased;
                    _ = task_token.cancelled() => break,
                    outcome = on_tick(tick) => outcome,
                };
                if outcome == Tick::Finish {
                    break;
                }
            }
        });

        Self {
            token,
            handle: Some(handle),
            cancel_on_drop: true,
        }
    }

    /// Run `f` once after `delay`, unless cancelled first.
    pub fn once<F>(delay: Duration, token: CancellationToken, f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let mut f = Some(f);
        Self::spawn(delay, token, move |_| {
            if let Some(f) = f.take() {
                f();
            }
            async { Tick::Finish }
        })
    }

    /// Stop the task. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Let the task run to completion on its own.
    ///
    /// It still honours its token, so a detached task created from a child
    /// token stops when the parent is cancelled.
    pub fn detach(mut self) {
        self.cancel_on_drop = false;
        self.handle.take();
    }

    /// Wait for the task to end.
    pub async fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for RepeatingTask {
    fn drop(&mut self) {
        if self.cancel_on_drop {
            self.token.cancel();
        }
    }
}
