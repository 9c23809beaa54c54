//! Deferred task execution.
//!
//! The save coordinator never sleeps itself; it asks a [`Scheduler`] to run
//! a task later. Production uses the tokio timer, tests drive a manual clock.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// A deferred unit of work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Clock plus one-shot timers.
pub trait Scheduler: Send + Sync {
    fn now(&self) -> Instant;

    /// Run `task` once `delay` has elapsed.
    fn schedule(&self, delay: Duration, task: Task);
}

/// Timers on a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: tokio::runtime::Handle,
}

impl TokioScheduler {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Bind to the runtime of the calling task.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn current() -> Self {
        Self::new(tokio::runtime::Handle::current())
    }
}

impl Scheduler for TokioScheduler {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    fn schedule(&self, delay: Duration, task: Task) {
        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
    }
}

struct Pending {
    due: Duration,
    seq: u64,
    task: Task,
}

struct ManualState {
    elapsed: Duration,
    next_seq: u64,
    pending: Vec<Pending>,
}

/// A virtual clock advanced by hand.
pub struct ManualScheduler {
    origin: Instant,
    state: Mutex<ManualState>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            state: Mutex::new(ManualState {
                elapsed: Duration::ZERO,
                next_seq: 0,
                pending: Vec::new(),
            }),
        }
    }

    /// Move the clock forward by `by`, running every task that falls due in
    /// order. Tasks scheduled while advancing run too if they fall due.
    pub fn advance(&self, by: Duration) {
        let target = self.state.lock().elapsed + by;
        loop {
            let task = {
                let mut state = self.state.lock();
                let next = state
                    .pending
                    .iter()
                    .enumerate()
                    .filter(|(_, pending)| pending.due <= target)
                    .min_by_key(|(_, pending)| (pending.due, pending.seq))
                    .map(|(index, _)| index);
                match next {
                    Some(index) => {
                        let pending = state.pending.remove(index);
                        state.elapsed = pending.due;
                        pending.task
                    }
                    None => {
                        state.elapsed = target;
                        return;
                    }
                }
            };
            task();
        }
    }

    /// Time elapsed on the virtual clock.
    pub fn elapsed(&self) -> Duration {
        self.state.lock().elapsed
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for ManualScheduler {
    fn now(&self) -> Instant {
        self.origin + self.state.lock().elapsed
    }

    fn schedule(&self, delay: Duration, task: Task) {
        let mut state = self.state.lock();
        let due = state.elapsed + delay;
        let seq = state.next_seq;
        state.next_seq += 1;
        state.pending.push(Pending { due, seq, task });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_manual_runs_due_tasks_in_order() {
        let scheduler = ManualScheduler::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for (delay, name) in [(30, "c"), (10, "a"), (20, "b")] {
            let log = log.clone();
            scheduler.schedule(Duration::from_millis(delay), Box::new(move || log.lock().push(name)));
        }

        scheduler.advance(Duration::from_millis(20));
        assert_eq!(*log.lock(), vec!["a", "b"]);
        assert_eq!(scheduler.pending_count(), 1);

        scheduler.advance(Duration::from_millis(10));
        assert_eq!(*log.lock(), vec!["a", "b", "c"]);
        assert_eq!(scheduler.elapsed(), Duration::from_millis(30));
    }

    #[test]
    fn test_manual_runs_tasks_scheduled_while_advancing() {
        let scheduler = Arc::new(ManualScheduler::new());
        let fired = Arc::new(Mutex::new(Vec::new()));

        let inner = scheduler.clone();
        let log = fired.clone();
        scheduler.schedule(
            Duration::from_secs(1),
            Box::new(move || {
                log.lock().push(inner.elapsed());
                let log = log.clone();
                let clock = inner.clone();
                inner.schedule(Duration::from_secs(1), Box::new(move || log.lock().push(clock.elapsed())));
            }),
        );

        scheduler.advance(Duration::from_secs(5));
        assert_eq!(*fired.lock(), vec![Duration::from_secs(1), Duration::from_secs(2)]);
        assert_eq!(scheduler.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_fires_after_delay() {
        let scheduler = TokioScheduler::current();
        let (tx, rx) = tokio::sync::oneshot::channel();
        let start = scheduler.now();

        scheduler.schedule(
            Duration::from_secs(6),
            Box::new(move || {
                let _ = tx.send(());
            }),
        );
        rx.await.unwrap();
        assert!(scheduler.now() - start >= Duration::from_secs(6));
    }
}
