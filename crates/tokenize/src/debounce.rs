//! Trailing-edge debouncing on the tokio runtime.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{trace, warn};

use crate::tokenizer::Listener;

/// Quiet period used when none is configured.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(500);

/// Runs the most recently scheduled task once no newer task has been
/// scheduled for `delay`.
///
/// Each [`Debouncer::schedule`] aborts the pending task, so the quiet period
/// is measured from the last call. Dropping the debouncer aborts the pending
/// task too.
#[derive(Debug)]
pub struct Debouncer {
	delay: Duration,
	pending: Option<JoinHandle<()>>,
}

impl Default for Debouncer {
	fn default() -> Self {
		Self::new(DEFAULT_DELAY)
	}
}

impl Debouncer {
	pub fn new(delay: Duration) -> Self {
		Self { delay, pending: None }
	}

	pub fn delay(&self) -> Duration {
		self.delay
	}

	/// Replaces the pending task with `task`, to run after the quiet period.
	///
	/// Outside a tokio runtime there is no timer; `task` runs immediately.
	pub fn schedule<F>(&mut self, task: F)
	where
		F: FnOnce() + Send + 'static,
	{
		let replaced = self.cancel();
		let Ok(runtime) = Handle::try_current() else {
			warn!("debounce.no_runtime");
			task();
			return;
		};
		let delay = self.delay;
		trace!(delay_ms = delay.as_millis() as u64, replaced, "debounce.schedule");
		self.pending = Some(runtime.spawn(async move {
			tokio::time::sleep(delay).await;
			task();
		}));
	}

	/// Aborts the pending task. Returns whether one was still waiting.
	pub fn cancel(&mut self) -> bool {
		let Some(pending) = self.pending.take() else {
			return false;
		};
		let waiting = !pending.is_finished();
		pending.abort();
		waiting
	}

	pub fn is_pending(&self) -> bool {
		self.pending.as_ref().is_some_and(|pending| !pending.is_finished())
	}
}

impl Drop for Debouncer {
	fn drop(&mut self) {
		self.cancel();
	}
}

/// Listeners told when recomputed results are ready.
#[derive(Default)]
pub struct Subscribers {
	listeners: Vec<Listener>,
}

impl std::fmt::Debug for Subscribers {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Subscribers").field("len", &self.listeners.len()).finish()
	}
}

impl Subscribers {
	pub fn new() -> Self {
		Self::default()
	}

	/// Listeners stay registered until [`Subscribers::clear`].
	pub fn subscribe(&mut self, listener: Listener) {
		self.listeners.push(listener);
	}

	/// Current listeners in subscription order.
	pub fn listeners(&self) -> Vec<Listener> {
		self.listeners.clone()
	}

	pub fn clear(&mut self) {
		self.listeners.clear();
	}

	pub fn len(&self) -> usize {
		self.listeners.len()
	}

	pub fn is_empty(&self) -> bool {
		self.listeners.is_empty()
	}
}

/// Calls every listener in `subscribers` without holding the lock, so a
/// listener may subscribe or query again.
pub fn notify(subscribers: &Mutex<Subscribers>) {
	let listeners = subscribers.lock().listeners();
	trace!(listeners = listeners.len(), "debounce.notify");
	for listener in listeners {
		listener();
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;
	use std::sync::atomic::{AtomicUsize, Ordering};

	use pretty_assertions::assert_eq;
	use tokio::sync::mpsc;
	use tokio::time::Instant;

	use super::*;

	const DELAY: Duration = Duration::from_millis(500);

	#[tokio::test(flavor = "current_thread", start_paused = true)]
	async fn test_last_schedule_wins_after_quiet_period() {
		let (tx, mut rx) = mpsc::unbounded_channel();
		let mut debouncer = Debouncer::new(DELAY);
		let start = Instant::now();

		let first = tx.clone();
		debouncer.schedule(move || {
			let _ = first.send("first");
		});
		tokio::time::advance(Duration::from_millis(300)).await;
		let second = tx.clone();
		debouncer.schedule(move || {
			let _ = second.send("second");
		});
		assert!(debouncer.is_pending());

		assert_eq!(rx.recv().await, Some("second"));
		assert!(start.elapsed() >= Duration::from_millis(800));
		tokio::time::sleep(Duration::from_secs(5)).await;
		assert!(rx.try_recv().is_err());
		assert!(!debouncer.is_pending());
	}

	#[tokio::test(flavor = "current_thread", start_paused = true)]
	async fn test_cancel_and_drop_abort_pending_task() {
		let runs = Arc::new(AtomicUsize::new(0));
		let mut debouncer = Debouncer::new(DELAY);
		let counter = Arc::clone(&runs);
		debouncer.schedule(move || {
			counter.fetch_add(1, Ordering::SeqCst);
		});
		assert!(debouncer.cancel());
		assert!(!debouncer.cancel());

		let counter = Arc::clone(&runs);
		debouncer.schedule(move || {
			counter.fetch_add(1, Ordering::SeqCst);
		});
		drop(debouncer);

		tokio::time::sleep(DELAY * 4).await;
		assert_eq!(runs.load(Ordering::SeqCst), 0);
	}

	#[test]
	fn test_without_runtime_runs_immediately() {
		let runs = Arc::new(AtomicUsize::new(0));
		let mut debouncer = Debouncer::default();
		let counter = Arc::clone(&runs);
		debouncer.schedule(move || {
			counter.fetch_add(1, Ordering::SeqCst);
		});
		assert_eq!(runs.load(Ordering::SeqCst), 1);
		assert!(!debouncer.is_pending());
		assert_eq!(debouncer.delay(), DEFAULT_DELAY);
	}

	#[test]
	fn test_subscribers_notify_in_order() {
		let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
		let subscribers = Mutex::new(Subscribers::new());
		for n in 0..3 {
			let seen = Arc::clone(&seen);
			subscribers.lock().subscribe(Arc::new(move || seen.lock().push(n)));
		}
		assert_eq!(subscribers.lock().len(), 3);

		notify(&subscribers);
		notify(&subscribers);
		assert_eq!(*seen.lock(), vec![0, 1, 2, 0, 1, 2]);

		subscribers.lock().clear();
		assert!(subscribers.lock().is_empty());
		notify(&subscribers);
		assert_eq!(seen.lock().len(), 6);
	}
}
