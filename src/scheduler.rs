/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! This module contains the [`Scheduler`] that keeps one cancellable cron timer per scheduled task
//! and runs the task at each occurrence

pub mod cron;

pub use self::cron::CronSchedule;

use std::{
	collections::HashMap,
	panic::AssertUnwindSafe,
	sync::{
		Arc, Weak,
		atomic::{AtomicBool, AtomicU64, Ordering},
	},
};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::{
	cancellation_token::{CancelHandle, CancellationToken},
	clock::Clock,
	error::ErrorChainDisplay,
	executor::{Executor, panic_message},
	scrape::Scrape,
	store::{Store, StoreError, TaskFilter},
	task::{Task, TaskId, TaskLocks, TaskStatus, ValidationError},
};

/// Owns the armed timers of all scheduled tasks.
///
/// A task is armed if it has the status [`SCHEDULED`](`TaskStatus::Scheduled`) and a cron expression.
/// Every armed task has exactly one timer that sleeps until the next occurrence of its cron expression,
/// runs the task and goes back to sleep. The scheduler only knows task IDs, the task itself is re-read
/// from the store at every occurrence.
///
/// Cloning is cheap, all clones share the same timers.
#[derive(Debug)]
pub struct Scheduler<S, X> {
	inner: Arc<Inner<S, X>>,
}

#[derive(Debug)]
struct Inner<S, X> {
	executor: Executor<S, X>,
	locks: TaskLocks,
	timezone: Tz,
	timers: Mutex<HashMap<TaskId, Registration>>,
	next_generation: AtomicU64,
	is_shut_down: AtomicBool,
}

/// An armed timer
#[derive(Debug)]
struct Registration {
	/// Tells apart the registrations of the same task. A timer may only ever remove its own registration
	generation: u64,
	schedule: CronSchedule,
	cancel: CancelHandle,

	// detached, dropping it doesn't stop the timer
	_handle: JoinHandle<()>,
}

impl<S: Store, X: Scrape> Scheduler<S, X> {
	/// Creates a new [`Scheduler`] with no timers armed.
	///
	/// `locks` must be shared with everything else that runs or modifies tasks.
	/// Cron expressions are evaluated in `timezone`.
	#[must_use]
	pub fn new(executor: Executor<S, X>, locks: TaskLocks, timezone: Tz) -> Self {
		Self {
			inner: Arc::new(Inner {
				executor,
				locks,
				timezone,
				timers: Mutex::new(HashMap::new()),
				next_generation: AtomicU64::new(0),
				is_shut_down: AtomicBool::new(false),
			}),
		}
	}

	/// Arms a timer for `task`, replacing the one it already has, if any.
	///
	/// If the task isn't [`SCHEDULED`](`TaskStatus::Scheduled`) or has no cron expression, this disarms it instead.
	/// Does nothing after [`Scheduler::shutdown`].
	///
	/// # Errors
	/// if the cron expression of the task is invalid. The current timer, if any, is kept in that case
	///
	/// # Panics
	/// if called outside of a tokio runtime
	pub fn arm(&self, task: &Task) -> Result<(), ValidationError> {
		let expression = match &task.cron_expression {
			Some(expression) if task.status == TaskStatus::Scheduled => expression,
			_ => {
				tracing::debug!(
					"Task {} is {} with cron {:?}, not arming",
					task.id,
					task.status,
					task.cron_expression
				);
				self.disarm(task.id);
				return Ok(());
			}
		};

		if self.inner.is_shut_down.load(Ordering::Acquire) {
			tracing::warn!("Scheduler has been shut down, not arming task {}", task.id);
			return Ok(());
		}

		let schedule = CronSchedule::parse(expression, self.inner.timezone)?;
		let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
		let (token, cancel) = CancellationToken::new();

		let handle = tokio::spawn(run_timer(
			Arc::downgrade(&self.inner),
			Arc::clone(self.inner.executor.clock()),
			task.id,
			generation,
			schedule.clone(),
			token,
		));

		let previous = self.inner.timers.lock().insert(
			task.id,
			Registration {
				generation,
				schedule,
				cancel,
				_handle: handle,
			},
		);

		if let Some(previous) = previous {
			previous.cancel.cancel();
			tracing::info!("Re-armed task {} with cron {expression:?}", task.id);
		} else {
			tracing::info!("Armed task {} with cron {expression:?}", task.id);
		}

		Ok(())
	}

	/// Cancels the timer of the task with the ID `task_id`, if it has one.
	///
	/// A run that has already started is not interrupted.
	pub fn disarm(&self, task_id: TaskId) {
		if self.inner.remove_registration(task_id, None) {
			tracing::info!("Disarmed task {task_id}");
		}
	}

	/// Runs the task with the ID `task_id` the way its timer would at an occurrence.
	///
	/// The task is disarmed instead of run if it doesn't exist anymore
	/// or its status isn't one that runs on a schedule (see [`TaskStatus::is_fireable`]).
	/// Otherwise it becomes [`RUNNING`](`TaskStatus::Running`) for the duration of the run and ends up
	/// either [`SCHEDULED`](`TaskStatus::Scheduled`) or [`FAILED`](`TaskStatus::Failed`).
	/// Failures are only recorded on the task and logged, never returned.
	pub async fn fire(&self, task_id: TaskId) {
		self.inner.fire(task_id, None).await;
	}

	/// Arms every stored task that should have a timer. Returns how many were armed.
	///
	/// Tasks with an invalid cron expression are logged and skipped.
	///
	/// # Errors
	/// if the tasks couldn't be listed
	#[tracing::instrument(skip_all)]
	pub async fn recover_on_startup(&self) -> Result<usize, StoreError> {
		let tasks = self
			.inner
			.executor
			.store()
			.list_tasks(TaskFilter::Armable)
			.await?;

		let mut armed = 0;
		for task in &tasks {
			match self.arm(task) {
				Ok(()) => armed += 1,
				Err(e) => tracing::error!(
					"Not re-arming task {}: {}",
					task.id,
					ErrorChainDisplay(&e)
				),
			}
		}

		tracing::info!("Re-armed {armed} out of {} scheduled tasks", tasks.len());
		Ok(armed)
	}

	/// Cancels every timer without waiting for runs in progress to finish.
	///
	/// Nothing can be armed after this.
	pub fn shutdown(&self) {
		self.inner.is_shut_down.store(true, Ordering::Release);

		let timers = std::mem::take(&mut *self.inner.timers.lock());
		for registration in timers.values() {
			registration.cancel.cancel();
		}

		tracing::info!("Scheduler shut down, cancelled {} timers", timers.len());
	}

	/// Does the task with the ID `task_id` have a timer?
	#[must_use]
	pub fn is_armed(&self, task_id: TaskId) -> bool {
		self.inner.timers.lock().contains_key(&task_id)
	}

	/// Amount of armed timers
	#[must_use]
	pub fn armed_count(&self) -> usize {
		self.inner.timers.lock().len()
	}

	/// The cron expression the task with the ID `task_id` has been armed with
	#[must_use]
	pub fn armed_cron(&self, task_id: TaskId) -> Option<String> {
		self.inner
			.timers
			.lock()
			.get(&task_id)
			.map(|registration| registration.schedule.expression().to_owned())
	}
}

impl<S: Store, X: Scrape> Inner<S, X> {
	/// Removes the registration of `task_id` and cancels its timer.
	/// If `generation` is set, only if the registration is of that generation.
	///
	/// Returns whether a registration was removed
	fn remove_registration(&self, task_id: TaskId, generation: Option<u64>) -> bool {
		let mut timers = self.timers.lock();

		let is_match = timers.get(&task_id).is_some_and(|registration| {
			generation.is_none_or(|generation| generation == registration.generation)
		});

		if !is_match {
			return false;
		}

		if let Some(registration) = timers.remove(&task_id) {
			registration.cancel.cancel();
		}

		true
	}

	#[tracing::instrument(skip(self, generation))]
	async fn fire(&self, task_id: TaskId, generation: Option<u64>) {
		let lock = self.locks.lock(task_id).await;
		let store = self.executor.store();

		let mut task = match store.load_task(task_id).await {
			Ok(Some(task)) => task,
			Ok(None) => {
				tracing::info!("Task doesn't exist anymore, disarming");
				self.remove_registration(task_id, generation);

				drop(lock);
				self.locks.forget(task_id);
				return;
			}
			Err(e) => {
				tracing::error!("Skipping run: {}", ErrorChainDisplay(&e));
				return;
			}
		};

		if !task.status.is_fireable() {
			tracing::info!("Task is {}, disarming", task.status);
			self.remove_registration(task_id, generation);
			return;
		}

		task.mark_running("Running...", self.now());
		let mut task = match store.save_task(task).await {
			Ok(task) => task,
			Err(e) => {
				tracing::error!("Skipping run: {}", ErrorChainDisplay(&e));
				return;
			}
		};

		tracing::info!("Running task {:?}", task.name);
		let result = AssertUnwindSafe(self.executor.execute(&task))
			.catch_unwind()
			.await;

		let now = self.now();
		match result {
			Ok(Ok(entries)) => {
				tracing::info!("Task {:?} stored {} data entries", task.name, entries.len());
				task.mark_succeeded(
					TaskStatus::Scheduled,
					format!("Successfully completed at {now}"),
					now,
				);
			}
			Ok(Err(e)) => {
				tracing::warn!("Task {:?} failed: {}", task.name, ErrorChainDisplay(&e));
				task.mark_failed(format!("Failed: {}", e.chain_message()), now);
			}
			Err(payload) => {
				let msg = panic_message(&*payload);
				tracing::error!("Task {:?} panicked: {msg}", task.name);
				task.mark_failed(format!("Failed: panicked: {msg}"), now);
			}
		}

		if let Err(e) = store.save_task(task).await {
			tracing::error!("Failed to save the result of the run: {}", ErrorChainDisplay(&e));
		}
	}

	fn now(&self) -> DateTime<Utc> {
		self.executor.clock().now()
	}
}

/// Sleeps until each occurrence of `schedule` and fires the task, until cancelled
async fn run_timer<S: Store, X: Scrape>(
	inner: Weak<Inner<S, X>>,
	clock: Arc<dyn Clock>,
	task_id: TaskId,
	generation: u64,
	schedule: CronSchedule,
	mut cancel: CancellationToken,
) {
	let mut last_occurrence = None;

	loop {
		let now = clock.now();

		// skip the occurrences missed while the previous run was in progress
		let after = last_occurrence.map_or(now, |last: DateTime<Utc>| last.max(now));

		let Some(next) = schedule.next_after(after) else {
			tracing::warn!(
				"Cron expression {:?} of task {task_id} never fires again, disarming",
				schedule.expression()
			);

			if let Some(inner) = inner.upgrade() {
				inner.remove_registration(task_id, Some(generation));
			}

			return;
		};

		let wait = (next - now).to_std().unwrap_or_default();
		tracing::debug!(
			"Task {task_id} fires next at {next}, sleeping for {}s",
			wait.as_secs()
		);

		tokio::select! {
			biased;

			() = cancel.wait() => {
				tracing::trace!("Timer of task {task_id} has been cancelled");
				return;
			}
			() = tokio::time::sleep(wait) => (),
		}

		last_occurrence = Some(next);

		// the scheduler is gone
		let Some(inner) = inner.upgrade() else {
			return;
		};

		inner.fire(task_id, Some(generation)).await;
		drop(inner);

		if cancel.is_cancelled() {
			tracing::trace!("Timer of task {task_id} has been cancelled during a run");
			return;
		}
	}
}

impl<S, X> Clone for Scheduler<S, X> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}
