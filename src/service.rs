/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! This module contains the [`TaskService`], the entry point for everything a user can do with their tasks

use std::panic::{self, AssertUnwindSafe};

use chrono::{DateTime, Utc};
use futures::FutureExt;

use crate::{
	data_entry::{DataEntry, Page},
	error::{Error, ErrorChainDisplay},
	executor::{Executor, panic_message},
	scheduler::Scheduler,
	scrape::Scrape,
	store::{Store, TaskFilter},
	task::{
		OwnerId, Task, TaskDefinition, TaskId, TaskLocks, TaskPatch, TaskStatus, ValidationError,
		validation,
	},
};

/// Creates, changes, deletes and manually runs tasks, keeping the [`Scheduler`] in sync with them.
///
/// Every operation is scoped to an owner. Tasks of other owners are reported as [`Error::NotFound`].
#[derive(Debug)]
pub struct TaskService<S, X> {
	executor: Executor<S, X>,
	scheduler: Scheduler<S, X>,
	locks: TaskLocks,
}

impl<S: Store, X: Scrape> TaskService<S, X> {
	/// Creates a new [`TaskService`].
	///
	/// `locks` must be the same ones `scheduler` uses.
	#[must_use]
	pub fn new(executor: Executor<S, X>, scheduler: Scheduler<S, X>, locks: TaskLocks) -> Self {
		Self {
			executor,
			scheduler,
			locks,
		}
	}

	/// Creates and stores a new task.
	///
	/// A task with a cron expression starts out [`SCHEDULED`](`TaskStatus::Scheduled`) and gets armed right away,
	/// one without stays [`PENDING`](`TaskStatus::Pending`).
	///
	/// # Errors
	/// * [`Error::Validation`] if the definition is invalid
	/// * [`Error::Persistence`] if the task couldn't be stored
	#[tracing::instrument(skip(self, definition), fields(name = %definition.name))]
	pub async fn create_task(
		&self,
		definition: TaskDefinition,
		owner: OwnerId,
	) -> Result<Task, Error> {
		let mut task = Task::new(definition, owner, self.now())?;
		if task.has_cron() {
			task.status = TaskStatus::Scheduled;
		}

		let task = self.store().save_task(task).await?;
		self.scheduler.arm(&task)?;

		tracing::info!("Created task {} with status {}", task.id, task.status);
		Ok(task)
	}

	/// Returns the task with the ID `id`
	///
	/// # Errors
	/// * [`Error::NotFound`] if it doesn't exist or belongs to someone else
	/// * [`Error::Persistence`] if it couldn't be read
	pub async fn get_task(&self, id: TaskId, owner: OwnerId) -> Result<Task, Error> {
		self.load_owned(id, owner).await
	}

	/// Returns all tasks of `owner`, oldest first
	///
	/// # Errors
	/// if the tasks couldn't be read
	pub async fn list_tasks(&self, owner: OwnerId) -> Result<Vec<Task>, Error> {
		Ok(self.store().list_tasks(TaskFilter::Owner(owner)).await?)
	}

	/// Changes a task.
	///
	/// Changing the cron expression makes the task [`SCHEDULED`](`TaskStatus::Scheduled`) and re-arms it,
	/// removing it (with a blank string) makes the task [`PENDING`](`TaskStatus::Pending`) and disarms it.
	/// An explicitly requested status is applied after that and wins. Pausing a task
	/// ([`STOPPED`](`TaskStatus::Stopped`), [`DISABLED`](`TaskStatus::Disabled`)) disarms it,
	/// requesting [`SCHEDULED`](`TaskStatus::Scheduled`) arms it.
	///
	/// Nothing is changed if any part of the patch is invalid.
	///
	/// # Errors
	/// * [`Error::NotFound`] if the task doesn't exist or belongs to someone else
	/// * [`Error::Validation`] if a new value is invalid, the requested status can't be requested,
	///   or the task would end up [`SCHEDULED`](`TaskStatus::Scheduled`) without a cron expression
	/// * [`Error::Persistence`] if the task couldn't be read or stored
	#[tracing::instrument(skip(self, patch, owner))]
	pub async fn update_task(
		&self,
		id: TaskId,
		patch: TaskPatch,
		owner: OwnerId,
	) -> Result<Task, Error> {
		// don't change a task in the middle of a run
		let lock = self.locks.lock(id).await;
		let mut task = self.load_owned(id, owner).await?;

		let new_cron = patch
			.cron_expression
			.clone()
			.map(|expression| validation::normalize_blank(Some(expression)));

		if let Some(new_cron) = &new_cron {
			validation::validate_cron(new_cron.as_deref())?;
		}

		if let Some(status) = patch.status.filter(|status| !status.is_user_settable()) {
			return Err(ValidationError::StatusNotSettable(status).into());
		}

		let mut updated = task.clone();
		updated.apply_fields(&patch)?;

		if let Some(new_cron) = new_cron.filter(|new_cron| *new_cron != updated.cron_expression) {
			updated.status = if new_cron.is_some() {
				TaskStatus::Scheduled
			} else {
				TaskStatus::Pending
			};
			updated.cron_expression = new_cron;
		}

		if let Some(status) = patch.status {
			updated.status = status;
		}

		if updated.status == TaskStatus::Scheduled && !updated.has_cron() {
			return Err(ValidationError::ScheduledWithoutCron.into());
		}

		if updated.status != task.status {
			tracing::info!("Task status changed from {} to {}", task.status, updated.status);
		}

		updated.updated_at = self.now();
		task = self.store().save_task(updated).await?;

		// still under the lock, so the timer always matches the latest saved task
		if task.is_armable() {
			// keep the timer if it's already running on the same schedule
			if self.scheduler.armed_cron(task.id).as_deref() != task.cron_expression.as_deref() {
				self.scheduler.arm(&task)?;
			}
		} else if !task.has_cron() || !task.status.is_fireable() {
			self.scheduler.disarm(task.id);
		}

		drop(lock);
		Ok(task)
	}

	/// Deletes a task together with all of its data entries.
	///
	/// A run or an update already in progress is waited for. Then the task is disarmed
	/// before anything is removed.
	///
	/// # Errors
	/// * [`Error::NotFound`] if the task doesn't exist or belongs to someone else
	/// * [`Error::Persistence`] if the task or its entries couldn't be deleted
	#[tracing::instrument(skip(self, owner))]
	pub async fn delete_task(&self, id: TaskId, owner: OwnerId) -> Result<(), Error> {
		let lock = self.locks.lock(id).await;
		self.load_owned(id, owner).await?;
		self.scheduler.disarm(id);

		let removed = self.store().delete_data_entries(id).await?;
		self.store().delete_task(id).await?;
		drop(lock);

		self.locks.forget(id);

		tracing::info!("Deleted task along with {removed} data entries");
		Ok(())
	}

	/// Runs a task right now and waits for the run to finish.
	///
	/// The task is [`RUNNING`](`TaskStatus::Running`) for the duration of the run.
	/// On success it goes back to the status it had before, whatever that was. Its timer isn't touched.
	///
	/// # Errors
	/// * [`Error::NotFound`] if the task doesn't exist or belongs to someone else
	/// * [`Error::Fetch`] if the page couldn't be fetched or extracted from.
	///   The task is marked [`FAILED`](`TaskStatus::Failed`) first
	/// * [`Error::Persistence`] if the task or its data entries couldn't be stored
	///
	/// # Panics
	/// if the extraction panics. The task is marked [`FAILED`](`TaskStatus::Failed`) first
	#[tracing::instrument(skip(self, owner))]
	pub async fn trigger_task(&self, id: TaskId, owner: OwnerId) -> Result<Task, Error> {
		let _lock = self.locks.lock(id).await;
		let mut task = self.load_owned(id, owner).await?;

		let original_status = match task.status {
			// left over from a run that never finished
			TaskStatus::Running if task.has_cron() => TaskStatus::Scheduled,
			TaskStatus::Running => TaskStatus::Pending,
			status => status,
		};

		task.mark_running("Manually triggered execution started...", self.now());
		let mut task = self.store().save_task(task).await?;

		tracing::info!("Manually running task {:?}", task.name);
		let result = AssertUnwindSafe(self.executor.execute(&task))
			.catch_unwind()
			.await;

		let now = self.now();
		match result {
			Ok(Ok(entries)) => {
				tracing::info!("Task {:?} stored {} data entries", task.name, entries.len());
				task.mark_succeeded(
					original_status,
					format!("Manually triggered execution completed successfully at {now}"),
					now,
				);

				Ok(self.store().save_task(task).await?)
			}
			Ok(Err(e)) => {
				tracing::warn!("Task {:?} failed: {}", task.name, ErrorChainDisplay(&e));
				task.mark_failed(format!("Manual execution failed: {}", e.chain_message()), now);
				self.save_failed(task).await;

				Err(e)
			}
			Err(payload) => {
				let msg = panic_message(&*payload);
				tracing::error!("Task {:?} panicked: {msg}", task.name);
				task.mark_failed(format!("Manual execution failed: panicked: {msg}"), now);
				self.save_failed(task).await;

				panic::resume_unwind(payload)
			}
		}
	}

	/// Returns the zero-based page `page` of the data entries of a task, oldest first
	///
	/// # Errors
	/// * [`Error::NotFound`] if the task doesn't exist or belongs to someone else
	/// * [`Error::Validation`] if `page_size` is zero
	/// * [`Error::Persistence`] if the entries couldn't be read
	pub async fn list_data_entries(
		&self,
		task_id: TaskId,
		owner: OwnerId,
		page: usize,
		page_size: usize,
	) -> Result<Page<DataEntry>, Error> {
		if page_size == 0 {
			return Err(ValidationError::ZeroPageSize.into());
		}

		self.load_owned(task_id, owner).await?;

		Ok(self
			.store()
			.list_data_entries(task_id, page, page_size)
			.await?)
	}

	async fn load_owned(&self, id: TaskId, owner: OwnerId) -> Result<Task, Error> {
		self.store()
			.load_task(id)
			.await?
			.filter(|task| task.owner == owner)
			.ok_or(Error::NotFound(id))
	}

	/// Stores a task that has just failed. The run's own error is more important than this one
	async fn save_failed(&self, task: Task) {
		if let Err(e) = self.store().save_task(task).await {
			tracing::error!("Failed to save the failed status: {}", ErrorChainDisplay(&e));
		}
	}

	fn store(&self) -> &S {
		self.executor.store()
	}

	fn now(&self) -> DateTime<Utc> {
		self.executor.clock().now()
	}
}

impl<S, X> Clone for TaskService<S, X> {
	fn clone(&self) -> Self {
		Self {
			executor: self.executor.clone(),
			scheduler: self.scheduler.clone(),
			locks: self.locks.clone(),
		}
	}
}
