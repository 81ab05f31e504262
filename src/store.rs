/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! This module contains the [`Store`] trait that implementors can use to persist tasks and their extracted data,
//! and [`MemoryStore`], an in-process implementation of it

pub mod memory;

pub use self::memory::MemoryStore;

use std::{error::Error as StdError, fmt::Debug};

use crate::{
	data_entry::{DataEntry, DataEntryId, Page},
	task::{OwnerId, Task, TaskId},
};

/// Selects which tasks [`Store::list_tasks`] returns
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TaskFilter {
	/// Tasks with status [`SCHEDULED`](`crate::TaskStatus::Scheduled`) and a cron expression,
	/// i.e. the ones that should have an armed timer
	Armable,

	/// All tasks of a user
	Owner(OwnerId),
}

/// A key-value store of tasks and the data entries they produced, keyed by task ID.
///
/// Every method is a single, independent operation. No transactions span several calls.
pub trait Store: Debug + Send + Sync + 'static {
	/// Returns the task with the ID `id` if it exists
	fn load_task(
		&self,
		id: TaskId,
	) -> impl Future<Output = Result<Option<Task>, StoreError>> + Send;

	/// Inserts or replaces a task and returns the value that was persisted
	fn save_task(&self, task: Task) -> impl Future<Output = Result<Task, StoreError>> + Send;

	/// Returns all tasks matching `filter`
	fn list_tasks(
		&self,
		filter: TaskFilter,
	) -> impl Future<Output = Result<Vec<Task>, StoreError>> + Send;

	/// Removes a task. Removing a task that doesn't exist is not an error
	fn delete_task(&self, id: TaskId) -> impl Future<Output = Result<(), StoreError>> + Send;

	/// Removes all data entries of a task and returns how many there were
	fn delete_data_entries(
		&self,
		task_id: TaskId,
	) -> impl Future<Output = Result<usize, StoreError>> + Send;

	/// Persists a new data entry
	fn insert_data_entry(
		&self,
		entry: DataEntry,
	) -> impl Future<Output = Result<DataEntryId, StoreError>> + Send;

	/// Returns the zero-based page `page` of the data entries of a task, oldest first
	fn list_data_entries(
		&self,
		task_id: TaskId,
		page: usize,
		page_size: usize,
	) -> impl Future<Output = Result<Page<DataEntry>, StoreError>> + Send;
}

/// The underlying storage failed
#[derive(thiserror::Error, Debug)]
#[error("Storage failed to {action}")]
pub struct StoreError {
	/// What was being done, e.g. "save task 1234"
	pub action: String,

	/// The underlying error
	#[source]
	pub source: Option<Box<dyn StdError + Send + Sync>>,
}

impl StoreError {
	/// Creates a new [`StoreError`] that happened while doing `action`, caused by `source`
	pub fn new(action: impl Into<String>, source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
		Self {
			action: action.into(),
			source: Some(source.into()),
		}
	}
}
