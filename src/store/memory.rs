/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::collections::HashMap;

use parking_lot::RwLock;

use super::{Store, StoreError, TaskFilter};
use crate::{
	data_entry::{DataEntry, DataEntryId, Page},
	task::{Task, TaskId},
};

/// A [`Store`] that keeps everything in memory. Nothing survives a restart
#[derive(Default, Debug)]
pub struct MemoryStore {
	tasks: RwLock<HashMap<TaskId, Task>>,

	// insertion ordered
	entries: RwLock<HashMap<TaskId, Vec<DataEntry>>>,
}

impl MemoryStore {
	/// Creates an empty store
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Amount of data entries stored for `task_id`
	#[must_use]
	pub fn data_entry_count(&self, task_id: TaskId) -> usize {
		self.entries.read().get(&task_id).map_or(0, Vec::len)
	}
}

impl Store for MemoryStore {
	async fn load_task(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
		Ok(self.tasks.read().get(&id).cloned())
	}

	async fn save_task(&self, task: Task) -> Result<Task, StoreError> {
		self.tasks.write().insert(task.id, task.clone());
		Ok(task)
	}

	async fn list_tasks(&self, filter: TaskFilter) -> Result<Vec<Task>, StoreError> {
		let mut tasks = self
			.tasks
			.read()
			.values()
			.filter(|task| match filter {
				TaskFilter::Armable => task.is_armable(),
				TaskFilter::Owner(owner) => task.owner == owner,
			})
			.cloned()
			.collect::<Vec<_>>();

		// HashMap order is random, keep listings stable
		tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

		Ok(tasks)
	}

	async fn delete_task(&self, id: TaskId) -> Result<(), StoreError> {
		self.tasks.write().remove(&id);
		Ok(())
	}

	async fn delete_data_entries(&self, task_id: TaskId) -> Result<usize, StoreError> {
		Ok(self
			.entries
			.write()
			.remove(&task_id)
			.map_or(0, |entries| entries.len()))
	}

	async fn insert_data_entry(&self, entry: DataEntry) -> Result<DataEntryId, StoreError> {
		let id = entry.id;
		self.entries
			.write()
			.entry(entry.task_id)
			.or_default()
			.push(entry);

		Ok(id)
	}

	async fn list_data_entries(
		&self,
		task_id: TaskId,
		page: usize,
		page_size: usize,
	) -> Result<Page<DataEntry>, StoreError> {
		let entries = self.entries.read();
		let all = entries.get(&task_id).map_or(&[][..], Vec::as_slice);

		Ok(Page::slice(all, page, page_size))
	}
}
