/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! This module contains [`TaskLocks`], the per-task mutual exclusion shared by cron fires, manual triggers and deletions

use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::TaskId;

/// One async lock per task ID.
///
/// Every run of a task holds its lock from the moment its status is read
/// until the final status has been written, so two runs of the same task never interleave
/// their status updates. Runs of different tasks don't block each other.
#[derive(Clone, Default, Debug)]
pub struct TaskLocks(Arc<Mutex<HashMap<TaskId, Arc<AsyncMutex<()>>>>>);

impl TaskLocks {
	/// Creates an empty set of locks
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Waits until no one else holds the lock of `task_id` and takes it
	pub async fn lock(&self, task_id: TaskId) -> OwnedMutexGuard<()> {
		let lock = Arc::clone(self.0.lock().entry(task_id).or_default());

		lock.lock_owned().await
	}

	/// Drops the lock of a task that doesn't exist anymore.
	///
	/// Anyone still holding or waiting on it keeps their own handle.
	pub fn forget(&self, task_id: TaskId) {
		self.0.lock().remove(&task_id);
	}

	#[cfg(test)]
	pub(crate) fn len(&self) -> usize {
		self.0.lock().len()
	}
}

#[cfg(test)]
mod tests {
	use tokio_test::{assert_pending, assert_ready, task};

	use super::TaskLocks;
	use crate::task::TaskId;

	#[tokio::test]
	async fn same_task_waits_other_task_doesnt() {
		let locks = TaskLocks::new();
		let first = TaskId::new_random();
		let second = TaskId::new_random();

		let guard = locks.lock(first).await;

		let mut same = task::spawn(locks.lock(first));
		assert_pending!(same.poll());

		let mut other = task::spawn(locks.lock(second));
		assert_ready!(other.poll());

		drop(guard);
		assert!(same.is_woken(), "waiter should be woken up on unlock");
		assert_ready!(same.poll());
	}

	#[tokio::test]
	async fn forget_starts_over_with_a_fresh_lock() {
		let locks = TaskLocks::new();
		let id = TaskId::new_random();

		let guard = locks.lock(id).await;
		locks.forget(id);

		// a fresh lock, not the one still held
		let mut fresh = task::spawn(locks.lock(id));
		assert_ready!(fresh.poll());

		drop(guard);
	}
}
