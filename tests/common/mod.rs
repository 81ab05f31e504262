/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Helpers shared by the integration tests

#![allow(dead_code, clippy::unwrap_used)]

use std::sync::{
	Arc,
	atomic::{AtomicBool, AtomicUsize, Ordering},
};

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use harvester::{
	Config, Harvester, TaskStatus,
	clock::Clock,
	data_entry::{DataEntry, DataEntryId, Page},
	scrape::{FetchError, Record, Scrape},
	store::{MemoryStore, Store, StoreError, TaskFilter},
	task::{FieldRule, OwnerId, Task, TaskDefinition, TaskId},
};
use parking_lot::Mutex;
use tokio::sync::Notify;
use url::Url;

pub const OWNER: OwnerId = OwnerId(7);

/// 2024-05-01 11:00:00 UTC, an hour before noon
pub fn morning() -> DateTime<Utc> {
	Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap()
}

pub fn noon() -> DateTime<Utc> {
	Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

/// A clock that follows tokio's clock, including when it's paused and auto-advanced in tests
#[derive(Debug)]
pub struct TokioClock {
	origin: DateTime<Utc>,
	start: tokio::time::Instant,
}

impl TokioClock {
	pub fn starting_at(origin: DateTime<Utc>) -> Self {
		Self {
			origin,
			start: tokio::time::Instant::now(),
		}
	}
}

impl Clock for TokioClock {
	fn now(&self) -> DateTime<Utc> {
		self.origin + TimeDelta::from_std(self.start.elapsed()).unwrap()
	}
}

/// Returns one record per call with every field set to "<field name> value". Can be told to fail
/// or to wait for a go-ahead before returning
#[derive(Clone, Default, Debug)]
pub struct FakeScraper {
	calls: Arc<AtomicUsize>,
	fail: Arc<AtomicBool>,
	gate: Arc<Mutex<Option<Arc<Notify>>>>,
}

impl FakeScraper {
	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	pub fn set_failing(&self, fail: bool) {
		self.fail.store(fail, Ordering::SeqCst);
	}

	/// From now on every call waits inside the scraper until the returned [`Notify`] lets one through
	pub fn hold(&self) -> Arc<Notify> {
		let gate = Arc::new(Notify::new());
		*self.gate.lock() = Some(Arc::clone(&gate));

		gate
	}
}

impl Scrape for FakeScraper {
	async fn scrape(
		&self,
		url: &Url,
		rules: &[FieldRule],
		_item_selector: Option<&str>,
	) -> Result<Vec<Record>, FetchError> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let gate = self.gate.lock().clone();
		if let Some(gate) = gate {
			gate.notified().await;
		}

		if self.fail.load(Ordering::SeqCst) {
			return Err(FetchError::BadStatus {
				url: url.to_string(),
				status: 503,
			});
		}

		Ok(vec![
			rules
				.iter()
				.map(|rule| (rule.field_name.clone(), format!("{} value", rule.field_name)))
				.collect(),
		])
	}
}

/// A [`MemoryStore`] that remembers every status a task has been saved with
#[derive(Default, Debug)]
pub struct RecordingStore {
	inner: MemoryStore,
	saved_statuses: Mutex<Vec<(TaskId, TaskStatus)>>,
	yield_on_save: bool,
}

impl RecordingStore {
	/// Gives other tasks a chance to run in the middle of every save, like a real database would
	pub fn yielding() -> Self {
		Self {
			yield_on_save: true,
			..Self::default()
		}
	}

	pub fn saved_statuses(&self, id: TaskId) -> Vec<TaskStatus> {
		self.saved_statuses
			.lock()
			.iter()
			.filter(|(task_id, _)| *task_id == id)
			.map(|(_, status)| *status)
			.collect()
	}

	pub fn data_entry_count(&self, id: TaskId) -> usize {
		self.inner.data_entry_count(id)
	}
}

impl Store for RecordingStore {
	async fn load_task(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
		self.inner.load_task(id).await
	}

	async fn save_task(&self, task: Task) -> Result<Task, StoreError> {
		if self.yield_on_save {
			tokio::task::yield_now().await;
		}

		self.saved_statuses.lock().push((task.id, task.status));
		self.inner.save_task(task).await
	}

	async fn list_tasks(&self, filter: TaskFilter) -> Result<Vec<Task>, StoreError> {
		self.inner.list_tasks(filter).await
	}

	async fn delete_task(&self, id: TaskId) -> Result<(), StoreError> {
		self.inner.delete_task(id).await
	}

	async fn delete_data_entries(&self, task_id: TaskId) -> Result<usize, StoreError> {
		self.inner.delete_data_entries(task_id).await
	}

	async fn insert_data_entry(&self, entry: DataEntry) -> Result<DataEntryId, StoreError> {
		self.inner.insert_data_entry(entry).await
	}

	async fn list_data_entries(
		&self,
		task_id: TaskId,
		page: usize,
		page_size: usize,
	) -> Result<Page<DataEntry>, StoreError> {
		self.inner.list_data_entries(task_id, page, page_size).await
	}
}

pub type TestHarvester = Harvester<RecordingStore, FakeScraper>;

/// A harvester with a fake scraper whose clock starts at [`morning`] and follows tokio's clock
pub fn harvester() -> (TestHarvester, FakeScraper) {
	harvester_with_store(RecordingStore::default())
}

pub fn harvester_with_store(store: RecordingStore) -> (TestHarvester, FakeScraper) {
	let scraper = FakeScraper::default();
	let harvester = Harvester::with_scraper(
		store,
		scraper.clone(),
		Arc::new(TokioClock::starting_at(morning())),
		&Config::default(),
	);

	(harvester, scraper)
}

/// A task definition with a single rule
pub fn definition(cron: Option<&str>) -> TaskDefinition {
	TaskDefinition::builder()
		.name("front page")
		.target_url("https://example.com/")
		.rules(vec![FieldRule::text("title", "h1")])
		.maybe_cron_expression(cron)
		.build()
}
