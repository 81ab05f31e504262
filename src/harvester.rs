/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! This module contains [`Harvester`], the scraping engine with all of its parts wired together

use std::sync::Arc;

use crate::{
	Config,
	clock::{Clock, SystemClock},
	executor::Executor,
	scheduler::Scheduler,
	scrape::{FetchError, HtmlScraper, Scrape},
	service::TaskService,
	store::{Store, StoreError},
	task::TaskLocks,
};

/// The scraping engine: a [`TaskService`] and the [`Scheduler`] it drives, sharing a single store.
///
/// Call [`Harvester::start`] once after creating it to re-arm the tasks stored before the last shutdown.
#[derive(Debug)]
pub struct Harvester<S, X = HtmlScraper> {
	store: Arc<S>,
	service: TaskService<S, X>,
	scheduler: Scheduler<S, X>,
}

impl<S: Store> Harvester<S> {
	/// Creates a new [`Harvester`] that fetches static HTML pages over HTTP
	///
	/// # Errors
	/// if the HTTP client couldn't be initialized
	pub fn new(store: S, config: &Config) -> Result<Self, FetchError> {
		let scraper = HtmlScraper::new(config)?;

		Ok(Self::with_scraper(
			store,
			scraper,
			Arc::new(SystemClock),
			config,
		))
	}
}

impl<S: Store, X: Scrape> Harvester<S, X> {
	/// Creates a new [`Harvester`] with a custom way to scrape pages and to tell the time
	#[must_use]
	pub fn with_scraper(store: S, scraper: X, clock: Arc<dyn Clock>, config: &Config) -> Self {
		let store = Arc::new(store);
		let executor = Executor::new(
			Arc::clone(&store),
			Arc::new(scraper),
			clock,
			config.max_concurrent_runs,
		);

		let locks = TaskLocks::new();
		let scheduler = Scheduler::new(executor.clone(), locks.clone(), config.timezone);
		let service = TaskService::new(executor, scheduler.clone(), locks);

		Self {
			store,
			service,
			scheduler,
		}
	}

	/// Re-arms every stored task that should be scheduled. Returns how many were armed
	///
	/// # Errors
	/// if the tasks couldn't be read from the store
	pub async fn start(&self) -> Result<usize, StoreError> {
		self.scheduler.recover_on_startup().await
	}

	/// Cancels all timers. Runs already in progress are not waited for
	pub fn shutdown(&self) {
		self.scheduler.shutdown();
	}

	/// Create, change, delete and run tasks
	#[must_use]
	pub fn tasks(&self) -> &TaskService<S, X> {
		&self.service
	}

	/// The store tasks and data entries are kept in
	#[must_use]
	pub fn store(&self) -> &S {
		&self.store
	}

	/// The scheduler timers are armed in
	#[must_use]
	pub fn scheduler(&self) -> &Scheduler<S, X> {
		&self.scheduler
	}
}
