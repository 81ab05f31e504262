/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! This module contains the [`Executor`] that runs a single extraction pass of a [`Task`] and persists its results

use std::{any::Any, sync::Arc};

use tokio::sync::Semaphore;

use crate::{
	Task,
	clock::Clock,
	data_entry::{DataEntry, DataEntryId},
	error::Error,
	scrape::Scrape,
	store::Store,
};

/// Runs extraction passes. Doesn't touch the status of the task, that's up to the caller.
///
/// At most `max_concurrent_runs` passes (see [`Config`](`crate::Config`)) are scraping at the same time
/// across every clone of the executor. The rest wait for their turn.
#[derive(Debug)]
pub struct Executor<S, X> {
	store: Arc<S>,
	scraper: Arc<X>,
	clock: Arc<dyn Clock>,
	permits: Arc<Semaphore>,
}

impl<S: Store, X: Scrape> Executor<S, X> {
	/// Creates a new [`Executor`] that lets at most `max_concurrent_runs` passes scrape at once
	#[must_use]
	pub fn new(
		store: Arc<S>,
		scraper: Arc<X>,
		clock: Arc<dyn Clock>,
		max_concurrent_runs: usize,
	) -> Self {
		Self {
			store,
			scraper,
			clock,
			// zero permits would block every run forever
			permits: Arc::new(Semaphore::new(max_concurrent_runs.max(1))),
		}
	}

	/// Fetches the target page of `task`, extracts records using its rules and stores each one as a [`DataEntry`].
	///
	/// Does nothing if the task has no rules.
	/// All entries of a pass share the same capture time.
	///
	/// # Errors
	/// * [`Error::Fetch`] if the page couldn't be fetched or extracted from. Nothing is stored in that case
	/// * [`Error::Persistence`] if an entry couldn't be stored. Entries stored before that one stay
	#[tracing::instrument(skip_all, fields(task = %task.id, name = %task.name))]
	pub async fn execute(&self, task: &Task) -> Result<Vec<DataEntryId>, Error> {
		if task.rules.is_empty() {
			tracing::warn!("Task has no rules, nothing to extract");
			return Ok(Vec::new());
		}

		let records = {
			// never closed
			let _permit = self.permits.acquire().await.ok();

			self.scraper
				.scrape(&task.target_url, &task.rules, task.item_selector.as_deref())
				.await?
		};

		let captured_at = self.clock.now();
		let mut ids = Vec::with_capacity(records.len());

		for record in records {
			let entry = DataEntry::new(task.id, record, task.target_url.clone(), captured_at);
			ids.push(self.store.insert_data_entry(entry).await?);
		}

		tracing::debug!("Stored {} data entries", ids.len());
		Ok(ids)
	}

	/// The store the executor writes data entries into
	#[must_use]
	pub fn store(&self) -> &Arc<S> {
		&self.store
	}

	/// The clock used for capture times
	#[must_use]
	pub fn clock(&self) -> &Arc<dyn Clock> {
		&self.clock
	}
}

/// Extracts the message out of the payload of a caught panic, if it has one
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
	payload
		.downcast_ref::<&str>()
		.copied()
		.or_else(|| payload.downcast_ref::<String>().map(String::as_str))
		.unwrap_or("unknown panic payload")
}

impl<S, X> Clone for Executor<S, X> {
	fn clone(&self) -> Self {
		Self {
			store: Arc::clone(&self.store),
			scraper: Arc::clone(&self.scraper),
			clock: Arc::clone(&self.clock),
			permits: Arc::clone(&self.permits),
		}
	}
}
