/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! This module contains [`DataEntry`], a single record extracted during a run of a [`Task`](`crate::Task`),
//! and [`Page`] used to list them

use std::fmt::{self, Display};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::{scrape::Record, task::TaskId};

/// Unique identifier of a [`DataEntry`]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataEntryId(pub Uuid);

/// One extracted record. Never changes after it has been created
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct DataEntry {
	/// Unique identifier of the entry
	pub id: DataEntryId,

	/// The task that produced this entry
	pub task_id: TaskId,

	/// Field name to extracted value. A value is an empty string if the field couldn't be found for this record
	pub data: Record,

	/// When the record was captured
	pub captured_at: DateTime<Utc>,

	/// The URL of the task at capture time
	pub source_url: Url,
}

/// A single page of a larger list
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Page<T> {
	/// Items on this page
	pub items: Vec<T>,

	/// Zero-based index of this page
	pub page: usize,

	/// Maximum amount of items on a page
	pub page_size: usize,

	/// Amount of items on all pages
	pub total: usize,
}

impl DataEntryId {
	/// Generates a new random ID
	#[must_use]
	pub fn new_random() -> Self {
		Self(Uuid::new_v4())
	}
}

impl Display for DataEntryId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		Display::fmt(&self.0, f)
	}
}

impl DataEntry {
	/// Creates a new entry for `task_id` captured from `source_url` at `captured_at`
	#[must_use]
	pub fn new(task_id: TaskId, data: Record, source_url: Url, captured_at: DateTime<Utc>) -> Self {
		Self {
			id: DataEntryId::new_random(),
			task_id,
			data,
			captured_at,
			source_url,
		}
	}
}

impl<T> Page<T> {
	/// Cuts page number `page` out of `all`
	#[must_use]
	pub fn slice(all: &[T], page: usize, page_size: usize) -> Self
	where
		T: Clone,
	{
		let start = page.saturating_mul(page_size).min(all.len());
		let end = start.saturating_add(page_size).min(all.len());

		Self {
			items: all[start..end].to_vec(),
			page,
			page_size,
			total: all.len(),
		}
	}

	/// Amount of pages needed to show all items
	#[must_use]
	pub fn page_count(&self) -> usize {
		if self.page_size == 0 {
			return 0;
		}

		self.total.div_ceil(self.page_size)
	}
}
