/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! This module contains [`Config`], the settings of a [`Harvester`](`crate::Harvester`)

use std::time::Duration;

use chrono_tz::Tz;
use serde::Deserialize;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_CONCURRENT_RUNS: usize = 8;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/109.0.0.0 Safari/537.36";
const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// Settings of the scraping engine.
///
/// Can be created with [`Config::builder()`] or deserialized, with every missing field taking its default value.
#[derive(bon::Builder, Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
	/// How long a single page fetch may take, in seconds
	#[builder(default = DEFAULT_REQUEST_TIMEOUT_SECS)]
	pub request_timeout_secs: u64,

	/// User-Agent header sent with every request
	#[builder(default = DEFAULT_USER_AGENT.to_owned(), into)]
	pub user_agent: String,

	/// Accept-Language header sent with every request
	#[builder(default = DEFAULT_ACCEPT_LANGUAGE.to_owned(), into)]
	pub accept_language: String,

	/// Maximum amount of extraction passes running at the same time, across all tasks
	#[builder(default = DEFAULT_MAX_CONCURRENT_RUNS)]
	pub max_concurrent_runs: usize,

	/// Time zone cron expressions are evaluated in
	#[builder(default = Tz::UTC)]
	pub timezone: Tz,
}

impl Config {
	/// [`Config::request_timeout_secs`] as a [`Duration`]
	#[must_use]
	pub fn request_timeout(&self) -> Duration {
		Duration::from_secs(self.request_timeout_secs)
	}
}

impl Default for Config {
	fn default() -> Self {
		Self::builder().build()
	}
}
