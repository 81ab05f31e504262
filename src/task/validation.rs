/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! This module contains the [`ValidationError`] type and the checks a [`Task`](`super::Task`) has to pass

use croner::errors::CronError;
use url::Url;

use super::{FieldRule, TaskStatus};
use crate::{
	scheduler::cron::CronSchedule,
	scrape::html::{SelectorError, parse_selector},
};

/// Input that can't be turned into a valid task
#[expect(missing_docs, reason = "error message is self-documenting")]
#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
	#[error("Task name must not be empty")]
	EmptyName,

	#[error("Invalid target URL {url:?}")]
	InvalidUrl {
		url: String,
		#[source]
		source: url::ParseError,
	},

	#[error("Target URL {0} must use http or https")]
	UnsupportedScheme(String),

	#[error("Rule #{index} has an empty field name")]
	EmptyFieldName { index: usize },

	#[error(transparent)]
	InvalidSelector(#[from] SelectorError),

	#[error("Invalid cron expression {expression:?}")]
	InvalidCron {
		expression: String,
		#[source]
		source: CronError,
	},

	#[error("Status SCHEDULED requires a cron expression")]
	ScheduledWithoutCron,

	#[error("Status {0} can't be requested directly")]
	StatusNotSettable(TaskStatus),

	#[error("Page size must be greater than zero")]
	ZeroPageSize,
}

/// Turns a blank string into `None`, trimming it otherwise
pub(crate) fn normalize_blank(s: Option<String>) -> Option<String> {
	s.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
}

pub(crate) fn validate_name(name: &str) -> Result<(), ValidationError> {
	if name.trim().is_empty() {
		return Err(ValidationError::EmptyName);
	}

	Ok(())
}

pub(crate) fn parse_target_url(url: &str) -> Result<Url, ValidationError> {
	let parsed = Url::parse(url.trim()).map_err(|source| ValidationError::InvalidUrl {
		url: url.to_owned(),
		source,
	})?;

	match parsed.scheme() {
		"http" | "https" => Ok(parsed),
		_ => Err(ValidationError::UnsupportedScheme(url.to_owned())),
	}
}

pub(crate) fn validate_rules(rules: &[FieldRule]) -> Result<(), ValidationError> {
	for (index, rule) in rules.iter().enumerate() {
		if rule.field_name.trim().is_empty() {
			return Err(ValidationError::EmptyFieldName { index });
		}

		parse_selector(&rule.selector)?;
	}

	Ok(())
}

pub(crate) fn validate_item_selector(item_selector: Option<&str>) -> Result<(), ValidationError> {
	if let Some(sel) = item_selector {
		parse_selector(sel)?;
	}

	Ok(())
}

pub(crate) fn validate_cron(expression: Option<&str>) -> Result<(), ValidationError> {
	if let Some(expression) = expression {
		CronSchedule::parse(expression, chrono_tz::UTC)?;
	}

	Ok(())
}
