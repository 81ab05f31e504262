/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! This module contains the [`Task`] type, the inputs used to create ([`TaskDefinition`]) and change ([`TaskPatch`]) one,
//! and everything a task is made out of

mod id;
pub mod locks;
mod rule;
mod status;
pub mod validation;

pub use self::{
	id::{OwnerId, TaskId},
	locks::TaskLocks,
	rule::FieldRule,
	status::TaskStatus,
	validation::ValidationError,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// A named, user-owned scraping job
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Task {
	/// Unique identifier of the task
	pub id: TaskId,

	/// The user this task belongs to
	pub owner: OwnerId,

	/// Human readable name
	pub name: String,

	/// The page to scrape
	pub target_url: Url,

	/// Ordered list of fields to extract from the page
	pub rules: Vec<FieldRule>,

	/// CSS selector of a single record on the page.
	///
	/// If set, every element it matches produces one record and each rule is resolved inside that element.
	/// If not, the rules are matched against the whole page and zipped together by position.
	pub item_selector: Option<String>,

	/// Current lifecycle status
	pub status: TaskStatus,

	/// Cron expression to run the task on. `None` means the task is not recurring
	pub cron_expression: Option<String>,

	/// When the task was created
	pub created_at: DateTime<Utc>,

	/// When the task was last changed
	pub updated_at: DateTime<Utc>,

	/// When the last run started
	pub last_run_at: Option<DateTime<Utc>>,

	/// When the last successful run finished
	pub last_finished_at: Option<DateTime<Utc>>,

	/// Human readable outcome of the last run
	pub last_run_message: Option<String>,
}

/// Everything needed to create a new [`Task`]
#[derive(bon::Builder, Clone, Debug, Serialize, Deserialize)]
pub struct TaskDefinition {
	/// See [`Task::name`]
	#[builder(into)]
	pub name: String,

	/// See [`Task::target_url`]. Validated when the task gets created
	#[builder(into)]
	pub target_url: String,

	/// See [`Task::rules`]
	#[builder(default)]
	#[serde(default)]
	pub rules: Vec<FieldRule>,

	/// See [`Task::item_selector`]
	#[builder(into)]
	pub item_selector: Option<String>,

	/// See [`Task::cron_expression`]. A blank expression is the same as none
	#[builder(into)]
	pub cron_expression: Option<String>,
}

/// A partial update of a [`Task`]. Fields left as `None` are not changed.
///
/// `item_selector` and `cron_expression` set to a blank string remove the current value.
#[derive(bon::Builder, Clone, Default, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskPatch {
	/// New name
	#[builder(into)]
	pub name: Option<String>,

	/// New target URL
	#[builder(into)]
	pub target_url: Option<String>,

	/// Replaces all rules
	pub rules: Option<Vec<FieldRule>>,

	/// New item selector, or a blank string to remove it
	#[builder(into)]
	pub item_selector: Option<String>,

	/// New cron expression, or a blank string to remove it
	#[builder(into)]
	pub cron_expression: Option<String>,

	/// Explicitly requested status
	pub status: Option<TaskStatus>,
}

impl Task {
	/// Creates a new [`Task`] in the [`TaskStatus::Pending`] state out of a validated [`TaskDefinition`]
	///
	/// # Errors
	/// if any part of the definition is invalid, see [`ValidationError`]
	pub fn new(
		definition: TaskDefinition,
		owner: OwnerId,
		now: DateTime<Utc>,
	) -> Result<Self, ValidationError> {
		let TaskDefinition {
			name,
			target_url,
			rules,
			item_selector,
			cron_expression,
		} = definition;

		validation::validate_name(&name)?;
		let target_url = validation::parse_target_url(&target_url)?;
		validation::validate_rules(&rules)?;
		let item_selector = validation::normalize_blank(item_selector);
		validation::validate_item_selector(item_selector.as_deref())?;
		let cron_expression = validation::normalize_blank(cron_expression);
		validation::validate_cron(cron_expression.as_deref())?;

		Ok(Self {
			id: TaskId::new_random(),
			owner,
			name,
			target_url,
			rules,
			item_selector,
			status: TaskStatus::Pending,
			cron_expression,
			created_at: now,
			updated_at: now,
			last_run_at: None,
			last_finished_at: None,
			last_run_message: None,
		})
	}

	/// Applies the plain fields of a [`TaskPatch`] (everything but the cron expression and the status)
	///
	/// # Errors
	/// if any of the new values is invalid. The task is left untouched in that case
	pub fn apply_fields(&mut self, patch: &TaskPatch) -> Result<(), ValidationError> {
		if let Some(name) = &patch.name {
			validation::validate_name(name)?;
		}

		let target_url = patch
			.target_url
			.as_deref()
			.map(validation::parse_target_url)
			.transpose()?;

		if let Some(rules) = &patch.rules {
			validation::validate_rules(rules)?;
		}

		let item_selector = patch
			.item_selector
			.clone()
			.map(|sel| validation::normalize_blank(Some(sel)));

		if let Some(Some(sel)) = &item_selector {
			validation::validate_item_selector(Some(sel))?;
		}

		// everything's valid, commit
		if let Some(name) = &patch.name {
			self.name.clone_from(name);
		}

		if let Some(url) = target_url {
			self.target_url = url;
		}

		if let Some(rules) = &patch.rules {
			self.rules.clone_from(rules);
		}

		if let Some(item_selector) = item_selector {
			self.item_selector = item_selector;
		}

		Ok(())
	}

	/// Does this task recur on a cron schedule?
	#[must_use]
	pub fn has_cron(&self) -> bool {
		self.cron_expression.is_some()
	}

	/// Should this task have an armed timer in the [`Scheduler`](`crate::Scheduler`)?
	#[must_use]
	pub fn is_armable(&self) -> bool {
		self.status == TaskStatus::Scheduled && self.has_cron()
	}

	/// Records the start of a run
	pub(crate) fn mark_running(&mut self, message: impl Into<String>, now: DateTime<Utc>) {
		self.status = TaskStatus::Running;
		self.last_run_at = Some(now);
		self.last_run_message = Some(message.into());
		self.updated_at = now;
	}

	/// Records a successful run, putting the task into `status`
	pub(crate) fn mark_succeeded(
		&mut self,
		status: TaskStatus,
		message: impl Into<String>,
		now: DateTime<Utc>,
	) {
		self.status = status;
		self.last_finished_at = Some(now);
		self.last_run_message = Some(message.into());
		self.updated_at = now;
	}

	/// Records a failed run
	pub(crate) fn mark_failed(&mut self, message: impl Into<String>, now: DateTime<Utc>) {
		self.status = TaskStatus::Failed;
		self.last_run_message = Some(message.into());
		self.updated_at = now;
	}
}
