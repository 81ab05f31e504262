/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// Lifecycle status of a [`Task`](`super::Task`)
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
	/// Initial state, not scheduled
	Pending,

	/// Has a cron expression and an armed (or armable) timer
	Scheduled,

	/// A run is in progress
	Running,

	/// Finished for good. Kept for compatibility, runs revert to the status they started with instead
	Completed,

	/// The last run errored
	Failed,

	/// Not scheduled, only triggered manually
	Stopped,

	/// Not scheduled, only triggered manually
	Disabled,
}

impl TaskStatus {
	/// May a cron timer run a task with this status?
	///
	/// A failed task keeps its schedule and gets retried at the next occurrence.
	#[must_use]
	pub fn is_fireable(self) -> bool {
		matches!(self, Self::Scheduled | Self::Running | Self::Failed)
	}

	/// Can a user request this status directly in an update?
	#[must_use]
	pub fn is_user_settable(self) -> bool {
		matches!(
			self,
			Self::Pending | Self::Scheduled | Self::Stopped | Self::Disabled
		)
	}

	/// Upper-case name of the status, the same as its serialized form
	#[must_use]
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Pending => "PENDING",
			Self::Scheduled => "SCHEDULED",
			Self::Running => "RUNNING",
			Self::Completed => "COMPLETED",
			Self::Failed => "FAILED",
			Self::Stopped => "STOPPED",
			Self::Disabled => "DISABLED",
		}
	}
}

impl Display for TaskStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
