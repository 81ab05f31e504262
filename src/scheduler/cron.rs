/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! This module contains [`CronSchedule`], a parsed cron expression bound to a time zone

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use croner::Cron;

use crate::task::ValidationError;

/// A recurring calendar-based schedule.
///
/// Accepts both the 5 field (minute first) and the 6 field (second first) forms.
/// Quartz-style `?` is accepted in the day fields as "any".
#[derive(Clone, Debug)]
pub struct CronSchedule {
	expression: String,
	cron: Cron,
	timezone: Tz,
}

impl CronSchedule {
	/// Parses `expression`. Occurrences are calculated in the `timezone` wall clock
	///
	/// # Errors
	/// if `expression` isn't a valid cron expression
	pub fn parse(expression: &str, timezone: Tz) -> Result<Self, ValidationError> {
		let expression = expression.trim();
		let cron = Cron::new(expression)
			.with_seconds_optional()
			.parse()
			.map_err(|source| ValidationError::InvalidCron {
				expression: expression.to_owned(),
				source,
			})?;

		Ok(Self {
			expression: expression.to_owned(),
			cron,
			timezone,
		})
	}

	/// Returns the first occurrence strictly after `after`,
	/// or `None` if there are no more, e.g. if the expression can't ever match
	#[must_use]
	pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
		let local = after.with_timezone(&self.timezone);

		match self.cron.find_next_occurrence(&local, false) {
			Ok(next) => Some(next.with_timezone(&Utc)),
			Err(e) => {
				tracing::warn!("No next occurrence of {:?} after {after}: {e}", self.expression);
				None
			}
		}
	}

	/// The expression as it was written, without surrounding whitespace
	#[must_use]
	pub fn expression(&self) -> &str {
		&self.expression
	}
}
