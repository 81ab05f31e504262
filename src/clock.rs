/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! This module contains the [`Clock`] trait used for every timestamp and every cron calculation

use std::fmt::Debug;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;

/// Source of the current time
pub trait Clock: Debug + Send + Sync + 'static {
	/// Returns the current time
	fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock
#[derive(Clone, Copy, Default, Debug)]
pub struct SystemClock;

/// A clock that only moves when told to. Useful for tests and simulations
#[derive(Debug)]
pub struct ManualClock(Mutex<DateTime<Utc>>);

impl Clock for SystemClock {
	fn now(&self) -> DateTime<Utc> {
		Utc::now()
	}
}

impl ManualClock {
	/// Creates a clock stopped at `now`
	#[must_use]
	pub fn new(now: DateTime<Utc>) -> Self {
		Self(Mutex::new(now))
	}

	/// Moves the clock to `now`
	pub fn set(&self, now: DateTime<Utc>) {
		*self.0.lock() = now;
	}

	/// Moves the clock forward by `delta`
	pub fn advance(&self, delta: TimeDelta) {
		*self.0.lock() += delta;
	}
}

impl Clock for ManualClock {
	fn now(&self) -> DateTime<Utc> {
		*self.0.lock()
	}
}

#[cfg(test)]
mod tests {
	#![allow(clippy::unwrap_used)]

	use chrono::{TimeDelta, TimeZone, Utc};

	use super::{Clock, ManualClock};

	#[test]
	fn manual_clock_only_moves_when_told() {
		let start = Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap();
		let clock = ManualClock::new(start);
		assert_eq!(clock.now(), start);

		clock.advance(TimeDelta::hours(1));
		assert_eq!(clock.now(), Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());

		clock.set(start);
		assert_eq!(clock.now(), start);
	}
}
