/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! This module contains the main [`Error`] type returned by the task service, the scheduler and the executor

mod error_chain_display;

pub use self::error_chain_display::ErrorChainDisplay;

use crate::{
	scrape::FetchError,
	store::StoreError,
	task::{TaskId, ValidationError},
};

/// All errors that can happen while managing or running a task
#[derive(thiserror::Error, Debug)]
pub enum Error {
	/// The task doesn't exist or belongs to someone else
	#[error("Task {0} not found")]
	NotFound(TaskId),

	/// The input was rejected before anything was changed
	#[error("Invalid task")]
	Validation(#[from] ValidationError),

	/// The target page couldn't be fetched or extracted from
	#[error("Failed to scrape the target page")]
	Fetch(#[from] FetchError),

	/// The store failed to read or write
	#[error(transparent)]
	Persistence(#[from] StoreError),
}

impl Error {
	/// Did the error happen while talking to a remote server?
	#[must_use]
	pub fn is_network_related(&self) -> bool {
		match self {
			Self::Fetch(e) => e.is_network_related(),
			_ => false,
		}
	}

	/// Returns a one-line message containing the whole chain of causes of this error
	#[must_use]
	pub fn chain_message(&self) -> String {
		format!("{:#}", ErrorChainDisplay(self))
	}
}

#[cfg(test)]
mod tests {
	use super::Error;
	use crate::{scrape::FetchError, task::ValidationError};

	#[test]
	fn chain_message_is_one_line() {
		let err = Error::Validation(ValidationError::EmptyName);

		assert_eq!(
			err.chain_message(),
			"Invalid task: Task name must not be empty"
		);
	}

	#[test]
	fn network_related() {
		let err = Error::Fetch(FetchError::BadStatus {
			url: "https://example.com/".to_owned(),
			status: 503,
		});

		assert!(err.is_network_related(), "bad status is network related");
		assert!(
			!Error::Validation(ValidationError::ZeroPageSize).is_network_related(),
			"validation errors are not network related"
		);
	}
}
