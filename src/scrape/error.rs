/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! This module contains [`FetchError`], everything that can go wrong while extracting records

use std::error::Error as StdError;

use super::html::SelectorError;

/// A page couldn't be fetched or extracted from
#[expect(missing_docs, reason = "error message is self-documenting")]
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
	#[error("Failed to init the HTTP client")]
	ClientInit(#[source] reqwest::Error),

	#[error("Can't send an HTTP request to {1:?}")]
	BadRequest(#[source] reqwest::Error, String),

	#[error("{url} responded with HTTP {status}")]
	BadStatus { url: String, status: u16 },

	#[error(transparent)]
	Selector(#[from] SelectorError),

	#[error(transparent)]
	Other(#[from] Box<dyn StdError + Send + Sync>),
}

impl FetchError {
	/// Did the error happen while talking to the remote server?
	#[must_use]
	pub fn is_network_related(&self) -> bool {
		matches!(self, Self::BadRequest(..) | Self::BadStatus { .. })
	}
}
