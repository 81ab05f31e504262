/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Fetching pages over HTTP

pub use reqwest;

use reqwest::{
	Client,
	header::{ACCEPT_LANGUAGE, USER_AGENT},
};
use url::Url;

use super::FetchError;
use crate::config::Config;

/// Identity headers sent along with every request
#[derive(Clone, Debug)]
pub(crate) struct ClientIdentity {
	pub(crate) user_agent: String,
	pub(crate) accept_language: String,
}

/// Builds a client that gives up on a request after the configured timeout
pub(crate) fn build_client(config: &Config) -> Result<Client, FetchError> {
	reqwest::ClientBuilder::new()
		.timeout(config.request_timeout())
		.build()
		.map_err(FetchError::ClientInit)
}

/// Sends a GET request to `url` and returns the body of the response.
///
/// Responses with a non-2xx status are errors.
pub(crate) async fn send_request(
	client: &Client,
	identity: &ClientIdentity,
	url: &Url,
) -> Result<String, FetchError> {
	tracing::trace!("Making an HTTP GET request to {:?}", url.as_str());

	let response = client
		.get(url.as_str())
		.header(USER_AGENT, identity.user_agent.as_str())
		.header(ACCEPT_LANGUAGE, identity.accept_language.as_str())
		.send()
		.await
		.map_err(|e| FetchError::BadRequest(e, url.to_string()))?;

	let status = response.status();
	if !status.is_success() {
		return Err(FetchError::BadStatus {
			url: url.to_string(),
			status: status.as_u16(),
		});
	}

	tracing::trace!("Getting text body of the response");
	response
		.text()
		.await
		.map_err(|e| FetchError::BadRequest(e, url.to_string()))
}
