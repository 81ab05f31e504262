/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! This module contains the [`Scrape`] trait, a strategy to turn a page into [`Records`](`Record`),
//! and [`HtmlScraper`], its implementation for static HTML pages

pub mod error;
pub mod html;
pub mod http;

pub use self::{error::FetchError, html::HtmlScraper};

use std::{collections::BTreeMap, fmt::Debug};

use url::Url;

use crate::task::FieldRule;

/// A single extracted record: field name to value
pub type Record = BTreeMap<String, String>;

/// A way to fetch a page and extract records out of it
pub trait Scrape: Debug + Send + Sync + 'static {
	/// Fetch `url` and extract records according to `rules`.
	///
	/// `item_selector`, if set, selects the element every record is contained in.
	/// See [`Task::item_selector`](`crate::Task::item_selector`).
	///
	/// Should return an empty list without fetching anything if `rules` is empty.
	///
	/// # Errors
	/// if the page couldn't be fetched or the rules couldn't be applied
	fn scrape(
		&self,
		url: &Url,
		rules: &[FieldRule],
		item_selector: Option<&str>,
	) -> impl Future<Output = Result<Vec<Record>, FetchError>> + Send;
}
