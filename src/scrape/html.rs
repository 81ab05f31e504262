/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! This module contains the [`HtmlScraper`] and the record extraction logic it uses

pub use scraper::Selector;

use itertools::Itertools;
use reqwest::Client;
use scraper::{ElementRef, Html as HtmlDom};
use url::Url;

use super::{
	FetchError, Record, Scrape,
	http::{self, ClientIdentity},
};
use crate::{config::Config, task::FieldRule};

/// Fetches static HTML pages and extracts records out of them using CSS selectors
#[derive(Clone, Debug)]
pub struct HtmlScraper {
	client: Client,
	identity: ClientIdentity,
}

/// A CSS selector that couldn't be parsed
#[derive(thiserror::Error, Clone, PartialEq, Eq, Debug)]
#[error("Invalid CSS selector {selector:?}: {reason}")]
pub struct SelectorError {
	/// The selector as it was written
	pub selector: String,

	/// What's wrong with it
	pub reason: String,
}

/// Rules with their selectors parsed, ready to be applied to a document
#[derive(Debug)]
struct ExtractionPlan {
	fields: Vec<CompiledRule>,
	item: Option<Selector>,
}

#[derive(Debug)]
struct CompiledRule {
	field_name: String,
	selector: Selector,
	attribute: Option<String>,
}

impl HtmlScraper {
	/// Creates a new [`HtmlScraper`] with its own HTTP client
	///
	/// # Errors
	/// This method fails if TLS couldn't be initialized
	pub fn new(config: &Config) -> Result<Self, FetchError> {
		Ok(Self::with_client(http::build_client(config)?, config))
	}

	/// Creates a new [`HtmlScraper`] that sends its requests using an existing `client`.
	///
	/// The timeout of `client` is used as is.
	#[must_use]
	pub fn with_client(client: Client, config: &Config) -> Self {
		Self {
			client,
			identity: ClientIdentity {
				user_agent: config.user_agent.clone(),
				accept_language: config.accept_language.clone(),
			},
		}
	}
}

impl Scrape for HtmlScraper {
	#[tracing::instrument(skip_all, fields(url = %url))]
	async fn scrape(
		&self,
		url: &Url,
		rules: &[FieldRule],
		item_selector: Option<&str>,
	) -> Result<Vec<Record>, FetchError> {
		if rules.is_empty() {
			tracing::warn!("No rules provided, not scraping");
			return Ok(Vec::new());
		}

		// parse the selectors first to avoid sending a request for nothing
		let plan = ExtractionPlan::compile(rules, item_selector)?;

		tracing::debug!("Fetching the page");
		let page = http::send_request(&self.client, &self.identity, url).await?;

		let records = plan.extract(&page);
		tracing::info!("Extracted {} records from {url}", records.len());

		Ok(records)
	}
}

/// Extracts records out of an HTML document.
///
/// If `item_selector` is set, every element it matches produces one record
/// and every rule takes its first match inside that element.
///
/// Otherwise each rule is matched against the whole document independently.
/// The amount of records is the largest amount of elements any single rule matched,
/// and record `i` takes the `i`-th match of every rule, or an empty string if that rule matched fewer elements.
/// Note that this simply lines up matches by their position on the page
/// and will misalign fields if the rules match different amounts of elements for reasons other than
/// one element per record. Use `item_selector` for pages like that.
///
/// In both cases records whose fields are all empty are dropped.
///
/// # Errors
/// if any of the selectors isn't a valid CSS selector
pub fn extract_records(
	html: &str,
	rules: &[FieldRule],
	item_selector: Option<&str>,
) -> Result<Vec<Record>, SelectorError> {
	Ok(ExtractionPlan::compile(rules, item_selector)?.extract(html))
}

/// Parses a CSS selector
///
/// # Errors
/// if `selector` isn't a valid CSS selector
pub fn parse_selector(selector: &str) -> Result<Selector, SelectorError> {
	Selector::parse(selector).map_err(|e| SelectorError {
		selector: selector.to_owned(),
		reason: e.to_string(),
	})
}

impl ExtractionPlan {
	fn compile(rules: &[FieldRule], item_selector: Option<&str>) -> Result<Self, SelectorError> {
		let fields = rules
			.iter()
			.map(|rule| -> Result<_, SelectorError> {
				Ok(CompiledRule {
					field_name: rule.field_name.clone(),
					selector: parse_selector(&rule.selector)?,
					attribute: rule.attribute().map(ToOwned::to_owned),
				})
			})
			.collect::<Result<Vec<_>, _>>()?;

		let item = item_selector.map(parse_selector).transpose()?;

		Ok(Self { fields, item })
	}

	fn extract(&self, html: &str) -> Vec<Record> {
		if self.fields.is_empty() {
			return Vec::new();
		}

		tracing::trace!("Parsing the page as HTML");
		let dom = HtmlDom::parse_document(html);
		let root = dom.root_element();

		let records = match &self.item {
			Some(item) => self.extract_from_items(root, item),
			None => self.extract_by_position(root),
		};

		records.into_iter().filter(has_data).collect()
	}

	fn extract_by_position(&self, root: ElementRef<'_>) -> Vec<Record> {
		let matches = self
			.fields
			.iter()
			.map(|field| root.select(&field.selector).collect::<Vec<_>>())
			.collect::<Vec<_>>();

		let record_count = matches.iter().map(Vec::len).max().unwrap_or(0);
		if record_count == 0 {
			tracing::warn!("No elements found for any of the rules");
			return Vec::new();
		}

		(0..record_count)
			.map(|idx| {
				self.fields
					.iter()
					.zip(&matches)
					.map(|(field, elements)| {
						let value = elements
							.get(idx)
							.map(|elem| field.read(*elem))
							.unwrap_or_default();

						(field.field_name.clone(), value)
					})
					.collect::<Record>()
			})
			.collect()
	}

	fn extract_from_items(&self, root: ElementRef<'_>, item: &Selector) -> Vec<Record> {
		let records = root
			.select(item)
			.map(|item| {
				self.fields
					.iter()
					.map(|field| {
						let value = item
							.select(&field.selector)
							.next()
							.map(|elem| field.read(elem))
							.unwrap_or_default();

						(field.field_name.clone(), value)
					})
					.collect::<Record>()
			})
			.collect::<Vec<_>>();

		if records.is_empty() {
			tracing::warn!("Item selector didn't match any element");
		}

		records
	}
}

impl CompiledRule {
	/// Reads the attribute or the text of `elem`, trimmed
	fn read(&self, elem: ElementRef<'_>) -> String {
		match &self.attribute {
			Some(attr) => elem
				.value()
				.attr(attr)
				.map(|value| value.trim().to_owned())
				.unwrap_or_default(),
			// collapse whitespace runs the same way a browser renders them
			None => elem.text().collect::<String>().split_whitespace().join(" "),
		}
	}
}

fn has_data(record: &Record) -> bool {
	record.values().any(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
	#![allow(clippy::unwrap_used)]

	use assert_matches::assert_matches;

	use super::{SelectorError, extract_records};
	use crate::task::FieldRule;

	const SHOP_PAGE: &str = r#"
	<body>
		<h1>  Summer
			sale </h1>
		<ul>
			<li><span class="price">10.00</span></li>
			<li><span class="price">12.50</span></li>
		</ul>
		<img src=" x.jpg " alt="y">
	</body>
	"#;

	const LISTING_PAGE: &str = r#"
	<body>
		<div class="product">
			<a href="/a">Lamp</a>
			<span class="price">15</span>
		</div>
		<div class="product">
			<a href="/b">Chair</a>
		</div>
		<div class="product"></div>
	</body>
	"#;

	#[test]
	fn record_count_is_the_largest_match_count() {
		let records = extract_records(
			SHOP_PAGE,
			&[
				FieldRule::text("title", "h1"),
				FieldRule::text("price", ".price"),
			],
			None,
		)
		.unwrap();

		assert_eq!(records.len(), 2);

		assert_eq!(records[0]["title"], "Summer sale");
		assert_eq!(records[0]["price"], "10.00");

		assert_eq!(records[1]["title"], "");
		assert_eq!(records[1]["price"], "12.50");
	}

	#[test]
	fn text_vs_attribute() {
		let records = extract_records(
			SHOP_PAGE,
			&[
				FieldRule::text("img_text", "img"),
				FieldRule::attr("img_src", "img", "src"),
			],
			None,
		)
		.unwrap();

		assert_eq!(records.len(), 1);
		assert_eq!(records[0]["img_text"], "");
		assert_eq!(records[0]["img_src"], "x.jpg");
	}

	#[test]
	fn missing_attribute_is_empty() {
		let records = extract_records(
			SHOP_PAGE,
			&[
				FieldRule::attr("alt", "img", "alt"),
				FieldRule::attr("title", "img", "title"),
			],
			None,
		)
		.unwrap();

		assert_eq!(records.len(), 1);
		assert_eq!(records[0]["alt"], "y");
		assert_eq!(records[0]["title"], "");
	}

	#[test]
	fn blank_attribute_means_text() {
		let records = extract_records(
			SHOP_PAGE,
			&[FieldRule::attr("title", "h1", " ")],
			None,
		)
		.unwrap();

		assert_eq!(records[0]["title"], "Summer sale");
	}

	#[test]
	fn all_empty_records_are_dropped() {
		// an img has no text, so every record would be empty
		let records = extract_records(SHOP_PAGE, &[FieldRule::text("img", "img")], None).unwrap();

		assert!(records.is_empty(), "got {records:?}");
	}

	#[test]
	fn nothing_matched() {
		let records =
			extract_records(SHOP_PAGE, &[FieldRule::text("nope", "article")], None).unwrap();

		assert!(records.is_empty(), "got {records:?}");
	}

	#[test]
	fn no_rules() {
		let records = extract_records(SHOP_PAGE, &[], None).unwrap();

		assert!(records.is_empty(), "got {records:?}");
	}

	#[test]
	fn item_selector_keeps_fields_together() {
		let records = extract_records(
			LISTING_PAGE,
			&[
				FieldRule::text("name", "a"),
				FieldRule::attr("link", "a", "href"),
				FieldRule::text("price", ".price"),
			],
			Some("div.product"),
		)
		.unwrap();

		// the third product is empty and gets dropped
		assert_eq!(records.len(), 2);

		assert_eq!(records[0]["name"], "Lamp");
		assert_eq!(records[0]["link"], "/a");
		assert_eq!(records[0]["price"], "15");

		assert_eq!(records[1]["name"], "Chair");
		assert_eq!(records[1]["price"], "");
	}

	#[test]
	fn invalid_selector() {
		let res = extract_records(SHOP_PAGE, &[FieldRule::text("x", "p[")], None);

		assert_matches!(res, Err(SelectorError { selector, .. }) if selector == "p[");
	}
}
