/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use serde::{Deserialize, Serialize};

/// Describes a single field to extract from a page
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct FieldRule {
	/// Name of the field in the resulting record
	pub field_name: String,

	/// CSS selector of the element(s) containing the data
	pub selector: String,

	/// Attribute to read the data from. The trimmed text of the element is used if `None`
	#[serde(default)]
	pub attribute: Option<String>,
}

impl FieldRule {
	/// Creates a rule that extracts the text of the matched element
	#[must_use]
	pub fn text(field_name: impl Into<String>, selector: impl Into<String>) -> Self {
		Self {
			field_name: field_name.into(),
			selector: selector.into(),
			attribute: None,
		}
	}

	/// Creates a rule that extracts the value of the `attribute` of the matched element
	#[must_use]
	pub fn attr(
		field_name: impl Into<String>,
		selector: impl Into<String>,
		attribute: impl Into<String>,
	) -> Self {
		Self {
			field_name: field_name.into(),
			selector: selector.into(),
			attribute: Some(attribute.into()),
		}
	}

	/// Returns the attribute to extract from, treating a blank one as none at all
	#[must_use]
	pub fn attribute(&self) -> Option<&str> {
		self.attribute
			.as_deref()
			.map(str::trim)
			.filter(|attr| !attr.is_empty())
	}
}
