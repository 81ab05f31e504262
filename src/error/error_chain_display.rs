/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{
	error::Error as StdError,
	fmt::{self, Display},
};

/// Wrapper around a type implementing [`std::error::Error`]
/// that displays the error together with all of its sources.
///
/// The regular form looks like this:
///
/// Error 1
///
/// Caused by:
///   1: Error 2
///   2: Error 3
///
/// The alternate form (`{:#}`) fits on one line, the way it's stored in a task's last run message:
///
/// Error 1: Error 2: Error 3
pub struct ErrorChainDisplay<'a>(pub &'a dyn StdError);

impl Display for ErrorChainDisplay<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut current_err = self.0;
		write!(f, "{current_err}")?;

		let one_line = f.alternate();
		let mut counter = 0;
		while let Some(source) = StdError::source(current_err) {
			// transparent wrappers repeat their source's message
			if source.to_string() == current_err.to_string() {
				current_err = source;
				continue;
			}

			current_err = source;
			counter += 1;

			if one_line {
				write!(f, ": {current_err}")?;
				continue;
			}

			if counter == 1 {
				write!(f, "\n\nCaused by:")?;
			}

			write!(f, "\n\t{counter}: {current_err}")?;
		}

		Ok(())
	}
}
