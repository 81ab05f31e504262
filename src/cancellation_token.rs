/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! This module contains the [`CancellationToken`] type used to stop an armed timer, and its sending side [`CancelHandle`]

use tokio::sync::watch::{self, channel};

/// The receiving end of a channel that is notified when a timer should stop
#[derive(Clone, Debug)]
pub struct CancellationToken(watch::Receiver<()>);

/// The sending end of a [`CancellationToken`]. Dropping it cancels the token, too
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<()>);

impl CancellationToken {
	/// Creates a new [`CancellationToken`] and returns the handle that cancels it
	#[must_use]
	pub fn new() -> (Self, CancelHandle) {
		let (tx, rx) = channel(());
		(Self(rx), CancelHandle(tx))
	}

	/// Blocks the current task until the handle asks us to stop
	pub async fn wait(&mut self) {
		// assume closed channel = cancelled
		_ = self.0.changed().await;
	}

	/// Checks if the [`CancellationToken`] has been signaled to stop without blocking the calling thread
	#[must_use]
	pub fn is_cancelled(&self) -> bool {
		// assume closed channel = cancelled
		self.0.has_changed().unwrap_or(true)
	}
}

impl CancelHandle {
	/// Signals all tokens created alongside this handle to stop
	pub fn cancel(&self) {
		// no receivers = nobody to cancel
		_ = self.0.send(());
	}
}
