/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! This module contains a "scaffold", in other words, functions that pre-configure your application for common uses of [`harvester`](`crate`).
//!
//! The main entry points of this module are [`init`] and [`run_until_ctrl_c`]

use std::process;

use tracing::subscriber::SetGlobalDefaultError;

use crate::{
	Harvester,
	cancellation_token::CancellationToken,
	scrape::Scrape,
	store::{Store, StoreError},
};

/// Contains the result of the [`init`] function
#[must_use = "ctrl_c_signal should probably be used. Ignore this type manually if you are sure you don't want it"]
pub struct InitResult {
	/// Cancelled when a Ctrl-C signal has arrived
	pub ctrl_c_signal: CancellationToken,
}

/// Initializes a tracing subscriber and a background task that will notify when a Ctrl-C signal has arrived.
///
/// See [`set_up_logging`] and [`set_up_ctrl_c_handler`] for more info
pub fn init() -> InitResult {
	if set_up_logging().is_err() {
		tracing::debug!(
			"Unable to set up the default tracing subscriber. Another one is probably already registered"
		);
	}

	InitResult {
		ctrl_c_signal: set_up_ctrl_c_handler(),
	}
}

/// Installs a tracing subscriber as the default.
///
/// The subscriber shows compact one-line log messages when log level is > DEBUG,
/// and pretty multi-line log messages when it's set to <= DEBUG.
///
/// It also logs to systemd-journald if available but only when compiled in release (to avoid log spam when debugging)
///
/// # Errors
/// If a different global tracing subscriber has already been registered.
pub fn set_up_logging() -> Result<(), SetGlobalDefaultError> {
	use tracing::Level;
	use tracing_subscriber::{
		EnvFilter,
		Layer,
		filter::LevelFilter,
		fmt::time::{OffsetTime, SystemTime},
		layer::SubscriberExt,
	};

	let env_filter = EnvFilter::builder()
		.with_default_directive(LevelFilter::INFO.into())
		.from_env_lossy();

	let is_debug_log_level = env_filter
		.max_level_hint()
		.is_some_and(|level| level >= Level::DEBUG);

	// the local offset can't always be determined in a multithreaded process, fall back to UTC then
	let stdout = match OffsetTime::local_rfc_3339() {
		Ok(timer) => stdout_layer(timer, is_debug_log_level),
		Err(_) => stdout_layer(SystemTime, is_debug_log_level),
	};

	// enable journald logging only on release to avoid log spam on dev machines
	let journald = if cfg!(debug_assertions) {
		None
	} else {
		tracing_journald::layer().ok()
	};

	let subscriber = tracing_subscriber::registry()
		.with(journald.with_filter(LevelFilter::INFO))
		.with(stdout.with_filter(env_filter));

	tracing::subscriber::set_global_default(subscriber)
}

/// Starts a detached tokio task that sets up a Ctrl-C signal handler
///
/// The returned token is cancelled when the first Ctrl-C signal arrives.
/// The second one force closes the process.
#[must_use]
pub fn set_up_ctrl_c_handler() -> CancellationToken {
	let (token, cancel) = CancellationToken::new();

	// signal handler
	tokio::spawn(async move {
		// graceful shutdown
		if let Err(e) = tokio::signal::ctrl_c().await {
			tracing::error!("Failed to set up a CtrlC signal handler: {e}");
			return;
		}

		// shutdown signal recieved
		cancel.cancel();

		tracing::info!("Press Ctrl-C again to force close");

		// force close
		if let Err(e) = tokio::signal::ctrl_c().await {
			tracing::error!("Failed to set up a CtrlC signal handler: {e}");
			return;
		}

		tracing::info!("Force closing...");
		#[expect(clippy::exit, reason = "user requested force close")]
		process::exit(1);
	});

	token
}

/// Re-arms all stored tasks, then keeps the scheduler running until `ctrl_c_signal` is cancelled
///
/// # Errors
/// if the stored tasks couldn't be read on startup
pub async fn run_until_ctrl_c<S: Store, X: Scrape>(
	harvester: &Harvester<S, X>,
	mut ctrl_c_signal: CancellationToken,
) -> Result<(), StoreError> {
	let armed = harvester.start().await?;
	tracing::info!("Harvester started with {armed} scheduled tasks");

	ctrl_c_signal.wait().await;

	tracing::info!("Shutting down");
	harvester.shutdown();

	Ok(())
}

/// Builds the stdout layer. Pretty multi-line output if `pretty` is set, compact one-line otherwise
fn stdout_layer<S, T>(timer: T, pretty: bool) -> Box<dyn tracing_subscriber::Layer<S> + Send + Sync>
where
	S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
	T: tracing_subscriber::fmt::time::FormatTime + Send + Sync + 'static,
{
	use tracing_subscriber::Layer;

	let layer = tracing_subscriber::fmt::layer()
		.with_target(pretty)
		.with_file(pretty)
		.with_line_number(pretty)
		.with_thread_ids(pretty)
		.with_timer(timer);

	if pretty {
		layer.pretty().boxed()
	} else {
		layer.boxed()
	}
}
