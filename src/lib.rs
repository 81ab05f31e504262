/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! `harvester` runs user-defined scraping tasks against static HTML pages,
//! either on demand or on a recurring cron schedule.
//!
//! The engine is made out of four parts, leaves first:
//! * [`scrape`] fetches a page and turns it into [`Records`](`scrape::Record`) using a list of [`FieldRules`](`task::FieldRule`)
//! * [`executor`] runs one extraction pass for a task and persists each record as a [`DataEntry`](`data_entry::DataEntry`)
//! * [`scheduler`] keeps one cancellable timer per scheduled task and fires it at each cron occurrence
//! * [`service`] creates, updates, deletes and manually triggers tasks, telling the scheduler when to (re)arm or disarm
//!
//! [`Harvester`] wires all of them together on top of a [`Store`](`store::Store`).

pub mod cancellation_token;
pub mod clock;
pub mod config;
pub mod data_entry;
pub mod error;
pub mod executor;
pub mod harvester;
pub mod scheduler;
pub mod scrape;
pub mod service;
pub mod store;
pub mod task;

#[cfg(feature = "scaffold")]
pub mod scaffold;

pub use self::{
	config::Config,
	error::Error,
	harvester::Harvester,
	scheduler::Scheduler,
	service::TaskService,
	task::{Task, TaskStatus},
};
