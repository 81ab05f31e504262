/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! This example scrapes the titles and links of the Hacker News front page every day at noon.
//! The first batch is scraped right away with a manual trigger.

use harvester::{
	Config, Harvester,
	scaffold::{self, InitResult},
	store::MemoryStore,
	task::{FieldRule, OwnerId, TaskDefinition},
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
	let InitResult { ctrl_c_signal } = scaffold::init();

	let config = Config::builder().max_concurrent_runs(2).build();
	let harvester = Harvester::new(MemoryStore::new(), &config)?;
	let owner = OwnerId(1);

	let task = harvester
		.tasks()
		.create_task(
			TaskDefinition::builder()
				.name("hacker news front page")
				.target_url("https://news.ycombinator.com/")
				.item_selector("tr.athing")
				.rules(vec![
					FieldRule::text("title", ".titleline > a"),
					FieldRule::attr("link", ".titleline > a", "href"),
				])
				.cron_expression("0 0 12 * * ?")
				.build(),
			owner,
		)
		.await?;

	// don't wait until noon for the first batch
	let task = harvester.tasks().trigger_task(task.id, owner).await?;
	tracing::info!(
		"{}: {}",
		task.status,
		task.last_run_message.as_deref().unwrap_or_default()
	);

	let entries = harvester
		.tasks()
		.list_data_entries(task.id, owner, 0, 5)
		.await?;

	for entry in &entries.items {
		tracing::info!("{:?}", entry.data);
	}

	scaffold::run_until_ctrl_c(&harvester, ctrl_c_signal).await?;

	Ok(())
}
