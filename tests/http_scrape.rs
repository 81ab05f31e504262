/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! These tests run the [`HtmlScraper`] against a tiny HTTP server on localhost

#![allow(clippy::unwrap_used)]

use std::{sync::Arc, time::Duration};

use assert_matches::assert_matches;
use harvester::{
	Config, Error, Harvester, TaskStatus,
	scrape::{FetchError, HtmlScraper, Scrape},
	store::MemoryStore,
	task::{FieldRule, OwnerId, TaskDefinition},
};
use parking_lot::Mutex;
use tokio::{
	io::{AsyncReadExt, AsyncWriteExt},
	net::TcpListener,
};
use url::Url;

const PRODUCTS: &str = r#"<html>
<head><title>Shop</title></head>
<body>
	<h1>Spring   sale</h1>
	<div class="product"><span class="price">10 EUR</span><img src="/a.jpg" alt="a"></div>
	<div class="product"><span class="price">
		20 EUR
	</span><img src="/b.jpg" alt="b"></div>
</body>
</html>"#;

const OWNER: OwnerId = OwnerId(1);

/// Serves `body` with `status` to every request and remembers the requests it got
struct Server {
	url: Url,
	requests: Arc<Mutex<Vec<String>>>,
}

impl Server {
	async fn start(status: &'static str, body: &'static str) -> Self {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let url = Url::parse(&format!("http://{}/shop", listener.local_addr().unwrap())).unwrap();
		let requests = Arc::new(Mutex::new(Vec::new()));

		let seen = Arc::clone(&requests);
		tokio::spawn(async move {
			while let Ok((mut socket, _)) = listener.accept().await {
				let seen = Arc::clone(&seen);

				tokio::spawn(async move {
					let mut request = Vec::new();
					let mut buf = [0; 1024];

					// headers only, GET requests have no body
					while !request.windows(4).any(|w| w == b"\r\n\r\n") {
						match socket.read(&mut buf).await {
							Ok(0) | Err(_) => return,
							Ok(n) => request.extend_from_slice(&buf[..n]),
						}
					}

					seen.lock().push(String::from_utf8_lossy(&request).into_owned());

					let response = format!(
						"HTTP/1.1 {status}\r\ncontent-type: text/html\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
						body.len()
					);
					_ = socket.write_all(response.as_bytes()).await;
					_ = socket.shutdown().await;
				});
			}
		});

		Self { url, requests }
	}

	fn request_count(&self) -> usize {
		self.requests.lock().len()
	}
}

fn rules() -> Vec<FieldRule> {
	vec![
		FieldRule::text("title", "h1"),
		FieldRule::text("price", ".price"),
	]
}

#[tokio::test]
async fn scrapes_served_page() {
	let server = Server::start("200 OK", PRODUCTS).await;
	let scraper = HtmlScraper::new(&Config::default()).unwrap();

	let records = scraper.scrape(&server.url, &rules(), None).await.unwrap();

	assert_eq!(records.len(), 2);
	assert_eq!(records[0]["title"], "Spring sale");
	assert_eq!(records[0]["price"], "10 EUR");
	assert_eq!(records[1]["title"], "");
	assert_eq!(records[1]["price"], "20 EUR");

	let request = server.requests.lock()[0].to_lowercase();
	assert!(
		request.contains("user-agent: mozilla/5.0"),
		"should look like a browser: {request}"
	);
	assert!(
		request.contains("accept-language: en-us"),
		"should send accept-language: {request}"
	);
}

#[tokio::test]
async fn scrapes_attributes_per_item() {
	let server = Server::start("200 OK", PRODUCTS).await;
	let scraper = HtmlScraper::new(&Config::default()).unwrap();

	let rules = vec![
		FieldRule::text("price", ".price"),
		FieldRule::attr("image", "img", "src"),
		FieldRule::text("image text", "img"),
	];
	let records = scraper
		.scrape(&server.url, &rules, Some("div.product"))
		.await
		.unwrap();

	assert_eq!(records.len(), 2);
	assert_eq!(records[1]["price"], "20 EUR");
	assert_eq!(records[1]["image"], "/b.jpg");
	assert_eq!(records[1]["image text"], "");
}

#[tokio::test]
async fn non_success_status_is_an_error() {
	let server = Server::start("404 Not Found", "<h1>nope</h1>").await;
	let scraper = HtmlScraper::new(&Config::default()).unwrap();

	let err = scraper.scrape(&server.url, &rules(), None).await.unwrap_err();

	assert_matches!(err, FetchError::BadStatus { status: 404, .. });
	assert!(err.is_network_related());
}

#[tokio::test]
async fn unreachable_host_is_an_error() {
	let scraper = HtmlScraper::new(&Config::default()).unwrap();
	let url = Url::parse("http://127.0.0.1:1/").unwrap();

	let err = scraper.scrape(&url, &rules(), None).await.unwrap_err();

	assert_matches!(err, FetchError::BadRequest(..));
	assert!(err.is_network_related());
}

#[tokio::test]
async fn no_rules_no_request() {
	let server = Server::start("200 OK", PRODUCTS).await;
	let scraper = HtmlScraper::new(&Config::default()).unwrap();

	let records = scraper.scrape(&server.url, &[], None).await.unwrap();

	assert!(records.is_empty(), "no rules, no records");
	assert_eq!(server.request_count(), 0);
}

#[tokio::test]
async fn invalid_selector_no_request() {
	let server = Server::start("200 OK", PRODUCTS).await;
	let scraper = HtmlScraper::new(&Config::default()).unwrap();

	let err = scraper
		.scrape(&server.url, &[FieldRule::text("price", "..price[")], None)
		.await
		.unwrap_err();

	assert_matches!(err, FetchError::Selector(_));
	assert_eq!(server.request_count(), 0);
}

#[tokio::test]
async fn slow_server_times_out() {
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let url = Url::parse(&format!("http://{}/", listener.local_addr().unwrap())).unwrap();

	// accepts connections but never answers
	tokio::spawn(async move {
		let mut sockets = Vec::new();
		while let Ok((socket, _)) = listener.accept().await {
			sockets.push(socket);
		}
	});

	let config = Config::builder().request_timeout_secs(1).build();
	let scraper = HtmlScraper::new(&config).unwrap();

	let err = tokio::time::timeout(
		Duration::from_secs(10),
		scraper.scrape(&url, &rules(), None),
	)
	.await
	.expect("the request timeout should have fired first")
	.unwrap_err();

	assert_matches!(err, FetchError::BadRequest(..));
}

#[tokio::test]
async fn manual_trigger_stores_served_records() {
	let server = Server::start("200 OK", PRODUCTS).await;
	let harvester = Harvester::new(MemoryStore::new(), &Config::default()).unwrap();

	let task = harvester
		.tasks()
		.create_task(
			TaskDefinition::builder()
				.name("shop")
				.target_url(server.url.as_str())
				.rules(rules())
				.build(),
			OWNER,
		)
		.await
		.unwrap();

	let task = harvester.tasks().trigger_task(task.id, OWNER).await.unwrap();
	assert_eq!(task.status, TaskStatus::Pending);

	let entries = harvester
		.tasks()
		.list_data_entries(task.id, OWNER, 0, 10)
		.await
		.unwrap();

	assert_eq!(entries.total, 2);
	assert_eq!(entries.items[0].data["price"], "10 EUR");
	assert_eq!(entries.items[0].source_url, server.url);
	assert_eq!(
		entries.items[0].captured_at, entries.items[1].captured_at,
		"entries of one run share their capture time"
	);
}

#[tokio::test]
async fn unreachable_source_fails_both_paths() {
	let harvester = Harvester::new(MemoryStore::new(), &Config::default()).unwrap();

	let task = harvester
		.tasks()
		.create_task(
			TaskDefinition::builder()
				.name("gone")
				.target_url("http://127.0.0.1:1/")
				.rules(rules())
				.cron_expression("0 0 12 * * ?")
				.build(),
			OWNER,
		)
		.await
		.unwrap();

	// cron path: absorbed
	harvester.scheduler().fire(task.id).await;

	let fired = harvester.tasks().get_task(task.id, OWNER).await.unwrap();
	assert_eq!(fired.status, TaskStatus::Failed);
	assert!(
		fired.last_run_message.as_deref().unwrap().starts_with("Failed: "),
		"unexpected message {:?}",
		fired.last_run_message
	);
	assert!(harvester.scheduler().is_armed(task.id), "still armed");

	// manual path: reported
	let err = harvester.tasks().trigger_task(task.id, OWNER).await.unwrap_err();
	assert_matches!(err, Error::Fetch(FetchError::BadRequest(..)));
	assert!(err.is_network_related());

	let triggered = harvester.tasks().get_task(task.id, OWNER).await.unwrap();
	assert_eq!(triggered.status, TaskStatus::Failed);
}
