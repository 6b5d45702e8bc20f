//! Demonstrates three concurrent calls hitting an expired credential and sharing a single
//! refresh, using the default reqwest transport against a local mock backend.

// std
use std::{sync::Arc, time::Duration};
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use pixelpen_gateway::{
	auth::Credential,
	config::GatewayConfig,
	gateway::{ApiRequest, ReqwestGateway},
	store::MemoryStore,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/v1/users/refresh-token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"statusCode\":200,\"data\":{\"accessToken\":\"demo-fresh\"},\"message\":\"Token refreshed successfully\",\"success\":true}")
				.delay(Duration::from_millis(200));
		})
		.await;
	let _expired = server
		.mock_async(|when, then| {
			when.method(GET).header("authorization", "Bearer demo-stale");
			then.status(401).body("{\"statusCode\":401,\"success\":false,\"message\":\"Token expired\"}");
		})
		.await;
	let _accepted = server
		.mock_async(|when, then| {
			when.method(GET).header("authorization", "Bearer demo-fresh");
			then.status(200).body("{\"statusCode\":200,\"data\":\"ok\",\"message\":\"Fetched\",\"success\":true}");
		})
		.await;
	let config = GatewayConfig::builder().base_url_str(&server.url("/api/v1"))?.build()?;
	let store = MemoryStore::with_credential(Credential::new("demo-stale"));
	let gateway = ReqwestGateway::new(config, Arc::new(store.clone()))?;
	let (a, b, c) = tokio::join!(
		gateway.send_json::<String>(ApiRequest::get("snippets/a")),
		gateway.send_json::<String>(ApiRequest::get("snippets/b")),
		gateway.send_json::<String>(ApiRequest::get("snippets/c")),
	);

	println!("Replayed results: {}, {}, {}.", a?, b?, c?);
	println!(
		"Refresh calls: {}; callers queued behind the leader: {}.",
		gateway.metrics.refreshes(),
		gateway.metrics.queued()
	);

	refresh.assert_calls_async(1).await;

	Ok(())
}
