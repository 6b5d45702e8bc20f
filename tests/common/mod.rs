//! Shared fixtures for reqwest + httpmock integration tests.

#![allow(dead_code)]

// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
// self
use pixelpen_gateway::{
	auth::Credential,
	config::GatewayConfig,
	gateway::ReqwestGateway,
	http::ReqwestTransport,
	reqwest::{Client, redirect::Policy},
	store::MemoryStore,
};

/// Envelope returned by protected endpoints once the credential is accepted.
pub const PROTECTED_OK: &str =
	"{\"statusCode\":200,\"data\":{\"title\":\"hello\"},\"message\":\"Snippet fetched\",\"success\":true}";
/// Body the backend's auth middleware returns for an expired token.
pub const EXPIRED: &str =
	"{\"statusCode\":401,\"success\":false,\"message\":\"Token expired, please log in again\",\"errors\":[]}";

/// Gateway configuration pointing at the mock server's `/api/v1/`.
pub fn config(server: &MockServer) -> GatewayConfig {
	GatewayConfig::builder()
		.base_url_str(&server.url("/api/v1"))
		.expect("Mock server URL should parse.")
		.build()
		.expect("Gateway config should build for the mock server.")
}

/// Reqwest transport with a cookie jar, as the production default.
pub fn transport() -> ReqwestTransport {
	let client = Client::builder()
		.cookie_store(true)
		.redirect(Policy::none())
		.build()
		.expect("Failed to build reqwest client for tests.");

	ReqwestTransport::with_client(client)
}

/// Builds a gateway with an in-memory store seeded with `token`.
pub fn gateway(server: &MockServer, token: Option<&str>) -> (ReqwestGateway, MemoryStore) {
	let store = token
		.map(|token| MemoryStore::with_credential(Credential::new(token)))
		.unwrap_or_default();
	let gateway =
		ReqwestGateway::with_transport(config(server), Arc::new(store.clone()), transport());

	(gateway, store)
}

/// Envelope carrying a freshly issued access token.
pub fn token_body(token: &str) -> String {
	format!(
		"{{\"statusCode\":200,\"data\":{{\"accessToken\":\"{token}\"}},\"message\":\"Token refreshed successfully\",\"success\":true}}"
	)
}
