#![cfg(feature = "reqwest")]

mod common;

// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use common::token_body;
use pixelpen_gateway::{
	auth::Credential,
	session::{RegisterForm, Session, UniqueField},
	store::{CredentialStore, FileStore},
};

#[tokio::test]
async fn register_then_logout_round_trip() {
	let server = MockServer::start_async().await;
	let (gateway, store) = common::gateway(&server, None);
	let register = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/v1/users/register").json_body(json!({
				"username": "ada",
				"fullname": "Ada Lovelace",
				"email": "ada@pixelpen.dev",
				"password": "hunter2"
			}));
			then.status(201).header("content-type", "application/json").body(token_body("tok1"));
		})
		.await;
	let logout = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/v1/users/logout").header("authorization", "Bearer tok1");
			then.status(200).body("{\"statusCode\":200,\"data\":{},\"message\":\"User logged out\"}");
		})
		.await;
	let session = Session::new(gateway);
	let form = RegisterForm {
		username: "ada".into(),
		fullname: "Ada Lovelace".into(),
		email: "ada@pixelpen.dev".into(),
		password: "hunter2".into(),
	};
	let credential = session.register(&form).await.expect("Registration should succeed.");

	assert_eq!(credential, Credential::new("tok1"));
	assert_eq!(store.snapshot(), Some(Credential::new("tok1")));

	session.logout().await.expect("Logout should succeed.");

	register.assert_calls_async(1).await;
	logout.assert_calls_async(1).await;

	assert_eq!(store.snapshot(), None);
}

#[tokio::test]
async fn uniqueness_checks_read_boolean_data() {
	let server = MockServer::start_async().await;
	let (gateway, _store) = common::gateway(&server, None);
	let taken = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/services/checkunique/username/ada");
			then.status(200).body(
				"{\"statusCode\":409,\"data\":false,\"message\":\"username is already taken\",\"success\":true}",
			);
		})
		.await;
	let free = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/services/checkunique/email/new@pixelpen.dev");
			then.status(200).body(
				"{\"statusCode\":200,\"data\":true,\"message\":\"email is available\",\"success\":true}",
			);
		})
		.await;
	let session = Session::new(gateway);

	assert!(!session.is_available(UniqueField::Username, "ada").await.expect("Check should succeed."));
	assert!(
		session
			.is_available(UniqueField::Email, "new@pixelpen.dev")
			.await
			.expect("Check should succeed.")
	);

	taken.assert_calls_async(1).await;
	free.assert_calls_async(1).await;
}

#[tokio::test]
async fn file_store_survives_reopen_after_login() {
	let server = MockServer::start_async().await;
	let path = std::env::temp_dir().join(format!("pixelpen-session-{}.json", std::process::id()));
	let store = FileStore::open(&path).expect("File store should open.");
	let gateway = pixelpen_gateway::gateway::ReqwestGateway::with_transport(
		common::config(&server),
		std::sync::Arc::new(store.clone()),
		common::transport(),
	);
	let _login = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/v1/users/login");
			then.status(200).header("content-type", "application/json").body(token_body("persisted"));
		})
		.await;

	Session::new(gateway).login("ada@pixelpen.dev", "hunter2").await.expect("Login should succeed.");

	let reopened = FileStore::open(&path).expect("File store should reopen.");

	assert_eq!(
		reopened.get().await.expect("Reopened store should read."),
		Some(Credential::new("persisted"))
	);
	assert!(reopened.saved_at().is_some());

	reopened.clear().await.expect("Clearing should remove the file.");

	assert!(!path.exists());
}
