#![cfg(feature = "reqwest")]

mod common;

// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use pixelpen_gateway::{
	config::PistonConfig,
	exec::{CodeRunner, ExecError, ExecutionRequest},
	url::Url,
};

fn runner(server: &MockServer) -> CodeRunner<pixelpen_gateway::http::ReqwestTransport> {
	let config = PistonConfig::new(
		Url::parse(&server.url("/api/v2/piston")).expect("Mock Piston URL should parse."),
	)
	.expect("Piston config should build for the mock server.");

	CodeRunner::with_transport(config, common::transport())
}

#[tokio::test]
async fn executes_snippet_with_title_and_stdin() {
	let server = MockServer::start_async().await;
	let execute = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/v2/piston/execute").json_body(json!({
				"language": "python",
				"version": "3.10.0",
				"files": [{ "name": "echo.py", "content": "print(input())" }],
				"stdin": "ping"
			}));
			then.status(200).header("content-type", "application/json").body(
				"{\"language\":\"python\",\"version\":\"3.10.0\",\"run\":{\"stdout\":\"ping\\n\",\"stderr\":\"\",\"output\":\"ping\\n\",\"code\":0,\"signal\":null}}",
			);
		})
		.await;
	let output = runner(&server)
		.run(&ExecutionRequest::new("python", "print(input())").title("echo.py").stdin("ping"))
		.await
		.expect("Execution should succeed.");

	execute.assert_calls_async(1).await;

	assert_eq!(output.stdout, "ping\n");
	assert_eq!(output.code, Some(0));
	assert!(output.succeeded());
}

#[tokio::test]
async fn unknown_languages_never_reach_piston() {
	let server = MockServer::start_async().await;
	let execute = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/v2/piston/execute");
			then.status(200).body("{}");
		})
		.await;
	let err = runner(&server)
		.run(&ExecutionRequest::new("cobol", "DISPLAY 'HI'."))
		.await
		.expect_err("Unknown languages must fail locally.");

	assert!(matches!(err, ExecError::UnknownLanguage { .. }));

	execute.assert_calls_async(0).await;
}
