//! Authenticated HTTP gateway for the PixelPen snippet platform: bearer injection, single-flight
//! credential refresh, pluggable credential stores, and a Piston code runner.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod error;
pub mod exec;
pub mod gateway;
pub mod http;
pub mod obs;
pub mod session;
pub mod store;
#[cfg(test)]
pub mod _preludet {
	//! Scripted in-process transport and fixtures for deterministic unit tests.

	pub use crate::_prelude::*;

	// crates.io
	use http::{Method, header::AUTHORIZATION};
	use tokio::sync::Semaphore;
	// self
	use crate::{
		auth::Credential,
		config::GatewayConfig,
		error::TransportError,
		gateway::Gateway,
		http::{HttpRequest, HttpResponse, HttpTransport, TransportFuture},
		store::MemoryStore,
	};

	/// Base URL shared by unit-test gateways.
	pub const TEST_BASE_URL: &str = "http://pixelpen.test/api/v1/";

	type Responder = dyn Fn(&ScriptedCall) -> (u16, String) + Send + Sync;

	/// One request observed by [`ScriptedTransport`].
	#[derive(Clone, Debug)]
	pub struct ScriptedCall {
		/// HTTP method.
		pub method: Method,
		/// Percent-encoded URI path.
		pub path: String,
		/// Raw `Authorization` header, if any.
		pub authorization: Option<String>,
		/// Request body.
		pub body: Vec<u8>,
	}
	impl ScriptedCall {
		/// Returns `true` for calls to the refresh endpoint.
		pub fn is_refresh(&self) -> bool {
			self.path.ends_with("/users/refresh-token")
		}

		/// Returns `true` for calls to the logout endpoint.
		pub fn is_logout(&self) -> bool {
			self.path.ends_with("/users/logout")
		}
	}

	/// Transport answering from a closure and recording every call.
	///
	/// Refresh calls can be held behind a gate so tests decide exactly when the leader's
	/// refresh resolves. Logout calls can be made to never answer.
	#[derive(Clone)]
	pub struct ScriptedTransport {
		responder: Arc<Responder>,
		calls: Arc<Mutex<Vec<ScriptedCall>>>,
		refresh_gate: Option<Arc<Semaphore>>,
		hang_logout: bool,
		fail: bool,
	}
	impl ScriptedTransport {
		/// Answers every call with `responder(call)`.
		pub fn new(
			responder: impl 'static + Send + Sync + Fn(&ScriptedCall) -> (u16, String),
		) -> Self {
			Self {
				responder: Arc::new(responder),
				calls: Default::default(),
				refresh_gate: None,
				hang_logout: false,
				fail: false,
			}
		}

		/// Fails every call with an IO error.
		pub fn failing() -> Self {
			Self { fail: true, ..Self::new(|_| (200, String::new())) }
		}

		/// Holds refresh calls until [`ScriptedTransport::open_refresh_gate`].
		pub fn gate_refresh(mut self) -> Self {
			self.refresh_gate = Some(Arc::new(Semaphore::new(0)));

			self
		}

		/// Releases every held and future refresh call.
		pub fn open_refresh_gate(&self) {
			if let Some(gate) = &self.refresh_gate {
				gate.close();
			}
		}

		/// Leaves logout calls pending forever.
		pub fn hang_logout(mut self) -> Self {
			self.hang_logout = true;

			self
		}

		/// Yields until at least `count` recorded calls satisfy `predicate`.
		pub async fn wait_for_calls(
			&self,
			predicate: impl Fn(&ScriptedCall) -> bool,
			count: usize,
		) {
			while self.calls_matching(&predicate).len() < count {
				tokio::task::yield_now().await;
			}
		}

		/// Every call observed so far, in dispatch order.
		pub fn calls(&self) -> Vec<ScriptedCall> {
			self.calls.lock().clone()
		}

		/// Calls satisfying `predicate`, in dispatch order.
		pub fn calls_matching(
			&self,
			predicate: impl Fn(&ScriptedCall) -> bool,
		) -> Vec<ScriptedCall> {
			self.calls.lock().iter().filter(|call| predicate(call)).cloned().collect()
		}
	}
	impl HttpTransport for ScriptedTransport {
		fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
			let call = ScriptedCall {
				method: request.method().clone(),
				path: request.uri().path().to_owned(),
				authorization: request
					.headers()
					.get(AUTHORIZATION)
					.and_then(|value| value.to_str().ok())
					.map(str::to_owned),
				body: request.body().clone(),
			};

			self.calls.lock().push(call.clone());

			Box::pin(async move {
				if self.fail {
					return Err(TransportError::Io(std::io::Error::other("connection reset")));
				}
				if let Some(gate) = self.refresh_gate.as_ref().filter(|_| call.is_refresh()) {
					// Resolves with an error once the gate is closed.
					let _ = gate.acquire().await;
				}
				if self.hang_logout && call.is_logout() {
					std::future::pending::<()>().await;
				}

				let (status, body) = (self.responder)(&call);
				let mut response = HttpResponse::new(body.into_bytes());

				*response.status_mut() = http::StatusCode::from_u16(status)
					.expect("Scripted status code should be valid.");

				Ok(response)
			})
		}
	}

	/// Gateway configuration rooted at [`TEST_BASE_URL`].
	pub fn test_config() -> GatewayConfig {
		GatewayConfig::builder()
			.base_url_str(TEST_BASE_URL)
			.expect("Base URL fixture should parse.")
			.build()
			.expect("Gateway config fixture should build.")
	}

	/// Builds a gateway over `transport` with an in-memory store seeded with `token`.
	pub fn scripted_gateway(
		transport: ScriptedTransport,
		token: Option<&str>,
	) -> (Gateway<ScriptedTransport>, MemoryStore) {
		let store = token
			.map(|token| MemoryStore::with_credential(Credential::new(token)))
			.unwrap_or_default();
		let gateway = Gateway::with_transport(test_config(), Arc::new(store.clone()), transport);

		(gateway, store)
	}
}

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use ::http as http_types;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
