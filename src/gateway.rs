//! Authenticated request gateway with single-flight credential refresh.
//!
//! [`Gateway::send`] attaches the stored credential to every call. When the server answers
//! 401 on the first attempt, the caller either becomes the refresh leader or queues behind the
//! running refresh through the [`RefreshCoordinator`]. Every queued caller is replayed once with
//! the same refreshed credential. A refresh failure clears the store, notifies the logout
//! endpoint, and rejects every queued caller with the same [`RefreshError`].

pub mod coordinator;
pub mod request;
pub mod response;

mod metrics;
mod refresh;

pub use coordinator::*;
pub use metrics::GatewayMetrics;
pub use request::*;
pub use response::*;

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::Credential,
	config::GatewayConfig,
	error::RefreshError,
	http::HttpTransport,
	obs::{self, GatewayOp, OpOutcome, OpSpan},
	store::CredentialStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Gateway specialized for the crate's default reqwest transport.
pub type ReqwestGateway = Gateway<ReqwestTransport>;

/// Attaches bearer credentials to outbound API calls and recovers once from expired ones.
///
/// Clones share the transport, the credential store, the metrics, and the refresh state, so a
/// single refresh covers every clone.
pub struct Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	/// Transport used for every outbound request, including refresh and logout.
	pub transport: Arc<T>,
	/// Store holding the active credential.
	pub store: Arc<dyn CredentialStore>,
	/// Endpoint configuration.
	pub config: GatewayConfig,
	/// Shared counters for gateway traffic.
	pub metrics: Arc<GatewayMetrics>,
	coordinator: RefreshCoordinator,
}
impl<T> Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a gateway over a caller-provided transport.
	pub fn with_transport(
		config: GatewayConfig,
		store: Arc<dyn CredentialStore>,
		transport: impl Into<Arc<T>>,
	) -> Self {
		Self {
			transport: transport.into(),
			store,
			config,
			metrics: Default::default(),
			coordinator: Default::default(),
		}
	}

	/// Returns the credential currently held by the store.
	pub async fn credential(&self) -> Result<Option<Credential>> {
		Ok(self.store.get().await?)
	}

	/// Shared traffic counters.
	pub fn metrics(&self) -> &GatewayMetrics {
		&self.metrics
	}

	/// Endpoint configuration.
	pub fn config(&self) -> &GatewayConfig {
		&self.config
	}

	/// Credential store backing this gateway.
	pub fn store(&self) -> &Arc<dyn CredentialStore> {
		&self.store
	}

	/// Returns `true` while a refresh is running.
	pub fn is_refreshing(&self) -> bool {
		self.coordinator.is_refreshing()
	}

	/// Sends `request`, recovering once from a 401 by refreshing the credential.
	///
	/// Every status other than a terminal 401 is returned as `Ok`; use
	/// [`ApiResponse::error_for_status`] or [`Gateway::send_json`] to turn failures into errors.
	pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
		const OP: GatewayOp = GatewayOp::Send;

		let span = OpSpan::new(OP, "send");

		obs::record_op_outcome(OP, OpOutcome::Attempt);

		let result = span.instrument(self.send_attempts(&request)).await;

		obs::record_result(OP, &result);

		result
	}

	/// Sends `request` and decodes the `data` payload of a 2xx envelope.
	pub async fn send_json<D>(&self, request: ApiRequest) -> Result<D>
	where
		D: DeserializeOwned,
	{
		let response = self.send(request).await?.error_for_status()?;

		Ok(response.data()?)
	}

	/// Sends `request` without a credential and without 401 recovery.
	///
	/// Used for endpoints that issue credentials, where a 401 means bad input rather than an
	/// expired session.
	pub async fn send_public(&self, request: ApiRequest) -> Result<ApiResponse> {
		const OP: GatewayOp = GatewayOp::Send;

		let span = OpSpan::new(OP, "send_public");

		obs::record_op_outcome(OP, OpOutcome::Attempt);

		let result = span.instrument(self.dispatch(&request, None)).await;

		obs::record_result(OP, &result);

		result
	}

	async fn send_attempts(&self, request: &ApiRequest) -> Result<ApiResponse> {
		self.metrics.record_request();

		let mut attempt = Attempt::Initial;
		let mut credential = self.store.get().await?;

		loop {
			let response = self.dispatch(request, credential.as_ref()).await?;

			if !response.is_unauthorized() {
				return Ok(response);
			}
			if !attempt.may_recover() {
				return Err(Error::Unauthorized { message: response.message_or_reason() });
			}

			credential = Some(self.recover(credential).await?);
			attempt = Attempt::Replay;

			self.metrics.record_replay();
			obs::debug_event(GatewayOp::Send, "Replaying request with refreshed credential.");
		}
	}

	async fn dispatch(
		&self,
		request: &ApiRequest,
		credential: Option<&Credential>,
	) -> Result<ApiResponse> {
		let wire = request.to_http(&self.config, credential)?;

		Ok(self.transport.execute(wire).await?.into())
	}

	/// Produces the credential to replay with after a 401 sent with `stale`.
	async fn recover(&self, stale: Option<Credential>) -> Result<Credential> {
		match self.coordinator.acquire_or_join() {
			Ticket::Leader(lease) => self.lead_refresh(lease, stale.as_ref()).await,
			Ticket::Follower(pending) => {
				self.metrics.record_queued();

				Ok(pending.wait().await?)
			},
		}
	}

	async fn lead_refresh(
		&self,
		lease: RefreshLease,
		stale: Option<&Credential>,
	) -> Result<Credential> {
		// Another refresh or a login may have replaced the credential after `stale` was sent.
		let current = match self.store.get().await {
			Ok(current) => current,
			Err(e) => {
				lease.settle(Err(RefreshError::Store(e.clone())));

				return Err(e.into());
			},
		};

		// A newer credential is adopted as the refresh result without calling the refresh
		// endpoint. See "Stale credential shortcut" in DESIGN.md.
		if let Some(current) = current.filter(|current| Some(current) != stale) {
			obs::debug_event(GatewayOp::Refresh, "Stored credential changed; skipping refresh.");
			lease.settle(Ok(current.clone()));

			return Ok(current);
		}

		match self.refresh_credential().await {
			Ok(credential) => {
				lease.settle(Ok(credential.clone()));

				Ok(credential)
			},
			Err(e) => {
				self.metrics.record_refresh_failure();
				obs::warn_event(GatewayOp::Refresh, "Credential refresh failed; logging out.", &e);

				if let Err(clear) = self.store.clear().await {
					obs::warn_event(GatewayOp::Logout, "Failed to clear credential store.", &clear);
				}

				lease.settle(Err(e.clone()));
				self.spawn_logout(stale.cloned()).await;

				Err(e.into())
			},
		}
	}
}
#[cfg(feature = "reqwest")]
impl Gateway<ReqwestTransport> {
	/// Creates a gateway backed by the default reqwest transport.
	pub fn new(config: GatewayConfig, store: Arc<dyn CredentialStore>) -> Result<Self> {
		Ok(Self::with_transport(config, store, ReqwestTransport::new()?))
	}
}
impl<T> Clone for Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			store: self.store.clone(),
			config: self.config.clone(),
			metrics: self.metrics.clone(),
			coordinator: self.coordinator.clone(),
		}
	}
}
impl<T> Debug for Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Gateway")
			.field("base_url", &self.config.base_url.as_str())
			.field("refreshing", &self.coordinator.is_refreshing())
			.finish()
	}
}
