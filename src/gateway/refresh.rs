//! Refresh and logout calls issued by the refresh leader.
//!
//! Both calls bypass [`Gateway::send`] so they can never trigger another recovery cycle.

// self
use crate::{
	_prelude::*,
	auth::Credential,
	error::RefreshError,
	gateway::{ApiRequest, ApiResponse, Gateway},
	http::HttpTransport,
	obs::{self, GatewayOp, OpOutcome, OpSpan},
};

impl<T> Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	/// Obtains a new credential and persists it, bounded by the configured refresh timeout.
	pub(super) async fn refresh_credential(&self) -> Result<Credential, RefreshError> {
		const OP: GatewayOp = GatewayOp::Refresh;

		let span = OpSpan::new(OP, "refresh_credential");

		obs::record_op_outcome(OP, OpOutcome::Attempt);
		self.metrics.record_refresh();

		let call = self.call_refresh_endpoint();
		let result = match self.config.refresh_timeout {
			Some(after) => span
				.instrument(tokio::time::timeout(after.unsigned_abs(), call))
				.await
				.unwrap_or(Err(RefreshError::Timeout { after })),
			None => span.instrument(call).await,
		};
		let result = match result {
			Ok(credential) => match self.store.set(credential.clone()).await {
				Ok(()) => Ok(credential),
				Err(e) => Err(RefreshError::Store(e)),
			},
			Err(e) => Err(e),
		};

		obs::record_result(OP, &result);

		result
	}

	async fn call_refresh_endpoint(&self) -> Result<Credential, RefreshError> {
		// The session cookie authenticates this call; a bearer would be the expired one.
		let request = ApiRequest::post(self.config.refresh_path.as_str())
			.to_http(&self.config, None)
			.map_err(|e| RefreshError::Request { message: e.to_string() })?;
		let response = ApiResponse::from(
			self.transport.execute(request).await.map_err(|e| RefreshError::Transport(Arc::new(e)))?,
		);

		if !response.is_success() {
			return Err(RefreshError::Rejected {
				status: response.status().as_u16(),
				message: response.message_or_reason(),
			});
		}

		response
			.access_token()
			.map_err(|e| RefreshError::MalformedBody(Arc::new(e)))?
			.ok_or(RefreshError::MissingAccessToken)
	}

	/// Sends the logout notification without holding up the caller.
	///
	/// The call runs on the current Tokio runtime, bounded by the refresh timeout when one is
	/// configured. Outside a runtime it is awaited in place.
	pub(super) async fn spawn_logout(&self, stale: Option<Credential>) {
		let Ok(handle) = tokio::runtime::Handle::try_current() else {
			return self.notify_logout(stale.as_ref()).await;
		};
		let gateway = self.clone();

		handle.spawn(async move {
			let notify = gateway.notify_logout(stale.as_ref());

			match gateway.config.refresh_timeout {
				Some(after) => {
					if tokio::time::timeout(after.unsigned_abs(), notify).await.is_err() {
						obs::debug_event(GatewayOp::Logout, "Logout notification timed out.");
					}
				},
				None => notify.await,
			}
		});
	}

	/// Tells the backend the session ended; failures are logged and otherwise ignored.
	pub(super) async fn notify_logout(&self, stale: Option<&Credential>) {
		const OP: GatewayOp = GatewayOp::Logout;

		let span = OpSpan::new(OP, "notify_logout");

		obs::record_op_outcome(OP, OpOutcome::Attempt);

		let result = span.instrument(self.post_logout(stale)).await;

		obs::record_result(OP, &result);

		if let Err(e) = &result {
			obs::warn_event(OP, "Logout notification failed.", e);
		}
	}

	async fn post_logout(&self, stale: Option<&Credential>) -> Result<()> {
		let request =
			ApiRequest::post(self.config.logout_path.as_str()).to_http(&self.config, stale)?;

		ApiResponse::from(self.transport.execute(request).await?).error_for_status()?;

		Ok(())
	}
}
