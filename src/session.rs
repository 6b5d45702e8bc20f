//! Session lifecycle calls against the PixelPen user API.
//!
//! Login and registration issue credentials and therefore bypass 401 recovery. Auth checks and
//! logout run through [`Gateway::send`] so an expired credential is refreshed first.

// self
use crate::{
	_prelude::*,
	auth::Credential,
	error::DecodeError,
	gateway::{ApiRequest, ApiResponse, Gateway},
	http::HttpTransport,
	obs::{self, GatewayOp, OpOutcome, OpSpan},
};

const LOGIN_PATH: &str = "users/login";
const REGISTER_PATH: &str = "users/register";
const CHECK_AUTH_PATH: &str = "users/check-auth";
const CHECK_UNIQUE_PATH: &str = "services/checkunique";

/// Account fields whose uniqueness the backend can check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UniqueField {
	/// Account email address.
	Email,
	/// Public handle.
	Username,
}
impl UniqueField {
	/// Path segment understood by the backend.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Email => "email",
			Self::Username => "username",
		}
	}
}
impl Display for UniqueField {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Email + password pair sent to the login endpoint.
#[derive(Clone, Serialize)]
pub struct LoginForm {
	/// Account email address.
	pub email: String,
	/// Plaintext password; sent over TLS only.
	pub password: String,
}
impl Debug for LoginForm {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LoginForm").field("email", &self.email).finish_non_exhaustive()
	}
}

/// New-account details.
#[derive(Clone, Serialize)]
pub struct RegisterForm {
	/// Public handle.
	pub username: String,
	/// Display name.
	pub fullname: String,
	/// Account email address.
	pub email: String,
	/// Plaintext password; sent over TLS only.
	pub password: String,
}
impl Debug for RegisterForm {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RegisterForm")
			.field("username", &self.username)
			.field("fullname", &self.fullname)
			.field("email", &self.email)
			.finish_non_exhaustive()
	}
}

/// Login, registration, and logout on top of a [`Gateway`].
pub struct Session<T>
where
	T: ?Sized + HttpTransport,
{
	gateway: Gateway<T>,
}
impl<T> Session<T>
where
	T: ?Sized + HttpTransport,
{
	/// Wraps `gateway`; the session writes to the gateway's credential store.
	pub fn new(gateway: Gateway<T>) -> Self {
		Self { gateway }
	}

	/// Underlying gateway.
	pub fn gateway(&self) -> &Gateway<T> {
		&self.gateway
	}

	/// Logs in and stores the issued credential.
	pub async fn login(&self, email: &str, password: &str) -> Result<Credential> {
		let form = LoginForm { email: email.to_owned(), password: password.to_owned() };

		self.issue("login", ApiRequest::post(LOGIN_PATH).json(&form)?).await
	}

	/// Creates an account and stores the issued credential.
	pub async fn register(&self, form: &RegisterForm) -> Result<Credential> {
		self.issue("register", ApiRequest::post(REGISTER_PATH).json(form)?).await
	}

	/// Returns whether the backend accepts the current session.
	///
	/// A terminal 401 or a failed refresh means "not authenticated"; other failures propagate.
	pub async fn check_auth(&self) -> Result<bool> {
		match self.gateway.send(ApiRequest::get(CHECK_AUTH_PATH)).await {
			Ok(response) => response.error_for_status().map(|_| true),
			Err(Error::Unauthorized { .. } | Error::Refresh(_)) => Ok(false),
			Err(e) => Err(e),
		}
	}

	/// Ends the session remotely and always clears the local credential.
	///
	/// Only a failure to clear the store is reported; the remote call is best effort.
	pub async fn logout(&self) -> Result<()> {
		const OP: GatewayOp = GatewayOp::Logout;

		let remote = self
			.gateway
			.send(ApiRequest::post(self.gateway.config.logout_path.as_str()))
			.await
			.and_then(ApiResponse::error_for_status);

		if let Err(e) = &remote {
			obs::warn_event(OP, "Remote logout failed; clearing local session anyway.", e);
		}

		self.gateway.store.clear().await?;

		Ok(())
	}

	/// Asks whether `value` is still free for `field`.
	pub async fn is_available(&self, field: UniqueField, value: &str) -> Result<bool> {
		let request = ApiRequest::get(CHECK_UNIQUE_PATH).segment(field.as_str()).segment(value);
		let response = self.gateway.send(request).await?.error_for_status()?;

		Ok(response.data()?)
	}

	async fn issue(&self, stage: &'static str, request: ApiRequest) -> Result<Credential> {
		const OP: GatewayOp = GatewayOp::Session;

		let span = OpSpan::new(OP, stage);

		obs::record_op_outcome(OP, OpOutcome::Attempt);

		let result = span
			.instrument(async {
				let response = self.gateway.send_public(request).await?.error_for_status()?;
				let status = response.status().as_u16();
				let credential =
					response.access_token()?.ok_or(DecodeError::MissingData { status })?;

				self.gateway.store.set(credential.clone()).await?;

				Ok::<_, Error>(credential)
			})
			.await;

		obs::record_result(OP, &result);

		result
	}
}
impl<T> Clone for Session<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self { gateway: self.gateway.clone() }
	}
}
impl<T> Debug for Session<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Session").field("gateway", &self.gateway).finish()
	}
}
