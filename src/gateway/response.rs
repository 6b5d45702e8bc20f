//! Buffered API responses and the server's JSON envelopes.
//!
//! Successful PixelPen responses are wrapped as
//! `{ "statusCode": 200, "data": ..., "message": "...", "success": true }` and failures as
//! `{ "statusCode": 401, "success": false, "message": "...", "errors": [] }`.

// std
use std::borrow::Cow;
// crates.io
use http::{StatusCode, header::HeaderMap};
use serde::de::DeserializeOwned;
// self
use crate::{_prelude::*, auth::Credential, error::DecodeError, http::HttpResponse};

/// Success envelope returned by the PixelPen API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEnvelope<T> {
	/// Status code echoed in the body.
	#[serde(default)]
	pub status_code: Option<u16>,
	/// Payload.
	pub data: Option<T>,
	/// Human-readable message.
	#[serde(default)]
	pub message: Option<String>,
	/// Whether the server considers the call successful.
	#[serde(default)]
	pub success: Option<bool>,
}

/// Failure body returned by the PixelPen error middleware.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
	/// Status code echoed in the body.
	#[serde(default)]
	pub status_code: Option<u16>,
	/// Human-readable message.
	#[serde(default)]
	pub message: Option<String>,
	/// Validation details, when any.
	#[serde(default)]
	pub errors: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct AccessTokenPayload {
	#[serde(rename = "accessToken")]
	access_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AccessTokenBody {
	Enveloped { data: AccessTokenPayload },
	Bare(AccessTokenPayload),
}

/// Response with a fully buffered body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiResponse {
	status: StatusCode,
	headers: HeaderMap,
	body: Vec<u8>,
}
impl ApiResponse {
	/// HTTP status code.
	pub fn status(&self) -> StatusCode {
		self.status
	}

	/// Response headers.
	pub fn headers(&self) -> &HeaderMap {
		&self.headers
	}

	/// Raw body bytes.
	pub fn body(&self) -> &[u8] {
		&self.body
	}

	/// Body decoded as UTF-8, replacing invalid sequences.
	pub fn text(&self) -> Cow<'_, str> {
		String::from_utf8_lossy(&self.body)
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		self.status.is_success()
	}

	/// Returns `true` for 401.
	pub fn is_unauthorized(&self) -> bool {
		self.status == StatusCode::UNAUTHORIZED
	}

	/// Decodes the whole body as `T`, reporting the failing field path.
	pub fn json<T>(&self) -> Result<T, DecodeError>
	where
		T: DeserializeOwned,
	{
		let mut de = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut de)
			.map_err(|source| DecodeError::Json { source, status: self.status.as_u16() })
	}

	/// Decodes the success envelope and returns its `data` payload.
	pub fn data<T>(&self) -> Result<T, DecodeError>
	where
		T: DeserializeOwned,
	{
		self.json::<ApiEnvelope<T>>()?
			.data
			.ok_or(DecodeError::MissingData { status: self.status.as_u16() })
	}

	/// Server-supplied `message`, when the body is a JSON object carrying one.
	pub fn message(&self) -> Option<String> {
		self.json::<ErrorBody>().ok().and_then(|body| body.message)
	}

	/// Server message, or the canonical reason phrase when the body carried none.
	pub fn message_or_reason(&self) -> String {
		self.message().unwrap_or_else(|| {
			self.status.canonical_reason().unwrap_or("unknown status").to_owned()
		})
	}

	/// Converts non-2xx responses into [`Error::Status`].
	pub fn error_for_status(self) -> Result<Self> {
		if self.is_success() {
			Ok(self)
		} else {
			Err(Error::Status { status: self.status.as_u16(), message: self.message_or_reason() })
		}
	}

	/// Extracts `accessToken` from either the envelope's `data` or the top level.
	///
	/// Returns `Ok(None)` when the body is a JSON object without a usable token.
	pub(crate) fn access_token(&self) -> Result<Option<Credential>, DecodeError> {
		let payload = match self.json::<AccessTokenBody>()? {
			AccessTokenBody::Enveloped { data } => data,
			AccessTokenBody::Bare(payload) => payload,
		};

		Ok(payload.access_token.map(Credential::new).filter(|credential| !credential.is_blank()))
	}
}
impl From<HttpResponse> for ApiResponse {
	fn from(response: HttpResponse) -> Self {
		let (parts, body) = response.into_parts();

		Self { status: parts.status, headers: parts.headers, body }
	}
}
