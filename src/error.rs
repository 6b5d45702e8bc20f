//! Gateway-level error types shared across the transport, refresh, session, and store layers.

// self
use crate::_prelude::*;

/// Gateway-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical gateway error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Credential store failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Credential refresh failed and the session was torn down.
	#[error(transparent)]
	Refresh(#[from] RefreshError),
	/// Response body could not be decoded.
	#[error(transparent)]
	Decode(#[from] DecodeError),
	/// Remote code execution failed.
	#[error(transparent)]
	Exec(#[from] crate::exec::ExecError),

	/// The server rejected the credential again after a refresh-and-replay.
	#[error("Request is unauthorized: {message}.")]
	Unauthorized {
		/// Server-supplied message, or a generic label when the body carried none.
		message: String,
	},
	/// The server answered with a non-success status.
	#[error("Request failed with status {status}: {message}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Server-supplied message, or a generic label when the body carried none.
		message: String,
	},
}
impl From<crate::config::GatewayConfigError> for Error {
	fn from(e: crate::config::GatewayConfigError) -> Self {
		Self::Config(e.into())
	}
}

/// Configuration and request-construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] http::Error),
	/// Request path cannot be joined onto the base URL.
	#[error("Request path `{path}` is invalid.")]
	InvalidPath {
		/// Offending path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Credential cannot be encoded into an `Authorization` header.
	#[error("Credential contains characters that are not valid in an HTTP header.")]
	InvalidCredentialHeader(#[from] http::header::InvalidHeaderValue),
	/// Request body could not be serialized.
	#[error("Request body could not be serialized.")]
	RequestBody {
		/// Underlying serialization failure.
		#[source]
		source: serde_json::Error,
	},
	/// Gateway configuration failed validation.
	#[error(transparent)]
	Gateway(#[from] crate::config::GatewayConfigError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {target}.")]
	Network {
		/// Endpoint being called when the failure happened.
		target: String,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error raised while calling `target`.
	pub fn network(
		target: impl Into<String>,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Network { target: target.into(), source: Box::new(src) }
	}
}

/// Reasons a credential refresh failed.
///
/// The value is cloned to every caller queued behind the refresh, so every variant keeps
/// its payload behind cheap, shareable types.
#[derive(Clone, Debug, ThisError)]
pub enum RefreshError {
	/// Refresh endpoint could not be reached.
	#[error("Refresh endpoint could not be reached.")]
	Transport(#[source] Arc<TransportError>),
	/// Refresh endpoint answered with a non-success status.
	#[error("Refresh endpoint rejected the session with status {status}: {message}.")]
	Rejected {
		/// HTTP status code.
		status: u16,
		/// Server-supplied message, or a generic label when the body carried none.
		message: String,
	},
	/// Refresh endpoint answered with a body that does not describe a token.
	#[error("Refresh endpoint returned a malformed body.")]
	MalformedBody(#[source] Arc<DecodeError>),
	/// Refresh endpoint succeeded but the token was empty.
	#[error("Refresh endpoint response is missing an access token.")]
	MissingAccessToken,
	/// Refreshed credential could not be persisted.
	#[error("Refreshed credential could not be stored.")]
	Store(#[source] crate::store::StoreError),
	/// Refresh did not complete within the configured timeout.
	#[error("Refresh did not complete within {after}.")]
	Timeout {
		/// Configured timeout.
		after: Duration,
	},
	/// The refresh leader was dropped before it settled the queue.
	#[error("Refresh was abandoned before it completed.")]
	Abandoned,
	/// Request construction for the refresh call failed.
	#[error("Refresh request could not be built: {message}.")]
	Request {
		/// Rendered construction failure.
		message: String,
	},
}

/// JSON decoding failures with field paths.
#[derive(Debug, ThisError)]
pub enum DecodeError {
	/// Body is not valid JSON for the expected shape.
	#[error("Response body does not match the expected shape (status {status}).")]
	Json {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the decoded response.
		status: u16,
	},
	/// Envelope decoded but carried no `data` payload.
	#[error("Response envelope is missing its data payload (status {status}).")]
	MissingData {
		/// HTTP status code of the decoded response.
		status: u16,
	},
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::StoreError;

	#[test]
	fn store_error_converts_into_gateway_error_with_source() {
		let store_error = StoreError::Backend { message: "disk unavailable".into() };
		let error: Error = store_error.clone().into();

		assert!(matches!(error, Error::Storage(_)));
		assert!(error.to_string().contains("disk unavailable"));

		let source = StdError::source(&error)
			.expect("Gateway error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn refresh_error_clones_share_transport_source() {
		let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
		let error = RefreshError::Transport(Arc::new(TransportError::Io(io)));
		let copy = error.clone();

		assert_eq!(error.to_string(), copy.to_string());
		assert!(StdError::source(&copy).is_some());
	}
}
