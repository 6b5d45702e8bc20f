//! Immutable request descriptions and the explicit replay marker.

// crates.io
use http::{
	Method,
	header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue},
};
// self
use crate::{
	_prelude::*,
	auth::Credential,
	config::GatewayConfig,
	error::ConfigError,
	http::HttpRequest,
};

/// Which pass over a request the gateway is making.
///
/// Recovery from a 401 is only allowed on the [`Attempt::Initial`] pass, so a call is replayed
/// at most once no matter how many refresh cycles happen around it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Attempt {
	/// First dispatch with whatever credential the store held.
	Initial,
	/// Single replay after the credential was refreshed.
	Replay,
}
impl Attempt {
	/// Returns `true` when a 401 on this attempt may still be recovered.
	pub const fn may_recover(self) -> bool {
		matches!(self, Self::Initial)
	}
}

/// Description of an API call relative to the gateway's base URL.
///
/// The gateway never mutates a request; replays rebuild the wire request from the same
/// description with the new credential.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiRequest {
	method: Method,
	path: String,
	segments: Vec<String>,
	query: Vec<(String, String)>,
	headers: HeaderMap,
	body: Option<Vec<u8>>,
}
impl ApiRequest {
	/// Creates a request for `method` and `path`.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			segments: Vec::new(),
			query: Vec::new(),
			headers: HeaderMap::new(),
			body: None,
		}
	}

	/// Shorthand for a `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	/// Shorthand for a `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::POST, path)
	}

	/// Shorthand for a `PUT` request.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::PUT, path)
	}

	/// Shorthand for a `PATCH` request.
	pub fn patch(path: impl Into<String>) -> Self {
		Self::new(Method::PATCH, path)
	}

	/// Shorthand for a `DELETE` request.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::DELETE, path)
	}

	/// Appends one raw path segment after [`ApiRequest::path`].
	///
	/// The value is percent-encoded on the wire, so `/`, `?` and `#` stay inside the segment.
	pub fn segment(mut self, value: impl Into<String>) -> Self {
		self.segments.push(value.into());

		self
	}

	/// Appends a query pair.
	pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
		self.query.push((key.into(), value.to_string()));

		self
	}

	/// Sets a header, replacing any previous value for `name`.
	pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Serializes `payload` as the JSON body.
	pub fn json<T>(mut self, payload: &T) -> Result<Self, ConfigError>
	where
		T: ?Sized + Serialize,
	{
		let body =
			serde_json::to_vec(payload).map_err(|source| ConfigError::RequestBody { source })?;

		self.headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
		self.body = Some(body);

		Ok(self)
	}

	/// Sets a raw body with its content type.
	pub fn body(mut self, body: impl Into<Vec<u8>>, content_type: HeaderValue) -> Self {
		self.headers.insert(CONTENT_TYPE, content_type);
		self.body = Some(body.into());

		self
	}

	/// HTTP method.
	pub fn method(&self) -> &Method {
		&self.method
	}

	/// Path relative to the API base URL.
	pub fn path(&self) -> &str {
		&self.path
	}

	/// Unencoded path segments appended after the path.
	pub fn segments(&self) -> &[String] {
		&self.segments
	}

	/// Query pairs in insertion order.
	pub fn query_pairs(&self) -> &[(String, String)] {
		&self.query
	}

	/// Caller-supplied headers.
	pub fn headers(&self) -> &HeaderMap {
		&self.headers
	}

	/// Raw body, if any.
	pub fn body_bytes(&self) -> Option<&[u8]> {
		self.body.as_deref()
	}

	/// Builds the wire request, attaching `Authorization: Bearer` when a credential is present.
	pub(crate) fn to_http(
		&self,
		config: &GatewayConfig,
		credential: Option<&Credential>,
	) -> Result<HttpRequest, ConfigError> {
		let mut url = config.endpoint(&self.path)?;

		if !self.segments.is_empty() {
			url.path_segments_mut()
				.map_err(|()| ConfigError::InvalidPath {
					path: self.path.clone(),
					source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
				})?
				.pop_if_empty()
				.extend(&self.segments);
		}
		if !self.query.is_empty() {
			url.query_pairs_mut().extend_pairs(self.query.iter());
		}

		let mut request = http::Request::builder()
			.method(self.method.clone())
			.uri(url.as_str())
			.body(self.body.clone().unwrap_or_default())?;
		let headers = request.headers_mut();

		headers.extend(self.headers.clone());

		if !headers.contains_key(ACCEPT) {
			headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
		}
		if let Some(credential) = credential {
			headers.insert(AUTHORIZATION, credential.bearer_header()?);
		}

		Ok(request)
	}
}
