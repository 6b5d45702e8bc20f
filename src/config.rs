//! Gateway and code-runner configuration with validating builders.
//!
//! The API base URL is normalized to end with `/` so relative request paths such as
//! `snippets/random` or `/users/login` always resolve beneath it.

// std
use std::env;
// self
use crate::{_prelude::*, error::ConfigError};

/// Environment variable read by [`GatewayConfig::from_env`].
pub const BACKEND_URL_ENV: &str = "PIXELPEN_BACKEND_URL";
/// API prefix appended to the backend URL by [`GatewayConfig::from_env`].
pub const API_PREFIX: &str = "api/v1/";
/// Default path of the refresh endpoint, relative to the API base.
pub const DEFAULT_REFRESH_PATH: &str = "users/refresh-token";
/// Default path of the logout endpoint, relative to the API base.
pub const DEFAULT_LOGOUT_PATH: &str = "users/logout";
/// Public Piston deployment used when no runner URL is configured.
pub const DEFAULT_PISTON_URL: &str = "https://emkc.org/api/v2/piston/";

/// Errors raised while constructing or validating configuration.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum GatewayConfigError {
	/// Base URL was never provided.
	#[error("Missing API base URL.")]
	MissingBaseUrl,
	/// Base URL could not be parsed.
	#[error("The {name} URL is invalid: {reason}.")]
	InvalidUrl {
		/// Which URL failed validation.
		name: &'static str,
		/// Rendered parsing failure.
		reason: String,
	},
	/// Only HTTP(S) URLs are supported.
	#[error("The {name} URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// Which URL failed validation.
		name: &'static str,
		/// URL that failed validation.
		url: String,
	},
	/// Endpoint paths must be relative to the base URL.
	#[error("The {name} path must be relative: {path}.")]
	AbsolutePath {
		/// Which path failed validation.
		name: &'static str,
		/// Path that failed validation.
		path: String,
	},
	/// Refresh timeout must be positive.
	#[error("The refresh timeout must be positive.")]
	NonPositiveTimeout,
	/// Environment variable is missing.
	#[error("Environment variable `{0}` is not set.")]
	MissingEnv(&'static str),
}

/// Immutable gateway configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayConfig {
	/// API base URL; always ends with `/`.
	pub base_url: Url,
	/// Refresh endpoint path relative to [`GatewayConfig::base_url`].
	pub refresh_path: String,
	/// Logout endpoint path relative to [`GatewayConfig::base_url`].
	pub logout_path: String,
	/// Upper bound on a single refresh call; `None` waits indefinitely.
	pub refresh_timeout: Option<Duration>,
}
impl GatewayConfig {
	/// Creates a new builder.
	pub fn builder() -> GatewayConfigBuilder {
		GatewayConfigBuilder::default()
	}

	/// Builds a configuration from `PIXELPEN_BACKEND_URL`, appending the `api/v1/` prefix.
	pub fn from_env() -> Result<Self, GatewayConfigError> {
		let backend =
			env::var(BACKEND_URL_ENV).map_err(|_| GatewayConfigError::MissingEnv(BACKEND_URL_ENV))?;
		let backend = normalize_base("backend", parse_url("backend", &backend)?)?;
		let base = backend.join(API_PREFIX).map_err(|e| GatewayConfigError::InvalidUrl {
			name: "backend",
			reason: e.to_string(),
		})?;

		Self::builder().base_url(base).build()
	}

	/// Resolves `path` (leading `/` ignored) beneath the base URL.
	pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
		self.base_url
			.join(path.trim_start_matches('/'))
			.map_err(|source| ConfigError::InvalidPath { path: path.to_owned(), source })
	}

	/// Absolute URL of the refresh endpoint.
	pub fn refresh_url(&self) -> Result<Url, ConfigError> {
		self.endpoint(&self.refresh_path)
	}

	/// Absolute URL of the logout endpoint.
	pub fn logout_url(&self) -> Result<Url, ConfigError> {
		self.endpoint(&self.logout_path)
	}
}

/// Builder for [`GatewayConfig`] values.
#[derive(Debug)]
pub struct GatewayConfigBuilder {
	/// API base URL.
	pub base_url: Option<Url>,
	/// Refresh endpoint path.
	pub refresh_path: String,
	/// Logout endpoint path.
	pub logout_path: String,
	/// Optional refresh timeout.
	pub refresh_timeout: Option<Duration>,
}
impl Default for GatewayConfigBuilder {
	fn default() -> Self {
		Self {
			base_url: None,
			refresh_path: DEFAULT_REFRESH_PATH.into(),
			logout_path: DEFAULT_LOGOUT_PATH.into(),
			refresh_timeout: None,
		}
	}
}
impl GatewayConfigBuilder {
	/// Sets the API base URL.
	pub fn base_url(mut self, url: Url) -> Self {
		self.base_url = Some(url);

		self
	}

	/// Parses and sets the API base URL.
	pub fn base_url_str(mut self, url: &str) -> Result<Self, GatewayConfigError> {
		self.base_url = Some(parse_url("base", url)?);

		Ok(self)
	}

	/// Overrides the refresh endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Overrides the logout endpoint path.
	pub fn logout_path(mut self, path: impl Into<String>) -> Self {
		self.logout_path = path.into();

		self
	}

	/// Bounds every refresh call by `timeout`.
	pub fn refresh_timeout(mut self, timeout: Duration) -> Self {
		self.refresh_timeout = Some(timeout);

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<GatewayConfig, GatewayConfigError> {
		let base_url = self.base_url.ok_or(GatewayConfigError::MissingBaseUrl)?;
		let base_url = normalize_base("base", base_url)?;

		validate_relative("refresh", &self.refresh_path)?;
		validate_relative("logout", &self.logout_path)?;

		if self.refresh_timeout.is_some_and(|timeout| !timeout.is_positive()) {
			return Err(GatewayConfigError::NonPositiveTimeout);
		}

		Ok(GatewayConfig {
			base_url,
			refresh_path: self.refresh_path,
			logout_path: self.logout_path,
			refresh_timeout: self.refresh_timeout,
		})
	}
}

/// Configuration for the Piston code runner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PistonConfig {
	/// Piston API base URL; always ends with `/`.
	pub base_url: Url,
}
impl PistonConfig {
	/// Validates and normalizes a custom Piston deployment URL.
	pub fn new(base_url: Url) -> Result<Self, GatewayConfigError> {
		Ok(Self { base_url: normalize_base("piston", base_url)? })
	}

	/// Points at the public Piston deployment.
	pub fn public() -> Result<Self, GatewayConfigError> {
		Self::new(parse_url("piston", DEFAULT_PISTON_URL)?)
	}

	/// Absolute URL of the `execute` endpoint.
	pub fn execute_url(&self) -> Result<Url, ConfigError> {
		self.base_url
			.join("execute")
			.map_err(|source| ConfigError::InvalidPath { path: "execute".into(), source })
	}
}

fn parse_url(name: &'static str, raw: &str) -> Result<Url, GatewayConfigError> {
	Url::parse(raw.trim())
		.map_err(|e| GatewayConfigError::InvalidUrl { name, reason: e.to_string() })
}

fn normalize_base(name: &'static str, mut url: Url) -> Result<Url, GatewayConfigError> {
	if !matches!(url.scheme(), "http" | "https") {
		return Err(GatewayConfigError::UnsupportedScheme { name, url: url.to_string() });
	}
	if !url.path().ends_with('/') {
		let path = format!("{}/", url.path());

		url.set_path(&path);
	}

	url.set_query(None);
	url.set_fragment(None);

	Ok(url)
}

fn validate_relative(name: &'static str, path: &str) -> Result<(), GatewayConfigError> {
	if path.contains("://") {
		Err(GatewayConfigError::AbsolutePath { name, path: path.to_owned() })
	} else {
		Ok(())
	}
}
