//! Remote code execution through the Piston API.
//!
//! The runner never attaches credentials: Piston is a third-party service and knows nothing
//! about PixelPen sessions.

// std
use std::collections::btree_map::Entry;
// crates.io
use http::header::{CONTENT_TYPE, HeaderValue};
// self
use crate::{
	_prelude::*,
	config::PistonConfig,
	error::{ConfigError, DecodeError, TransportError},
	gateway::ApiResponse,
	http::HttpTransport,
	obs::{self, GatewayOp, OpOutcome, OpSpan},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

/// File name used when a snippet has no title.
pub const DEFAULT_FILE_NAME: &str = "astra";

/// Errors raised by [`CodeRunner::run`].
#[derive(Debug, ThisError)]
pub enum ExecError {
	/// No runtime version is known for the language; nothing was sent.
	#[error("No runtime is configured for language `{language}`.")]
	UnknownLanguage {
		/// Platform language name as supplied by the caller.
		language: String,
	},
	/// Request could not be constructed.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Piston could not be reached.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Piston refused the job.
	#[error("Code runner rejected the job with status {status}: {message}.")]
	Rejected {
		/// HTTP status code.
		status: u16,
		/// Piston's message, or the canonical reason phrase.
		message: String,
	},
	/// Piston answered with an unexpected body.
	#[error(transparent)]
	Decode(#[from] DecodeError),
}

/// Piston language name and version for one platform language.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Runtime {
	/// Language name Piston expects.
	pub language: String,
	/// Exact runtime version.
	pub version: String,
}

/// Maps platform language names to Piston runtimes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeTable(BTreeMap<String, Runtime>);
impl RuntimeTable {
	/// Creates an empty table.
	pub fn empty() -> Self {
		Self(BTreeMap::new())
	}

	/// Registers `language` under its own Piston name.
	pub fn insert(&mut self, language: impl Into<String>, version: impl Into<String>) -> &mut Self {
		let language = language.into();
		let piston = piston_name(&language).to_owned();

		self.0.insert(language, Runtime { language: piston, version: version.into() });

		self
	}

	/// Registers `language` only when it is not already present.
	pub fn insert_missing(
		&mut self,
		language: impl Into<String>,
		version: impl Into<String>,
	) -> &mut Self {
		if let Entry::Vacant(entry) = self.0.entry(language.into()) {
			let piston = piston_name(entry.key()).to_owned();

			entry.insert(Runtime { language: piston, version: version.into() });
		}

		self
	}

	/// Looks up the runtime for a platform language name.
	pub fn resolve(&self, language: &str) -> Option<&Runtime> {
		self.0.get(language)
	}

	/// Iterates over `(platform language, runtime)` pairs in name order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &Runtime)> {
		self.0.iter().map(|(name, runtime)| (name.as_str(), runtime))
	}
}
impl Default for RuntimeTable {
	fn default() -> Self {
		let mut table = Self::empty();

		table
			.insert("c", "10.2.0")
			.insert("cplusplus", "10.2.0")
			.insert("csharp", "6.12.0")
			.insert("go", "1.16.2")
			.insert("java", "15.0.2")
			.insert("javascript", "18.15.0")
			.insert("kotlin", "1.8.20")
			.insert("php", "8.2.3")
			.insert("python", "3.10.0")
			.insert("ruby", "3.0.1")
			.insert("rust", "1.68.2")
			.insert("swift", "5.3.3")
			.insert("typescript", "5.0.3");

		table
	}
}

/// One snippet execution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionRequest {
	/// Platform language name, e.g. `cplusplus`.
	pub language: String,
	/// Snippet title used as the file name; empty means [`DEFAULT_FILE_NAME`].
	pub title: String,
	/// Source code.
	pub code: String,
	/// Standard input fed to the program.
	pub stdin: String,
}
impl ExecutionRequest {
	/// Creates a request with an empty title and stdin.
	pub fn new(language: impl Into<String>, code: impl Into<String>) -> Self {
		Self { language: language.into(), title: String::new(), code: code.into(), stdin: String::new() }
	}

	/// Sets the snippet title.
	pub fn title(mut self, title: impl Into<String>) -> Self {
		self.title = title.into();

		self
	}

	/// Sets standard input.
	pub fn stdin(mut self, stdin: impl Into<String>) -> Self {
		self.stdin = stdin.into();

		self
	}

	fn file_name(&self) -> &str {
		let title = self.title.trim();

		if title.is_empty() { DEFAULT_FILE_NAME } else { title }
	}
}

/// Output of the run stage.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutput {
	/// Captured standard output.
	#[serde(default)]
	pub stdout: String,
	/// Captured standard error.
	#[serde(default)]
	pub stderr: String,
	/// Interleaved stdout and stderr.
	#[serde(default)]
	pub output: String,
	/// Exit code; absent when the process was killed by a signal.
	#[serde(default)]
	pub code: Option<i32>,
	/// Terminating signal, if any.
	#[serde(default)]
	pub signal: Option<String>,
}
impl ExecutionOutput {
	/// Returns `true` when the program exited with code 0.
	pub fn succeeded(&self) -> bool {
		self.code == Some(0) && self.signal.is_none()
	}
}

#[derive(Serialize)]
struct PistonJob<'a> {
	language: &'a str,
	version: &'a str,
	files: [PistonFile<'a>; 1],
	stdin: &'a str,
}

#[derive(Serialize)]
struct PistonFile<'a> {
	name: &'a str,
	content: &'a str,
}

#[derive(Deserialize)]
struct PistonResult {
	run: ExecutionOutput,
}

/// Runs snippets on a Piston deployment.
pub struct CodeRunner<T>
where
	T: ?Sized + HttpTransport,
{
	transport: Arc<T>,
	config: PistonConfig,
	runtimes: RuntimeTable,
}
impl<T> CodeRunner<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a runner over a caller-provided transport with the default runtime table.
	pub fn with_transport(config: PistonConfig, transport: impl Into<Arc<T>>) -> Self {
		Self { transport: transport.into(), config, runtimes: RuntimeTable::default() }
	}

	/// Replaces the runtime table.
	pub fn with_runtimes(mut self, runtimes: RuntimeTable) -> Self {
		self.runtimes = runtimes;

		self
	}

	/// Runtime table in use.
	pub fn runtimes(&self) -> &RuntimeTable {
		&self.runtimes
	}

	/// Executes `request` and returns the run stage output.
	pub async fn run(&self, request: &ExecutionRequest) -> Result<ExecutionOutput, ExecError> {
		const OP: GatewayOp = GatewayOp::Execute;

		let span = OpSpan::new(OP, "run");

		obs::record_op_outcome(OP, OpOutcome::Attempt);

		let result = span.instrument(self.run_inner(request)).await;

		obs::record_result(OP, &result);

		result
	}

	async fn run_inner(&self, request: &ExecutionRequest) -> Result<ExecutionOutput, ExecError> {
		let runtime = self
			.runtimes
			.resolve(&request.language)
			.ok_or_else(|| ExecError::UnknownLanguage { language: request.language.clone() })?;
		let job = PistonJob {
			language: &runtime.language,
			version: &runtime.version,
			files: [PistonFile { name: request.file_name(), content: &request.code }],
			stdin: &request.stdin,
		};
		let body =
			serde_json::to_vec(&job).map_err(|source| ConfigError::RequestBody { source })?;
		let wire = http::Request::builder()
			.method(http::Method::POST)
			.uri(self.config.execute_url()?.as_str())
			.header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
			.body(body)
			.map_err(ConfigError::from)?;
		let response = ApiResponse::from(self.transport.execute(wire).await?);

		if !response.is_success() {
			return Err(ExecError::Rejected {
				status: response.status().as_u16(),
				message: response.message_or_reason(),
			});
		}

		Ok(response.json::<PistonResult>()?.run)
	}
}
#[cfg(feature = "reqwest")]
impl CodeRunner<ReqwestTransport> {
	/// Creates a runner backed by the default reqwest transport.
	pub fn new(config: PistonConfig) -> Result<Self, ExecError> {
		Ok(Self::with_transport(config, ReqwestTransport::new()?))
	}
}
impl<T> Clone for CodeRunner<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			config: self.config.clone(),
			runtimes: self.runtimes.clone(),
		}
	}
}
impl<T> Debug for CodeRunner<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CodeRunner")
			.field("base_url", &self.config.base_url.as_str())
			.field("runtimes", &self.runtimes.0.len())
			.finish()
	}
}

/// Piston spells a few languages differently from the platform.
fn piston_name(language: &str) -> &str {
	match language {
		"cplusplus" => "c++",
		other => other,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::_preludet::*;

	const RUN_OK: &str = r#"{"language":"c++","version":"10.2.0","run":{"stdout":"hi\n","stderr":"","output":"hi\n","code":0,"signal":null}}"#;

	fn runner(transport: ScriptedTransport) -> CodeRunner<ScriptedTransport> {
		let config = PistonConfig::new(
			Url::parse("http://piston.test/api/v2/piston").expect("Piston URL fixture should parse."),
		)
		.expect("Piston config fixture should build.");

		CodeRunner::with_transport(config, transport)
	}

	#[tokio::test]
	async fn cplusplus_is_sent_as_cpp_with_default_file_name() {
		let transport = ScriptedTransport::new(|_| (200, RUN_OK.into()));
		let output = runner(transport.clone())
			.run(&ExecutionRequest::new("cplusplus", "int main(){}").stdin("42"))
			.await
			.expect("Execution should succeed.");

		assert_eq!(output.stdout, "hi\n");
		assert!(output.succeeded());

		let calls = transport.calls();

		assert_eq!(calls.len(), 1);
		assert_eq!(calls[0].path, "/api/v2/piston/execute");
		assert_eq!(calls[0].authorization, None);

		let job: serde_json::Value =
			serde_json::from_slice(&calls[0].body).expect("Job body should be JSON.");

		assert_eq!(job["language"], "c++");
		assert_eq!(job["version"], "10.2.0");
		assert_eq!(job["files"][0]["name"], "astra");
		assert_eq!(job["files"][0]["content"], "int main(){}");
		assert_eq!(job["stdin"], "42");
	}

	#[tokio::test]
	async fn unknown_language_makes_no_call() {
		let transport = ScriptedTransport::new(|_| (200, RUN_OK.into()));
		let err = runner(transport.clone())
			.run(&ExecutionRequest::new("brainfuck", "+++"))
			.await
			.expect_err("Unknown languages must fail locally.");

		assert!(matches!(err, ExecError::UnknownLanguage { ref language } if language == "brainfuck"));
		assert!(transport.calls().is_empty());
	}

	#[tokio::test]
	async fn rejected_jobs_carry_piston_message() {
		let transport = ScriptedTransport::new(|_| {
			(400, r#"{"message":"python-0.0.1 runtime is unknown"}"#.into())
		});
		let mut runtimes = RuntimeTable::empty();

		runtimes.insert("python", "0.0.1");

		let err = runner(transport)
			.with_runtimes(runtimes)
			.run(&ExecutionRequest::new("python", "print(1)").title("hello.py"))
			.await
			.expect_err("Piston 400 should surface.");

		assert!(matches!(
			err,
			ExecError::Rejected { status: 400, ref message } if message.contains("runtime is unknown")
		));
	}

	#[test]
	fn signal_killed_runs_are_not_successful() {
		let output: ExecutionOutput = serde_json::from_str(
			r#"{"stdout":"","stderr":"","output":"","code":null,"signal":"SIGKILL"}"#,
		)
		.expect("Killed run should decode.");

		assert!(!output.succeeded());
	}

	#[test]
	fn insert_missing_keeps_existing_versions() {
		let mut table = RuntimeTable::default();

		table.insert_missing("rust", "0.1.0").insert_missing("zig", "0.10.1");

		assert_eq!(table.resolve("rust").map(|r| r.version.as_str()), Some("1.68.2"));
		assert_eq!(table.resolve("zig").map(|r| r.language.as_str()), Some("zig"));
		assert_eq!(table.resolve("cplusplus").map(|r| r.language.as_str()), Some("c++"));
		assert!(table.iter().any(|(name, _)| name == "typescript"));
	}
}
