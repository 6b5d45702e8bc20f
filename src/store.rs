//! Storage contract and built-in credential stores.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{_prelude::*, auth::Credential};

/// Boxed future returned by [`CredentialStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Holder of the single active credential.
///
/// Writes are last-write-wins; `clear` removes whatever value is present and succeeds when the
/// store is already empty.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Returns the current credential, if any.
	fn get(&self) -> StoreFuture<'_, Option<Credential>>;

	/// Replaces the current credential.
	fn set(&self, credential: Credential) -> StoreFuture<'_, ()>;

	/// Removes the current credential.
	fn clear(&self) -> StoreFuture<'_, ()>;
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn store_error_can_be_serialized() {
		let error = StoreError::Serialization { message: "bad json".into() };
		let payload = serde_json::to_string(&error).expect("StoreError should serialize to JSON.");

		assert_eq!(payload, "{\"Serialization\":{\"message\":\"bad json\"}}");
		assert_eq!(error.to_string(), "Serialization error: bad json.");
	}
}
