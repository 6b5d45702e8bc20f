//! Credential model shared by the gateway, the stores, and the session helpers.

pub mod credential;

pub use credential::*;
