//! Remote license-validation client.

pub mod remote;

pub use remote::{HttpValidator, RemoteValidator};
