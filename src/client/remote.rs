//! Remote license-validation endpoint client.
//!
//! The endpoint answers `validate(token, machine_id) -> { valid }`. The
//! HTTP implementation uses a bounded request timeout and bounded
//! exponential backoff on transport errors; transport failure after the
//! retries surfaces as `Transport`, which sends the caller down the
//! offline-grace path instead of blocking indefinitely.

use crate::TenantgateError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum transport retries before giving up.
pub const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff.
pub const BACKOFF_BASE: Duration = Duration::from_millis(250);

/// Narrow interface over the remote validation service.
pub trait RemoteValidator: Send + Sync {
    /// Ask the service whether the license token is valid for the machine.
    ///
    /// `Ok(false)` is an authoritative rejection; `Err(Transport)` means
    /// the service could not be reached and the cached copy applies.
    fn validate(&self, token: &str, machine_id: &str) -> Result<bool, TenantgateError>;
}

#[derive(Serialize)]
struct ValidateRequest<'a> {
    token: &'a str,
    #[serde(rename = "machineId")]
    machine_id: &'a str,
}

#[derive(Deserialize)]
struct ValidateResponse {
    valid: bool,
}

/// Reqwest-based validator against the license service.
pub struct HttpValidator {
    client: reqwest::blocking::Client,
    endpoint: String,
    max_retries: u32,
}

impl HttpValidator {
    /// Create a validator for the given endpoint URL.
    pub fn new(endpoint: &str) -> Result<Self, TenantgateError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TenantgateError::Transport(format!("Failed to create client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            max_retries: MAX_RETRIES,
        })
    }

    /// Override the retry budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn validate_once(&self, token: &str, machine_id: &str) -> Result<bool, TenantgateError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ValidateRequest { token, machine_id })
            .send()
            .map_err(|e| TenantgateError::Transport(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(TenantgateError::Transport(format!(
                "License service returned {}",
                response.status()
            )));
        }

        let body: ValidateResponse = response
            .json()
            .map_err(|e| TenantgateError::Transport(format!("Malformed response: {}", e)))?;
        Ok(body.valid)
    }
}

impl RemoteValidator for HttpValidator {
    fn validate(&self, token: &str, machine_id: &str) -> Result<bool, TenantgateError> {
        let mut attempt = 0u32;
        loop {
            match self.validate_once(token, machine_id) {
                Ok(valid) => return Ok(valid),
                Err(err) if attempt < self.max_retries => {
                    let delay = BACKOFF_BASE * 2u32.saturating_pow(attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "license service unreachable, backing off"
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
