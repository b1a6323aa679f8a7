//! Domain-specific error types for azfederate.
//!
//! This module defines `AzFederateError`, a `thiserror`-based enum that
//! provides typed error variants for common failure modes. Public API
//! functions return `Result<T, AzFederateError>` for programmatic error
//! handling, while orchestration boundaries continue to use `anyhow::Result`.
//!
//! `AzFederateError` implements `Into<anyhow::Error>`, so the `?` operator
//! converts it automatically at boundaries that return `anyhow::Result`.

/// Domain-specific error type for azfederate.
///
/// Provides typed variants for common failure modes, enabling callers
/// to match on error kinds programmatically rather than parsing error
/// message strings.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AzFederateError {
    /// A validation constraint was violated.
    #[error("validation error: {0}")]
    Validation(String),

    /// A configuration file could not be loaded or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// The external CLI binary could not be located.
    #[error("command not found in PATH: {command}")]
    CommandNotFound {
        /// The command that was looked up (e.g., `az`).
        command: String,
    },

    /// A command execution failed (non-zero exit, spawn failure, etc.).
    #[error("command execution failed: {command}: {status}")]
    Execution {
        /// The command that was executed, including its arguments.
        command: String,
        /// Human-readable reason for the failure: exit code, signal
        /// information, or captured stderr output.
        status: String,
    },

    /// Output from the cloud CLI could not be parsed as the expected JSON shape.
    #[error("unexpected response from az: {context}")]
    Json {
        /// What was being parsed when the error occurred (e.g., the
        /// operation name or command arguments).
        context: String,
        /// The underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },

    /// A retried operation failed on every attempt within its budget.
    #[error("{operation} failed after {attempts} attempt(s): {last_error}")]
    RetryExhausted {
        /// The operation being retried (e.g., "service principal creation").
        operation: String,
        /// Number of attempts actually made before giving up.
        attempts: u32,
        /// The error produced by the final attempt.
        last_error: String,
    },
}
