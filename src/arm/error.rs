//! Error types for ARM requests and long-running operations
//!
//! Every failure surfaces through the call's result; nothing is retried or
//! swallowed at this layer. Retry policy belongs to the caller.

use serde::Deserialize;

use super::http::{sanitize_for_log, HttpResponse};
use super::request::RequestDescriptor;

/// Wire shape of an ARM error response body.
///
/// The service reports failures as `{"error": {"code": ..., "message": ...}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceErrorPayload {
    pub error: ServiceErrorDetail,
}

/// Code/message pair inside a service error payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceErrorDetail {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Errors produced by ARM requests and long-running operations.
#[derive(Debug, thiserror::Error)]
pub enum ArmError {
    /// The HTTP client itself could not be constructed.
    #[error("failed to create HTTP client: {source}")]
    Client {
        #[source]
        source: reqwest::Error,
    },

    /// Network or connection failure. Not retried here.
    #[error("transport error for {method} {url}: {source}")]
    Transport {
        method: String,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// HTTP status outside the allowed set for the call, with no
    /// recognizable service error payload.
    #[error("{method} {url} returned unexpected status {status}: {body}")]
    UnexpectedStatus {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    /// Malformed JSON in a response or poll body.
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// Well-formed error payload reported by the service.
    #[error("service error {status} ({code}) from {url}: {message}")]
    Service {
        url: String,
        status: u16,
        code: String,
        message: String,
    },

    /// A long-running operation reached the `Failed` state.
    #[error("operation failed ({code}): {message}")]
    OperationFailed { code: String, message: String },

    /// A long-running operation was canceled on the service side.
    #[error("operation canceled by the service ({code}): {message}")]
    OperationCanceled { code: String, message: String },

    /// The caller raised the cancellation signal.
    #[error("operation canceled by caller")]
    CallerCanceled,

    /// An acceptance response carried no usable poll location header.
    #[error("{method} {url} was accepted but returned no poll URL")]
    MissingPollUrl { method: String, url: String },

    /// The worker task ended without delivering a result.
    #[error("operation worker ended without a result")]
    ResultChannelClosed,
}

/// Classify a response outside the call's allowed status set.
///
/// A well-formed service error body becomes [`ArmError::Service`]; anything
/// else degrades to [`ArmError::UnexpectedStatus`] carrying a sanitized
/// body snippet for diagnostics.
pub(crate) fn status_error(request: &RequestDescriptor, response: &HttpResponse) -> ArmError {
    match serde_json::from_str::<ServiceErrorPayload>(&response.body) {
        Ok(payload) => ArmError::Service {
            url: request.url.to_string(),
            status: response.status,
            code: payload.error.code,
            message: payload.error.message,
        },
        Err(_) => ArmError::UnexpectedStatus {
            method: request.method.to_string(),
            url: request.url.to_string(),
            status: response.status,
            body: sanitize_for_log(&response.body),
        },
    }
}
