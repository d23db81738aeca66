//! Long-running operation invoker
//!
//! Mutating ARM calls (PUT/PATCH/POST/DELETE) may complete asynchronously:
//! the service accepts the request and hands back a status endpoint the
//! client polls until the operation settles. This module runs that exchange
//! on a dedicated worker task and gives the caller a handle that resolves
//! exactly once with the final payload or a structured error.

use std::time::Duration;

use reqwest::Method;
use serde_json::Value;
use tokio::sync::{oneshot, watch};
use url::Url;
use uuid::Uuid;

use super::client::ArmClient;
use super::error::{self, ArmError};
use super::http::HttpResponse;
use super::request::RequestDescriptor;

/// Azure's dedicated asynchronous-operation header, preferred over the
/// generic `Location` header when both are present.
const ASYNC_OPERATION_HEADER: &str = "Azure-AsyncOperation";
const LOCATION_HEADER: &str = "Location";
const RETRY_AFTER_HEADER: &str = "Retry-After";

/// Floor for the delay between polls when the service sends no Retry-After.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Status of a long-running operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperationStatus {
    /// Initial request not yet sent
    #[default]
    NotStarted,
    /// Accepted by the service, polling for completion
    InProgress,
    /// Operation completed successfully
    Succeeded,
    /// Operation failed with a service-reported reason
    Failed,
    /// Operation canceled
    Canceled,
}

impl OperationStatus {
    /// Terminal states never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }

    /// Parse a status string from a poll body. The service emits transient
    /// values like `Creating`, `Updating` or `Running` before settling;
    /// anything that is not a terminal state counts as in progress.
    pub fn from_body_value(value: &str) -> Self {
        if value.eq_ignore_ascii_case("succeeded") {
            Self::Succeeded
        } else if value.eq_ignore_ascii_case("failed") {
            Self::Failed
        } else if value.eq_ignore_ascii_case("canceled") || value.eq_ignore_ascii_case("cancelled")
        {
            Self::Canceled
        } else {
            Self::InProgress
        }
    }
}

/// Per-invocation polling configuration.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// HTTP status codes that complete the call immediately, no polling.
    pub success_codes: Vec<u16>,
    /// Dot-notation path of the status field in poll bodies, e.g.
    /// `status` or `properties.provisioningState`.
    pub status_path: String,
    /// Floor for the delay between polls; a larger server `Retry-After`
    /// takes precedence.
    pub min_interval: Duration,
}

impl PollConfig {
    pub fn new(success_codes: &[u16], status_path: &str) -> Self {
        Self {
            success_codes: success_codes.to_vec(),
            status_path: status_path.to_string(),
            min_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }
}

impl Default for PollConfig {
    /// 200 and 201 complete immediately; status read from the
    /// async-operation document convention.
    fn default() -> Self {
        Self::new(&[200, 201], "status")
    }
}

/// Handle to an in-flight invocation.
///
/// The worker resolves exactly once; the caller can wait, read the result
/// without blocking, observe live status, or cancel. Dropping the handle
/// raises the cancellation signal, so hold it for as long as the operation
/// should keep running.
pub struct Invocation {
    /// Unique id for correlating log lines across polls.
    pub id: Uuid,
    result: oneshot::Receiver<Result<Value, ArmError>>,
    cancel: Option<oneshot::Sender<()>>,
    status: watch::Receiver<OperationStatus>,
}

impl Invocation {
    /// Last status observed by the worker.
    pub fn status(&self) -> OperationStatus {
        *self.status.borrow()
    }

    /// Raise the cancellation signal. The worker aborts any in-flight
    /// request at the next suspension point and resolves with
    /// [`ArmError::CallerCanceled`]. Idempotent.
    pub fn cancel(&mut self) {
        if let Some(tx) = self.cancel.take() {
            let _ = tx.send(());
        }
    }

    /// Wait for the final result.
    pub async fn wait(self) -> Result<Value, ArmError> {
        self.result.await.unwrap_or(Err(ArmError::ResultChannelClosed))
    }

    /// Wait up to `timeout` for the result. Returns `None` on timeout; the
    /// invocation keeps running and can be waited on again.
    pub async fn wait_timeout(&mut self, timeout: Duration) -> Option<Result<Value, ArmError>> {
        match tokio::time::timeout(timeout, &mut self.result).await {
            Ok(result) => Some(result.unwrap_or(Err(ArmError::ResultChannelClosed))),
            Err(_) => None,
        }
    }

    /// Non-blocking read of the result, if the worker has resolved.
    pub fn try_result(&mut self) -> Option<Result<Value, ArmError>> {
        match self.result.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => {
                Some(Err(ArmError::ResultChannelClosed))
            }
        }
    }
}

/// Issue a mutating ARM call, polling to completion when the service
/// defers the result.
///
/// Returns immediately; the whole exchange runs on its own tokio task, and
/// concurrent invocations share nothing but the HTTP transport.
pub fn invoke(client: &ArmClient, request: RequestDescriptor, config: PollConfig) -> Invocation {
    let id = Uuid::new_v4();
    let (result_tx, result_rx) = oneshot::channel();
    let (cancel_tx, cancel_rx) = oneshot::channel();
    let (status_tx, status_rx) = watch::channel(OperationStatus::NotStarted);

    let worker = Worker {
        id,
        client: client.clone(),
        request,
        config,
        status: status_tx,
        cancel: cancel_rx,
        attempts: 0,
    };

    tokio::spawn(async move {
        let _ = result_tx.send(worker.run().await);
    });

    Invocation {
        id,
        result: result_rx,
        cancel: Some(cancel_tx),
        status: status_rx,
    }
}

/// Worker state for one invocation. Private to its task; polls are
/// strictly sequential within it.
struct Worker {
    id: Uuid,
    client: ArmClient,
    request: RequestDescriptor,
    config: PollConfig,
    status: watch::Sender<OperationStatus>,
    cancel: oneshot::Receiver<()>,
    attempts: u32,
}

impl Worker {
    async fn run(mut self) -> Result<Value, ArmError> {
        let outcome = self.execute().await;

        let final_status = match &outcome {
            Ok(_) => OperationStatus::Succeeded,
            Err(ArmError::CallerCanceled) | Err(ArmError::OperationCanceled { .. }) => {
                OperationStatus::Canceled
            }
            Err(_) => OperationStatus::Failed,
        };
        let _ = self.status.send(final_status);

        match &outcome {
            Ok(_) => {
                tracing::info!(operation = %self.id, attempts = self.attempts, "invocation completed")
            }
            Err(err) => {
                tracing::warn!(operation = %self.id, attempts = self.attempts, "invocation failed: {err}")
            }
        }

        outcome
    }

    async fn execute(&mut self) -> Result<Value, ArmError> {
        let initial_request = self.request.clone();
        let initial = self.send_cancellable(&initial_request).await?;

        // 202 always defers; 201 defers only when it points at a poll URL.
        let accepted =
            initial.status == 202 || (initial.status == 201 && poll_url(&initial).is_some());

        if !accepted {
            return if self.config.success_codes.contains(&initial.status) {
                tracing::debug!(operation = %self.id, status = initial.status, "completed synchronously");
                initial.json(self.request.url.as_str())
            } else {
                Err(error::status_error(&self.request, &initial))
            };
        }

        let mut poll_target = poll_url(&initial).ok_or_else(|| ArmError::MissingPollUrl {
            method: self.request.method.to_string(),
            url: self.request.url.to_string(),
        })?;
        let mut retry_after = server_retry_after(&initial);

        let _ = self.status.send(OperationStatus::InProgress);
        tracing::debug!(operation = %self.id, "accepted, polling {}", poll_target);

        loop {
            let delay = self
                .config
                .min_interval
                .max(retry_after.unwrap_or(Duration::ZERO));

            tokio::select! {
                _ = &mut self.cancel => {
                    return Err(ArmError::CallerCanceled);
                }
                _ = tokio::time::sleep(delay) => {}
            }

            let poll_request = RequestDescriptor::get(poll_target.clone());
            let response = self.send_cancellable(&poll_request).await?;
            self.attempts += 1;

            if !response.is_success() {
                return Err(error::status_error(&poll_request, &response));
            }

            retry_after = server_retry_after(&response);
            // The service may move the status endpoint between polls.
            if let Some(next) = poll_url(&response) {
                poll_target = next;
            }

            // Location-style polling keeps answering 202 until the
            // operation settles; only a non-202 body carries status.
            let (status, body) = if response.status == 202 {
                (OperationStatus::InProgress, Value::Null)
            } else {
                let body = response.json(poll_target.as_str())?;
                let status = match status_field(&body, &self.config.status_path) {
                    Some(value) => OperationStatus::from_body_value(value),
                    None => OperationStatus::Succeeded,
                };
                (status, body)
            };

            let _ = self.status.send(status);
            tracing::debug!(operation = %self.id, attempts = self.attempts, ?status, "poll update");

            match status {
                OperationStatus::Succeeded => return self.final_payload(body).await,
                OperationStatus::Failed => return Err(operation_error(false, &body)),
                OperationStatus::Canceled => return Err(operation_error(true, &body)),
                _ => {}
            }
        }
    }

    /// Hand back the payload for a succeeded operation. An operation-status
    /// document (the `status` path convention) is not the resource itself,
    /// so the resource is refetched from the original URL; DELETE has
    /// nothing left to fetch.
    async fn final_payload(&mut self, poll_body: Value) -> Result<Value, ArmError> {
        if self.request.method == Method::DELETE {
            return Ok(Value::Null);
        }

        let status_document = self.config.status_path == "status";
        if !poll_body.is_null() && !status_document {
            return Ok(poll_body);
        }

        let request = RequestDescriptor::get(self.request.url.clone());
        let response = self.send_cancellable(&request).await?;
        if !response.is_success() {
            return Err(error::status_error(&request, &response));
        }

        response.json(request.url.as_str())
    }

    /// Send one request, racing the caller's cancellation signal. Dropping
    /// the in-flight future aborts the underlying HTTP request.
    async fn send_cancellable(
        &mut self,
        request: &RequestDescriptor,
    ) -> Result<HttpResponse, ArmError> {
        tokio::select! {
            _ = &mut self.cancel => Err(ArmError::CallerCanceled),
            response = self.client.send(request) => response,
        }
    }
}

/// Poll URL from an acceptance response, preferring the dedicated
/// async-operation header over the generic Location header.
fn poll_url(response: &HttpResponse) -> Option<Url> {
    response
        .header(ASYNC_OPERATION_HEADER)
        .or_else(|| response.header(LOCATION_HEADER))
        .and_then(|raw| Url::parse(raw).ok())
}

fn server_retry_after(response: &HttpResponse) -> Option<Duration> {
    response.header(RETRY_AFTER_HEADER).and_then(parse_retry_after)
}

/// Parse a Retry-After header value: delta-seconds or an HTTP-date.
fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    let when = chrono::DateTime::parse_from_rfc2822(value).ok()?;
    when.signed_duration_since(chrono::Utc::now()).to_std().ok()
}

/// Walk a dot-notation path into a poll body and return the string at it.
fn status_field<'a>(body: &'a Value, path: &str) -> Option<&'a str> {
    let mut current = body;
    for part in path.split('.') {
        current = current.get(part)?;
    }
    current.as_str()
}

/// Terminal non-success reported via polling, with the service's reason.
fn operation_error(canceled: bool, body: &Value) -> ArmError {
    let detail = body.get("error");
    let code = detail
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("Unknown")
        .to_string();
    let message = detail
        .and_then(|e| e.get("message"))
        .and_then(|v| v.as_str())
        .unwrap_or("no detail reported")
        .to_string();

    if canceled {
        ArmError::OperationCanceled { code, message }
    } else {
        ArmError::OperationFailed { code, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};
    use serde_json::json;

    fn response_with_headers(status: u16, headers: &[(&'static str, &str)]) -> HttpResponse {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        HttpResponse {
            status,
            headers: map,
            body: String::new(),
        }
    }

    #[test]
    fn terminal_states() {
        assert!(OperationStatus::Succeeded.is_terminal());
        assert!(OperationStatus::Failed.is_terminal());
        assert!(OperationStatus::Canceled.is_terminal());
        assert!(!OperationStatus::InProgress.is_terminal());
        assert!(!OperationStatus::NotStarted.is_terminal());
    }

    #[test]
    fn status_parsing_is_case_insensitive() {
        assert_eq!(
            OperationStatus::from_body_value("SUCCEEDED"),
            OperationStatus::Succeeded
        );
        assert_eq!(
            OperationStatus::from_body_value("failed"),
            OperationStatus::Failed
        );
        assert_eq!(
            OperationStatus::from_body_value("Cancelled"),
            OperationStatus::Canceled
        );
    }

    #[test]
    fn transient_states_count_as_in_progress() {
        for value in ["InProgress", "Creating", "Updating", "Running", "Accepted"] {
            assert_eq!(
                OperationStatus::from_body_value(value),
                OperationStatus::InProgress,
                "{value}"
            );
        }
    }

    #[test]
    fn async_operation_header_wins_over_location() {
        let response = response_with_headers(
            202,
            &[
                ("location", "https://example.com/generic"),
                ("azure-asyncoperation", "https://example.com/operations/1"),
            ],
        );
        assert_eq!(
            poll_url(&response).unwrap().as_str(),
            "https://example.com/operations/1"
        );
    }

    #[test]
    fn location_header_is_the_fallback() {
        let response =
            response_with_headers(202, &[("location", "https://example.com/generic")]);
        assert_eq!(
            poll_url(&response).unwrap().as_str(),
            "https://example.com/generic"
        );
    }

    #[test]
    fn retry_after_delta_seconds() {
        assert_eq!(parse_retry_after("30"), Some(Duration::from_secs(30)));
        assert_eq!(parse_retry_after(" 5 "), Some(Duration::from_secs(5)));
    }

    #[test]
    fn retry_after_http_date() {
        let when = (chrono::Utc::now() + chrono::Duration::seconds(120)).to_rfc2822();
        let parsed = parse_retry_after(&when).unwrap();
        assert!(parsed > Duration::from_secs(100));
        assert!(parsed <= Duration::from_secs(121));
    }

    #[test]
    fn retry_after_past_date_is_ignored() {
        let when = (chrono::Utc::now() - chrono::Duration::seconds(120)).to_rfc2822();
        assert_eq!(parse_retry_after(&when), None);
    }

    #[test]
    fn retry_after_garbage_is_ignored() {
        assert_eq!(parse_retry_after("soon"), None);
    }

    #[test]
    fn status_field_walks_nested_paths() {
        let body = json!({"properties": {"provisioningState": "Succeeded"}});
        assert_eq!(
            status_field(&body, "properties.provisioningState"),
            Some("Succeeded")
        );
        assert_eq!(status_field(&body, "status"), None);

        let body = json!({"status": "InProgress"});
        assert_eq!(status_field(&body, "status"), Some("InProgress"));
    }

    #[test]
    fn operation_error_carries_service_reason() {
        let body = json!({
            "status": "Failed",
            "error": {"code": "DeploymentFailed", "message": "quota exceeded"}
        });
        match operation_error(false, &body) {
            ArmError::OperationFailed { code, message } => {
                assert_eq!(code, "DeploymentFailed");
                assert_eq!(message, "quota exceeded");
            }
            other => panic!("expected OperationFailed, got {other:?}"),
        }
    }

    #[test]
    fn operation_error_without_detail_uses_placeholders() {
        let body = json!({"status": "Canceled"});
        match operation_error(true, &body) {
            ArmError::OperationCanceled { code, message } => {
                assert_eq!(code, "Unknown");
                assert_eq!(message, "no detail reported");
            }
            other => panic!("expected OperationCanceled, got {other:?}"),
        }
    }
}
