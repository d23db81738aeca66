//! HTTP transport for ARM REST calls
//!
//! A thin wrapper over `reqwest` exposing a single `send` capability. It
//! performs no retries and no status classification: callers inspect the
//! returned status themselves, since 200, 201, 202 and 204 all mean
//! different things depending on the operation.

use reqwest::header::HeaderMap;
use reqwest::Client;
use serde_json::Value;
use url::Url;

use super::error::ArmError;
use super::request::RequestDescriptor;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging and error snippets.
/// Truncates long responses and strips non-printable characters.
pub(crate) fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        format!(
            "{}... [truncated, {} bytes total]",
            &body[..MAX_LOG_BODY_LENGTH],
            body.len()
        )
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Response from a single transport send: status, headers, raw body text.
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

impl HttpResponse {
    /// Header value as a string, if present and valid.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON. Empty bodies decode to `Value::Null`,
    /// which 202/204 responses legitimately produce.
    pub fn json(&self, url: &str) -> Result<Value, ArmError> {
        if self.body.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&self.body).map_err(|source| ArmError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

/// HTTP client wrapper for ARM API calls
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a new HTTP client.
    pub fn new(user_agent: &str) -> Result<Self, ArmError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|source| ArmError::Client { source })?;

        Ok(Self { client })
    }

    /// Send a single request. Transport failures (connection refused,
    /// timeout) surface as [`ArmError::Transport`]; any HTTP status is
    /// returned as-is for the caller to classify.
    pub async fn send(
        &self,
        request: &RequestDescriptor,
        token: Option<&str>,
    ) -> Result<HttpResponse, ArmError> {
        tracing::debug!("{} {}", request.method, request.url);

        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone());

        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|source| ArmError::Transport {
                method: request.method.to_string(),
                url: request.url.to_string(),
                source,
            })?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|source| ArmError::Transport {
                method: request.method.to_string(),
                url: request.url.to_string(),
                source,
            })?;

        if status >= 400 {
            // Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
        }

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    /// Plain GET against an absolute URL (poll endpoints, final resource
    /// fetch).
    pub async fn get(&self, url: &Url, token: Option<&str>) -> Result<HttpResponse, ArmError> {
        self.send(&RequestDescriptor::get(url.clone()), token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_truncates_long_bodies() {
        let body = "x".repeat(500);
        let sanitized = sanitize_for_log(&body);
        assert!(sanitized.contains("truncated, 500 bytes total"));
        assert!(sanitized.len() < body.len());
    }

    #[test]
    fn sanitize_strips_control_characters() {
        let sanitized = sanitize_for_log("ok\x07\r\nthen");
        assert_eq!(sanitized, "okthen");
    }

    #[test]
    fn empty_body_decodes_to_null() {
        let response = HttpResponse {
            status: 204,
            headers: HeaderMap::new(),
            body: String::new(),
        };
        assert_eq!(response.json("https://example.com").unwrap(), Value::Null);
    }

    #[test]
    fn malformed_body_is_a_decode_error() {
        let response = HttpResponse {
            status: 200,
            headers: HeaderMap::new(),
            body: "{not json".to_string(),
        };
        assert!(matches!(
            response.json("https://example.com"),
            Err(ArmError::Decode { .. })
        ));
    }
}
