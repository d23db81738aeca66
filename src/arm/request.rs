//! Request descriptors
//!
//! An immutable description of a single ARM call: method, fully-substituted
//! URL, extra headers, optional JSON body. Built by the caller, consumed by
//! the transport.

use reqwest::Method;
use serde_json::Value;
use url::Url;

/// A single ARM API request.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn put(url: Url) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn patch(url: Url) -> Self {
        Self::new(Method::PATCH, url)
    }

    pub fn post(url: Url) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn delete(url: Url) -> Self {
        Self::new(Method::DELETE, url)
    }

    /// Add a request header.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Attach a JSON body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Attach the given `api-version` query parameter unless the URL
    /// already carries one. Every ARM call requires an api-version.
    pub fn ensure_api_version(mut self, api_version: &str) -> Self {
        let present = self.url.query_pairs().any(|(k, _)| k == "api-version");
        if !present {
            self.url
                .query_pairs_mut()
                .append_pair("api-version", api_version);
        }
        self
    }
}
