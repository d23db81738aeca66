//! ARM Client
//!
//! Main client for interacting with Azure Resource Manager, combining
//! configuration, URL building and the HTTP transport. All state is carried
//! explicitly in [`ArmConfig`]; cloning a client is cheap and clones share
//! only the underlying connection pool.

use serde_json::Value;
use url::Url;

use super::error::{self, ArmError};
use super::http::{HttpClient, HttpResponse};
use super::operation::{self, Invocation, PollConfig};
use super::request::RequestDescriptor;

/// Default ARM endpoint.
pub const DEFAULT_BASE_URL: &str = "https://management.azure.com";

/// Default api-version attached to requests that do not set their own.
pub const DEFAULT_API_VERSION: &str = "2017-03-01";

/// Client configuration: endpoint, subscription, credentials. Passed
/// explicitly to each client; nothing is global.
#[derive(Debug, Clone)]
pub struct ArmConfig {
    pub base_url: Url,
    pub subscription_id: String,
    /// Bearer token attached to every request when present. Token
    /// acquisition and refresh live outside this crate.
    pub bearer_token: Option<String>,
    pub api_version: String,
    pub user_agent: String,
}

impl ArmConfig {
    pub fn new(subscription_id: &str) -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
            subscription_id: subscription_id.to_string(),
            bearer_token: None,
            api_version: DEFAULT_API_VERSION.to_string(),
            user_agent: format!("armclient/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_bearer_token(mut self, token: &str) -> Self {
        self.bearer_token = Some(token.to_string());
        self
    }

    pub fn with_api_version(mut self, api_version: &str) -> Self {
        self.api_version = api_version.to_string();
        self
    }
}

/// Main ARM client
#[derive(Clone)]
pub struct ArmClient {
    pub config: ArmConfig,
    http: HttpClient,
}

impl ArmClient {
    /// Create a new ARM client from explicit configuration.
    pub fn new(config: ArmConfig) -> Result<Self, ArmError> {
        let http = HttpClient::new(&config.user_agent)?;
        Ok(Self { config, http })
    }

    /// Send a single request over the shared transport. Safe for
    /// concurrent use from any number of in-flight invocations.
    pub async fn send(&self, request: &RequestDescriptor) -> Result<HttpResponse, ArmError> {
        self.http
            .send(request, self.config.bearer_token.as_deref())
            .await
    }

    // =========================================================================
    // URL builders
    // =========================================================================

    fn build_url(&self, path: &str) -> Url {
        let mut url = self.config.base_url.clone();
        url.set_path(path);
        url
    }

    /// Subscription-scoped path: `/subscriptions/{id}/{path}`.
    pub fn subscription_url(&self, path: &str) -> Url {
        self.build_url(&format!(
            "/subscriptions/{}/{}",
            self.config.subscription_id, path
        ))
    }

    /// Resource-group-scoped path:
    /// `/subscriptions/{id}/resourceGroups/{group}/{path}`.
    pub fn resource_group_url(&self, resource_group: &str, path: &str) -> Url {
        self.subscription_url(&format!("resourceGroups/{}/{}", resource_group, path))
    }

    /// Fully-qualified provider resource, e.g.
    /// `.../providers/Microsoft.ContainerRegistry/registries/myreg`.
    pub fn resource_url(
        &self,
        resource_group: &str,
        namespace: &str,
        resource_type: &str,
        name: &str,
    ) -> Url {
        self.resource_group_url(
            resource_group,
            &format!("providers/{}/{}/{}", namespace, resource_type, name),
        )
    }

    /// Provider-level path under the subscription, for actions like
    /// `checkNameAvailability` that are not tied to a resource group.
    pub fn provider_url(&self, namespace: &str, path: &str) -> Url {
        self.subscription_url(&format!("providers/{}/{}", namespace, path))
    }

    // =========================================================================
    // One-shot requests (no polling)
    // =========================================================================

    /// GET a resource, expecting 200 with a JSON body.
    pub async fn get(&self, url: Url) -> Result<Value, ArmError> {
        self.execute(RequestDescriptor::get(url), &[200]).await
    }

    /// POST an action, expecting 200. Used for list-credential style calls
    /// that mutate nothing long-running.
    pub async fn post(&self, url: Url, body: Option<Value>) -> Result<Value, ArmError> {
        let mut request = RequestDescriptor::post(url);
        if let Some(body) = body {
            request = request.with_body(body);
        }
        self.execute(request, &[200]).await
    }

    /// DELETE a resource synchronously, expecting 200 or 204.
    pub async fn delete(&self, url: Url) -> Result<Value, ArmError> {
        self.execute(RequestDescriptor::delete(url), &[200, 204])
            .await
    }

    /// Send once and decode, enforcing an allowed status set.
    pub async fn execute(
        &self,
        request: RequestDescriptor,
        allowed: &[u16],
    ) -> Result<Value, ArmError> {
        let request = request.ensure_api_version(&self.config.api_version);
        let response = self.send(&request).await?;

        if !allowed.contains(&response.status) {
            return Err(error::status_error(&request, &response));
        }

        response.json(request.url.as_str())
    }

    /// GET a paged list, following `nextLink` continuations and collecting
    /// every `value` entry.
    pub async fn get_all_pages(&self, url: Url) -> Result<Vec<Value>, ArmError> {
        let mut items = Vec::new();
        let mut next = Some(url);

        while let Some(url) = next.take() {
            let page = self.get(url).await?;

            if let Some(values) = page.get("value").and_then(|v| v.as_array()) {
                items.extend(values.iter().cloned());
            }

            next = page
                .get("nextLink")
                .and_then(|v| v.as_str())
                .and_then(|raw| Url::parse(raw).ok());
        }

        Ok(items)
    }

    // =========================================================================
    // Long-running invocations
    // =========================================================================

    /// Start a long-running invocation: send the request and poll to
    /// completion on a worker task. See [`operation::invoke`].
    pub fn invoke(&self, request: RequestDescriptor, config: PollConfig) -> Invocation {
        let request = request.ensure_api_version(&self.config.api_version);
        operation::invoke(self, request, config)
    }
}
