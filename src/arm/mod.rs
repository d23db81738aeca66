//! ARM API interaction module
//!
//! This module provides the core functionality for calling Azure Resource
//! Manager: request description, HTTP transport, and the long-running
//! operation invoker.
//!
//! # Module Structure
//!
//! - [`client`] - Main ARM client, configuration and URL building
//! - [`error`] - Error taxonomy for requests and operations
//! - [`http`] - HTTP transport for REST API calls
//! - [`operation`] - Long-running operation invoker and polling
//! - [`request`] - Immutable request descriptors
//!
//! # Example
//!
//! ```ignore
//! use armclient::{ArmClient, ArmConfig, PollConfig, RequestDescriptor};
//!
//! async fn example() -> Result<(), armclient::ArmError> {
//!     let client = ArmClient::new(ArmConfig::new("my-subscription"))?;
//!     let url = client.resource_url(
//!         "my-group",
//!         "Microsoft.ContainerRegistry",
//!         "registries",
//!         "myreg",
//!     );
//!     let request = RequestDescriptor::put(url)
//!         .with_body(serde_json::json!({"location": "westus"}));
//!
//!     let registry = client.invoke(request, PollConfig::default()).wait().await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod http;
pub mod operation;
pub mod request;
