//! Async invocation core for Azure Resource Manager
//!
//! This crate implements the one pattern every mutating ARM call shares:
//! send a request, and when the service answers with an acceptance status,
//! poll the operation endpoint it hands back until the operation reaches a
//! terminal state. The exchange runs on its own worker task; the caller
//! holds a handle it can wait on, poll without blocking, or cancel.
//!
//! It also carries the small hand-written helpers that accompany the
//! generated ARM clients: resource identifier parsing, blob URI
//! decomposition, and ordering of VM names by their embedded sequence
//! suffix.
//!
//! # Module Structure
//!
//! - [`arm`] - Client, transport, and the long-running operation invoker
//! - [`naming`] - Identifier and VM-name parsing helpers

pub mod arm;
pub mod naming;

pub use arm::client::{ArmClient, ArmConfig, DEFAULT_API_VERSION, DEFAULT_BASE_URL};
pub use arm::error::ArmError;
pub use arm::http::HttpResponse;
pub use arm::operation::{invoke, Invocation, OperationStatus, PollConfig};
pub use arm::request::RequestDescriptor;
pub use naming::{
    cmp_by_sequence, cmp_by_suffix, parse_resource_name, parse_vm_name_parts, sort_vms_by_suffix,
    split_blob_uri, BlobUriParts, NamingError, VmNameParts,
};
