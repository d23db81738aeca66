//! Azure identifier and naming helpers
//!
//! Hand-written counterparts to the generated clients: resource identifier
//! parsing, blob URI decomposition, and ordering of VM names that embed a
//! sequence suffix.

use std::cmp::Ordering;

use serde_json::Value;
use url::Url;

/// Errors from identifier and name parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NamingError {
    /// Identifier with an empty final segment (trailing slash or empty
    /// input).
    #[error("resource name was missing from identifier")]
    MalformedIdentifier,
    /// VM name that is not exactly four hyphen-separated fields ending in
    /// a numeric suffix.
    #[error("malformed VM name {0:?}")]
    MalformedName(String),
    /// Blob URI that does not decompose into account/container/blob.
    #[error("malformed blob URI {0:?}")]
    MalformedBlobUri(String),
}

/// Last segment (the resource name) of a slash-delimited resource
/// identifier.
///
/// `/subscriptions/x/resourceGroups/y/providers/Microsoft.X/registries/myreg`
/// parses to `myreg`.
pub fn parse_resource_name(identifier: &str) -> Result<&str, NamingError> {
    match identifier.rsplit('/').next() {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(NamingError::MalformedIdentifier),
    }
}

/// Parts of an agent VM name like `k8s-agentpool1-11290731-0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmNameParts {
    pub prefix: String,
    pub group: String,
    pub qualifier: String,
    pub sequence: u32,
}

/// Split a VM name into its fixed four fields. The final field must parse
/// as a non-negative integer sequence number.
pub fn parse_vm_name_parts(name: &str) -> Result<VmNameParts, NamingError> {
    let parts: Vec<&str> = name.split('-').collect();
    if parts.len() != 4 {
        return Err(NamingError::MalformedName(name.to_string()));
    }

    let sequence = parts[3]
        .parse::<u32>()
        .map_err(|_| NamingError::MalformedName(name.to_string()))?;

    Ok(VmNameParts {
        prefix: parts[0].to_string(),
        group: parts[1].to_string(),
        qualifier: parts[2].to_string(),
        sequence,
    })
}

/// Decomposed blob URI: storage account, container, and blob path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobUriParts {
    pub account: String,
    pub container: String,
    pub blob_path: String,
}

/// Split a blob URI like
/// `https://account.blob.core.windows.net/vhds/dir/disk.vhd` into its
/// account name, container name and blob path.
pub fn split_blob_uri(uri: &str) -> Result<BlobUriParts, NamingError> {
    let malformed = || NamingError::MalformedBlobUri(uri.to_string());

    let url = Url::parse(uri).map_err(|_| malformed())?;
    let host = url.host_str().ok_or_else(malformed)?;
    let account = host.split('.').next().unwrap_or(host).to_string();

    let mut segments = url.path_segments().ok_or_else(malformed)?;
    let container = segments
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(malformed)?
        .to_string();
    let blob_path = segments.collect::<Vec<_>>().join("/");

    Ok(BlobUriParts {
        account,
        container,
        blob_path,
    })
}

/// Trailing hyphen field of a name, used as the ordering key.
fn suffix(name: &str) -> &str {
    name.rsplit('-').next().unwrap_or(name)
}

/// Order two VM names by their trailing suffix compared as a string.
///
/// The comparison is lexicographic, so `"10"` sorts before `"2"`. This
/// matches the historical fleet ordering exactly; use [`cmp_by_sequence`]
/// when numeric ordering is wanted.
pub fn cmp_by_suffix(a: &str, b: &str) -> Ordering {
    suffix(a).cmp(suffix(b))
}

/// Order two VM names numerically by their parsed sequence number. Names
/// that fail to parse sort after well-formed ones.
pub fn cmp_by_sequence(a: &str, b: &str) -> Ordering {
    match (parse_vm_name_parts(a), parse_vm_name_parts(b)) {
        (Ok(a), Ok(b)) => a.sequence.cmp(&b.sequence),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => Ordering::Equal,
    }
}

/// Sort a slice of VM objects (JSON, keyed by `name`) by their name
/// suffix, in the historical string order.
pub fn sort_vms_by_suffix(vms: &mut [Value]) {
    vms.sort_by(|a, b| {
        let a = a.get("name").and_then(|v| v.as_str()).unwrap_or("");
        let b = b.get("name").and_then(|v| v.as_str()).unwrap_or("");
        cmp_by_suffix(a, b)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resource_name_is_the_last_segment() {
        let id = "/subscriptions/x/resourceGroups/y/providers/Microsoft.X/registries/myreg";
        assert_eq!(parse_resource_name(id), Ok("myreg"));
        assert_eq!(parse_resource_name("plain-name"), Ok("plain-name"));
    }

    #[test]
    fn trailing_slash_and_empty_identifiers_are_rejected() {
        assert_eq!(
            parse_resource_name("a/b/"),
            Err(NamingError::MalformedIdentifier)
        );
        assert_eq!(
            parse_resource_name(""),
            Err(NamingError::MalformedIdentifier)
        );
    }

    #[test]
    fn vm_name_parts_round_trip() {
        let parts = parse_vm_name_parts("k8s-agentpool1-11290731-0").unwrap();
        assert_eq!(parts.prefix, "k8s");
        assert_eq!(parts.group, "agentpool1");
        assert_eq!(parts.qualifier, "11290731");
        assert_eq!(parts.sequence, 0);
    }

    #[test]
    fn vm_name_wrong_arity_is_rejected() {
        assert!(matches!(
            parse_vm_name_parts("a-b-c"),
            Err(NamingError::MalformedName(_))
        ));
        assert!(matches!(
            parse_vm_name_parts("a-b-c-d-e"),
            Err(NamingError::MalformedName(_))
        ));
    }

    #[test]
    fn vm_name_non_numeric_suffix_is_rejected() {
        assert!(matches!(
            parse_vm_name_parts("k8s-agentpool1-11290731-x"),
            Err(NamingError::MalformedName(_))
        ));
    }

    #[test]
    fn blob_uri_decomposes() {
        let parts =
            split_blob_uri("https://myacct.blob.core.windows.net/vhds/dir/disk.vhd").unwrap();
        assert_eq!(parts.account, "myacct");
        assert_eq!(parts.container, "vhds");
        assert_eq!(parts.blob_path, "dir/disk.vhd");
    }

    #[test]
    fn blob_uri_without_container_is_rejected() {
        assert!(split_blob_uri("https://myacct.blob.core.windows.net/").is_err());
        assert!(split_blob_uri("not a uri").is_err());
    }

    #[test]
    fn suffix_sort_is_lexicographic_not_numeric() {
        let mut names = vec!["vm-1-1-9", "vm-1-1-10", "vm-1-1-2"];
        names.sort_by(|a, b| cmp_by_suffix(a, b));
        assert_eq!(names, vec!["vm-1-1-10", "vm-1-1-2", "vm-1-1-9"]);
    }

    #[test]
    fn sequence_sort_is_numeric() {
        let mut names = vec!["vm-1-1-9", "vm-1-1-10", "vm-1-1-2"];
        names.sort_by(|a, b| cmp_by_sequence(a, b));
        assert_eq!(names, vec!["vm-1-1-2", "vm-1-1-9", "vm-1-1-10"]);
    }

    #[test]
    fn vm_objects_sort_by_name_suffix() {
        let mut vms = vec![
            json!({"name": "k8s-agentpool1-11290731-3"}),
            json!({"name": "k8s-agentpool1-11290731-1"}),
            json!({"name": "k8s-agentpool1-11290731-2"}),
        ];
        sort_vms_by_suffix(&mut vms);
        let names: Vec<&str> = vms.iter().map(|v| v["name"].as_str().unwrap()).collect();
        assert_eq!(
            names,
            vec![
                "k8s-agentpool1-11290731-1",
                "k8s-agentpool1-11290731-2",
                "k8s-agentpool1-11290731-3",
            ]
        );
    }
}
