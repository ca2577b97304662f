use crate::error::{GatewayError, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

pub const RESOURCE_TYPE: &str = "resource";
pub const NAMESPACE_TYPE: &str = "namespace";
pub const FOLDER_TYPE_PREFIX: &str = "folder:";

const MAX_NAMESPACE_LEN: usize = 256;
const STORE_NAME_PREFIX: &str = "authz-";
const STORE_NAME_DIGEST_BYTES: usize = 8;

/// Kind of protected resource a namespace classifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceKind {
    Resource,
    Namespace,
    Folder,
    Other,
}

/// Validated key used to look up the store and model of a namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Namespace(String);

impl Namespace {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(GatewayError::InvalidRequest("namespace is empty".to_string()));
        }
        if value.len() > MAX_NAMESPACE_LEN {
            return Err(GatewayError::InvalidRequest(format!(
                "namespace exceeds {} bytes",
                MAX_NAMESPACE_LEN
            )));
        }
        if value.trim() != value || value.chars().any(char::is_control) {
            return Err(GatewayError::InvalidRequest(format!(
                "namespace {:?} contains whitespace or control characters",
                value
            )));
        }
        if !value.chars().any(|c| c.is_ascii_alphanumeric()) {
            return Err(GatewayError::InvalidRequest(format!(
                "namespace {:?} has no alphanumeric characters",
                value
            )));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn kind(&self) -> NamespaceKind {
        match self.0.as_str() {
            RESOURCE_TYPE => NamespaceKind::Resource,
            NAMESPACE_TYPE => NamespaceKind::Namespace,
            s if s.starts_with(FOLDER_TYPE_PREFIX) => NamespaceKind::Folder,
            _ => NamespaceKind::Other,
        }
    }

    /// Name of the engine store backing this namespace.
    ///
    /// A readable slug followed by a digest of the exact namespace, e.g.
    /// `folder:abc` -> `authz-folder-abc-<16 hex digits>`. The slug folds case
    /// and punctuation, so the digest keeps distinct namespaces apart.
    pub fn store_name(&self) -> String {
        let mut slug = String::with_capacity(self.0.len());
        for c in self.0.chars() {
            if c.is_ascii_alphanumeric() {
                slug.push(c.to_ascii_lowercase());
            } else if !slug.is_empty() && !slug.ends_with('-') {
                slug.push('-');
            }
        }
        let slug = slug.trim_end_matches('-');

        let digest = Sha256::digest(self.0.as_bytes());
        let suffix: String = digest[..STORE_NAME_DIGEST_BYTES]
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();
        format!("{}{}-{}", STORE_NAME_PREFIX, slug, suffix)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Namespace {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl AsRef<str> for Namespace {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
