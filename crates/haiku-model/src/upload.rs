use std::{
    fmt,
    time::{SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{deploy::validate_name, error::ModelResult};

/// Object key for one source upload.
///
/// Layout: `{environment}/{service}/{unix_seconds}/{suffix}`. Both names are
/// sanitized; the random suffix keeps keys unique within the same second.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadKey {
    environment: String,
    service: String,
    created_at: u64,
    suffix: String,
}

impl UploadKey {
    /// Build a key for an upload created at `now`.
    pub fn generate(environment: &str, service: &str, now: SystemTime) -> ModelResult<Self> {
        Ok(Self {
            environment: validate_name("environment name", environment)?,
            service: validate_name("service name", service)?,
            created_at: now
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            suffix: Uuid::new_v4().simple().to_string(),
        })
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    /// `scheme://bucket/key` locator for the uploaded object.
    pub fn canonical(&self, scheme: &str, bucket: &str) -> String {
        format!("{scheme}://{bucket}/{self}")
    }
}

impl fmt::Display for UploadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.environment, self.service, self.created_at, self.suffix
        )
    }
}

/// Signed upload location handed to the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrl {
    /// Pre-signed, write-only URL.
    pub url: String,
    /// `scheme://bucket/key` of the object the URL writes to.
    pub canonical_key: String,
    pub expires_at: SystemTime,
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn layout_has_four_segments() {
        let key = UploadKey::generate("acme", "web", at(1_700_000_000)).unwrap();
        let s = key.to_string();
        let parts: Vec<&str> = s.split('/').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(&parts[..3], &["acme", "web", "1700000000"]);
        assert_eq!(parts[3].len(), 32);
    }

    #[test]
    fn same_second_keys_differ() {
        let a = UploadKey::generate("acme", "web", at(42)).unwrap();
        let b = UploadKey::generate("acme", "web", at(42)).unwrap();
        assert_eq!(a.created_at(), b.created_at());
        assert_ne!(a, b);
    }

    #[test]
    fn names_are_sanitized() {
        let key = UploadKey::generate("a/c#me", "w[e]b?*", at(1)).unwrap();
        assert!(key.to_string().starts_with("acme/web/1/"));
        assert!(
            key.canonical("s3", "uploads")
                .starts_with("s3://uploads/acme/web/1/")
        );
    }

    #[test]
    fn empty_names_are_rejected() {
        assert!(UploadKey::generate("", "web", at(1)).is_err());
        assert!(UploadKey::generate("acme", "??", at(1)).is_err());
    }
}
