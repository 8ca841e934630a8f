use serde::{Deserialize, Serialize};

use crate::{
    domain::sanitize_segment,
    error::{ModelError, ModelResult},
};

/// Where the deployable artifact of a service comes from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ServiceSource {
    /// Prebuilt container image reference (e.g. `"ghcr.io/acme/web:1.2"`).
    Image(String),
    /// Source archive location, usually a canonical key returned by the upload flow.
    SourceUrl(String),
}

impl ServiceSource {
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceSource::Image(_) => "image",
            ServiceSource::SourceUrl(_) => "sourceUrl",
        }
    }

    pub fn location(&self) -> &str {
        match self {
            ServiceSource::Image(s) | ServiceSource::SourceUrl(s) => s,
        }
    }
}

/// One deployment request: put `source` behind `service` in `environment`.
///
/// Construction validates that both names are non-empty and still non-empty
/// once reserved characters are removed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploySpec {
    environment: String,
    service: String,
    source: ServiceSource,
}

impl DeploySpec {
    pub fn new(
        environment: impl Into<String>,
        service: impl Into<String>,
        source: ServiceSource,
    ) -> ModelResult<Self> {
        let environment = environment.into();
        let service = service.into();
        validate_name("environment name", &environment)?;
        validate_name("service name", &service)?;
        if source.location().trim().is_empty() {
            return Err(ModelError::Empty {
                field: "service source",
            });
        }
        Ok(Self {
            environment,
            service,
            source,
        })
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn source(&self) -> &ServiceSource {
        &self.source
    }

    /// Environment name as used in resource and storage keys.
    pub fn environment_key(&self) -> String {
        sanitize_segment(&self.environment)
    }

    /// Service name as used in resource and storage keys.
    pub fn service_key(&self) -> String {
        sanitize_segment(&self.service)
    }
}

/// Check a tenant-supplied name and return its sanitized form.
pub(crate) fn validate_name(field: &'static str, raw: &str) -> ModelResult<String> {
    if raw.trim().is_empty() {
        return Err(ModelError::Empty { field });
    }
    let clean = sanitize_segment(raw);
    if clean.is_empty() {
        return Err(ModelError::EmptyAfterSanitize {
            field,
            raw: raw.to_string(),
        });
    }
    Ok(clean)
}

/// Final payload of a successful deployment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployOutcome {
    /// Control-plane id of the service; empty when the service already existed.
    pub id: String,
    /// Reachable endpoint; empty when the resource reported none.
    pub url: String,
}

/// Registry login material stored as an upload credential.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSpec {
    pub server: String,
    pub username: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
}

impl CredentialSpec {
    pub fn validate(&self) -> ModelResult<()> {
        validate_name("registry server", &self.server)?;
        if self.username.trim().is_empty() {
            return Err(ModelError::Empty { field: "username" });
        }
        Ok(())
    }
}

impl std::fmt::Debug for CredentialSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialSpec")
            .field("server", &self.server)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("email", &self.email)
            .finish()
    }
}
