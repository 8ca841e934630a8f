use std::fmt;

use serde::{Deserialize, Serialize};

/// Kinds of control-plane resources haiku creates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Tenant environment; cluster-scoped namespace.
    Environment,
    /// Deployable service inside an environment.
    Service,
    /// Registry credential used to pull or push images.
    RegistryCredential,
}

impl ResourceKind {
    /// Kind name as reported in resource snapshots.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Environment => "Namespace",
            ResourceKind::Service => "Service",
            ResourceKind::RegistryCredential => "DockerLogin",
        }
    }

    /// Environments are not namespaced themselves.
    pub fn is_namespaced(&self) -> bool {
        !matches!(self, ResourceKind::Environment)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unique id assigned by the control plane on creation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
