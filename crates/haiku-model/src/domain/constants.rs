//! Well-known label keys stamped on every resource created through haiku.

/// Label carrying the (unsanitized) environment name a resource belongs to.
pub const LABEL_ENVIRONMENT: &str = "haiku.io/environment";

/// Label carrying the service name on service resources.
pub const LABEL_SERVICE: &str = "haiku.io/service";

/// Standard ownership label key.
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Value of [`LABEL_MANAGED_BY`] for everything haiku creates.
pub const MANAGED_BY: &str = "haiku-api";
