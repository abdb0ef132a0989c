//! API constants
//!
//! Routes are versioned under `API_PREFIX`. Handler path annotations for OpenAPI use the
//! literal `/api/v0`, so changing the version means updating both.

/// OpenAPI document path (version-independent)
pub const OPENAPI_PATH: &str = "/api/openapi.json";

/// Versioned prefix every file route is mounted under
pub const API_PREFIX: &str = "/api/v0";

/// Multipart field carrying the uploaded file
pub const FILE_FIELD: &str = "file";

/// Storage key looked up by the health check; never written
pub const HEALTH_CHECK_KEY: &str = "health-check-non-existent-key";
