//! Health endpoint payload.

use serde_json::{json, Value};

/// Identity of the running service, reported on `/health` and attached to
/// every metric as constant labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    // ---
    pub name: String,
    pub version: String,
    pub instance: String,
}

impl ServiceInfo {
    // ---
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        instance: impl Into<String>,
    ) -> Self {
        // ---
        Self {
            name: name.into(),
            version: version.into(),
            instance: instance.into(),
        }
    }
}

/// Something that can describe its own state for the health endpoint.
///
/// Implementations are read from the HTTP task while the owner keeps
/// mutating, so they must be safe for concurrent reads.
pub trait HealthSource: Send + Sync {
    fn details(&self) -> Value;
}

pub(crate) fn health_body(info: &ServiceInfo, source: Option<&dyn HealthSource>) -> Value {
    // ---
    json!({
        "status": "healthy",
        "service": info.name,
        "version": info.version,
        "instance": info.instance,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "details": source.map(|s| s.details()).unwrap_or(Value::Null),
    })
}
