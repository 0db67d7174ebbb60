use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Correlation ID type for tracking a request through logs and responses
///
/// Uses UUID v4 so IDs supplied by upstream callers and IDs generated here
/// share one format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Generate a new correlation ID using UUID v4
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a caller-supplied header value, returning `None` when it is not a UUID
    pub fn parse(value: &str) -> Option<Self> {
        Uuid::try_parse(value.trim()).ok().map(Self)
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for CorrelationId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<&str> for CorrelationId {
    fn from(id: &str) -> Self {
        Self::parse(id).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_uuid_header_values() {
        let id = Uuid::new_v4();
        let parsed = CorrelationId::parse(&format!(" {id} "));
        assert_eq!(parsed, Some(CorrelationId::from(id)));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(CorrelationId::parse("not-a-uuid").is_none());
    }

    #[test]
    fn from_str_falls_back_to_fresh_id() {
        let first = CorrelationId::from("nope");
        let second = CorrelationId::from("nope");
        assert_ne!(first, second);
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = CorrelationId::new();
        let json = serde_json::to_string(&id).unwrap_or_default();
        assert_eq!(json, format!("\"{id}\""));
    }
}
