use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Caller-supplied user identifier.
pub type UserId = u64;
pub type RuleId = Uuid;
pub type CriterionId = Uuid;
pub type ResponseId = Uuid;

/// Kinds of entity the engine owns, used in error messages and the recency ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Rule,
    Criterion,
    Response,
    Context,
    Event,
    User,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Rule => write!(f, "Rule"),
            EntityKind::Criterion => write!(f, "Criterion"),
            EntityKind::Response => write!(f, "Response"),
            EntityKind::Context => write!(f, "Context"),
            EntityKind::Event => write!(f, "Event"),
            EntityKind::User => write!(f, "User"),
        }
    }
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
