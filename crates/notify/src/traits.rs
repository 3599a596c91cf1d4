//! Notifiable trait definition and shared error types.

use dds_core::{DdsError, RuleId, UserId, UserState};

/// Errors that can occur during response delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The handler itself failed (playback error, script error, ...).
    #[error("Handler failed: {0}")]
    Handler(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The handler tried to touch user state and the engine refused.
    #[error(transparent)]
    Core(#[from] DdsError),
}

/// What a handler learns about the decision that produced a response.
///
/// `state` is the engine's user-state view, so a handler can read the live
/// value behind a context-derived response or record an effect.
pub struct Delivery<'a> {
    pub user_id: UserId,
    pub event: &'a str,
    pub rule_id: RuleId,
    pub state: &'a dyn UserState,
}

/// A response handler (audio, text, scripted, ...).
pub trait Notifiable: Send + Sync {
    /// Handle one produced response.
    fn handle_response(
        &self,
        delivery: &Delivery<'_>,
        response: &dds_core::Response,
    ) -> Result<(), NotifyError>;

    /// Human-readable name for this handler, used in logs.
    fn name(&self) -> &str;
}

/// Result of delivering one response to one subscriber.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DeliveryResult {
    pub subscriber: String,
    pub response_type: String,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}
