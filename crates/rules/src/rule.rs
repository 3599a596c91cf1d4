use std::sync::atomic::{AtomicI64, Ordering};

use dds_core::{now_millis, RuleId};
use serde::Serialize;

/// A rule reacting to an event, with its recency marker.
///
/// `last_used_time` is epoch milliseconds, `0` meaning never used. It only
/// moves forward: concurrent commits keep the largest stamp.
#[derive(Debug)]
pub struct Rule {
    event: String,
    description: String,
    last_used_time: AtomicI64,
}

impl Rule {
    pub fn new(event: impl Into<String>, description: impl Into<String>) -> Self {
        Self::with_last_used_time(event, description, 0)
    }

    /// Restore a rule with a known last-used time.
    pub fn with_last_used_time(
        event: impl Into<String>,
        description: impl Into<String>,
        last_used_time: i64,
    ) -> Self {
        Self {
            event: event.into(),
            description: description.into(),
            last_used_time: AtomicI64::new(last_used_time),
        }
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn last_used_time(&self) -> i64 {
        self.last_used_time.load(Ordering::Acquire)
    }

    pub fn is_never_used(&self) -> bool {
        self.last_used_time() == 0
    }

    /// Stamp the rule as used now; returns the stored time afterwards.
    pub fn update_last_used_time(&self) -> i64 {
        let now = now_millis();
        let previous = self.last_used_time.fetch_max(now, Ordering::AcqRel);
        previous.max(now)
    }

    pub fn snapshot(&self, id: RuleId) -> RuleSnapshot {
        RuleSnapshot {
            id,
            event: self.event.clone(),
            description: self.description.clone(),
            last_used_time: self.last_used_time(),
        }
    }
}

/// Point-in-time copy of a rule, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleSnapshot {
    pub id: RuleId,
    pub event: String,
    pub description: String,
    pub last_used_time: i64,
}
