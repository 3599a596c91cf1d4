//! Last-used bookkeeping for every entity a winning rule touches.

use std::collections::HashMap;
use std::sync::RwLock;

use dds_core::{CriterionId, EntityKind, ResponseId, RuleId};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityKey {
    Rule(RuleId),
    Criterion(CriterionId),
    Response(ResponseId),
    Context(String),
}

impl EntityKey {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityKey::Rule(_) => EntityKind::Rule,
            EntityKey::Criterion(_) => EntityKind::Criterion,
            EntityKey::Response(_) => EntityKind::Response,
            EntityKey::Context(_) => EntityKind::Context,
        }
    }
}

/// Entity → last-used epoch milliseconds. Stamps never move backwards.
#[derive(Debug, Default)]
pub struct RecencyLedger {
    entries: RwLock<HashMap<EntityKey, i64>>,
}

impl RecencyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that every key in `keys` was used at `at`.
    pub fn stamp_all(&self, keys: impl IntoIterator<Item = EntityKey>, at: i64) {
        let mut entries = self.entries.write().expect("recency lock poisoned");
        for key in keys {
            entries
                .entry(key)
                .and_modify(|t| *t = (*t).max(at))
                .or_insert(at);
        }
    }

    pub fn last_used(&self, key: &EntityKey) -> Option<i64> {
        self.entries
            .read()
            .expect("recency lock poisoned")
            .get(key)
            .copied()
    }

    pub fn forget(&self, key: &EntityKey) {
        self.entries.write().expect("recency lock poisoned").remove(key);
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("recency lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn stamps_keep_the_latest_time() {
        let ledger = RecencyLedger::new();
        let rule = EntityKey::Rule(Uuid::new_v4());
        ledger.stamp_all([rule.clone()], 200);
        ledger.stamp_all([rule.clone()], 100);
        assert_eq!(ledger.last_used(&rule), Some(200));
        assert_eq!(rule.kind(), EntityKind::Rule);
    }

    #[test]
    fn forget_drops_the_entry() {
        let ledger = RecencyLedger::new();
        let ctx = EntityKey::Context("mood".to_string());
        ledger.stamp_all([ctx.clone(), EntityKey::Response(Uuid::new_v4())], 5);
        assert_eq!(ledger.len(), 2);
        ledger.forget(&ctx);
        assert_eq!(ledger.last_used(&ctx), None);
        assert_eq!(ledger.len(), 1);
    }
}
