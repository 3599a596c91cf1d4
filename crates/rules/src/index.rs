//! Event → rule, rule → criterion and rule → response bindings.
//!
//! Each mapping is an insertion-ordered multimap behind its own `RwLock`.
//! Value lists keep insertion order and may hold the same id more than once.
//! Locks are always taken in declaration order (event_rules, rule_criteria,
//! rule_responses) when more than one is needed.

use std::sync::RwLock;

use dds_core::{CriterionId, ResponseId, RuleId};
use indexmap::IndexMap;

type MultiMap<K, V> = IndexMap<K, Vec<V>>;

fn remove_value<K, V: PartialEq>(map: &mut MultiMap<K, V>, key: &K, value: &V) -> bool
where
    K: std::hash::Hash + Eq,
{
    let Some(values) = map.get_mut(key) else {
        return false;
    };
    let before = values.len();
    values.retain(|v| v != value);
    let removed = values.len() != before;
    if values.is_empty() {
        map.shift_remove(key);
    }
    removed
}

#[derive(Debug, Default)]
pub struct AssociationIndex {
    event_rules: RwLock<MultiMap<String, RuleId>>,
    rule_criteria: RwLock<MultiMap<RuleId, CriterionId>>,
    rule_responses: RwLock<MultiMap<RuleId, ResponseId>>,
}

impl AssociationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Event ↔ rule ────────────────────────────────────────────────

    pub fn bind_event(&self, event: &str, rule: RuleId) {
        self.event_rules
            .write()
            .expect("event index lock poisoned")
            .entry(event.to_string())
            .or_default()
            .push(rule);
    }

    /// Remove every binding of `rule` under `event`.
    pub fn unbind_event(&self, event: &str, rule: RuleId) -> bool {
        let mut map = self.event_rules.write().expect("event index lock poisoned");
        remove_value(&mut map, &event.to_string(), &rule)
    }

    /// Drop every binding under `event`, returning the rules that were bound.
    pub fn remove_event(&self, event: &str) -> Vec<RuleId> {
        self.event_rules
            .write()
            .expect("event index lock poisoned")
            .shift_remove(event)
            .unwrap_or_default()
    }

    pub fn rules_for_event(&self, event: &str) -> Vec<RuleId> {
        self.event_rules
            .read()
            .expect("event index lock poisoned")
            .get(event)
            .cloned()
            .unwrap_or_default()
    }

    /// Every event `rule` is bound to, in event insertion order.
    pub fn events_for_rule(&self, rule: RuleId) -> Vec<String> {
        self.event_rules
            .read()
            .expect("event index lock poisoned")
            .iter()
            .filter(|(_, rules)| rules.contains(&rule))
            .map(|(event, _)| event.clone())
            .collect()
    }

    pub fn bound_events(&self) -> Vec<String> {
        self.event_rules
            .read()
            .expect("event index lock poisoned")
            .keys()
            .cloned()
            .collect()
    }

    // ── Rule ↔ criterion ────────────────────────────────────────────

    pub fn bind_criterion(&self, rule: RuleId, criterion: CriterionId) {
        self.rule_criteria
            .write()
            .expect("criterion index lock poisoned")
            .entry(rule)
            .or_default()
            .push(criterion);
    }

    pub fn unbind_criterion(&self, rule: RuleId, criterion: CriterionId) -> bool {
        let mut map = self.rule_criteria.write().expect("criterion index lock poisoned");
        remove_value(&mut map, &rule, &criterion)
    }

    pub fn criteria_for_rule(&self, rule: RuleId) -> Vec<CriterionId> {
        self.rule_criteria
            .read()
            .expect("criterion index lock poisoned")
            .get(&rule)
            .cloned()
            .unwrap_or_default()
    }

    /// First rule (in binding order) that still references `criterion`.
    pub fn rule_using_criterion(&self, criterion: CriterionId) -> Option<RuleId> {
        self.rule_criteria
            .read()
            .expect("criterion index lock poisoned")
            .iter()
            .find(|(_, criteria)| criteria.contains(&criterion))
            .map(|(rule, _)| *rule)
    }

    // ── Rule ↔ response ─────────────────────────────────────────────

    pub fn bind_response(&self, rule: RuleId, response: ResponseId) {
        self.rule_responses
            .write()
            .expect("response index lock poisoned")
            .entry(rule)
            .or_default()
            .push(response);
    }

    pub fn unbind_response(&self, rule: RuleId, response: ResponseId) -> bool {
        let mut map = self.rule_responses.write().expect("response index lock poisoned");
        remove_value(&mut map, &rule, &response)
    }

    pub fn responses_for_rule(&self, rule: RuleId) -> Vec<ResponseId> {
        self.rule_responses
            .read()
            .expect("response index lock poisoned")
            .get(&rule)
            .cloned()
            .unwrap_or_default()
    }

    pub fn rule_using_response(&self, response: ResponseId) -> Option<RuleId> {
        self.rule_responses
            .read()
            .expect("response index lock poisoned")
            .iter()
            .find(|(_, responses)| responses.contains(&response))
            .map(|(rule, _)| *rule)
    }

    // ── Whole-rule removal ──────────────────────────────────────────

    /// Drop all three kinds of binding for `rule`.
    ///
    /// All three write locks are held together so a reader never sees the
    /// rule half-unbound.
    pub fn remove_rule(&self, rule: RuleId) {
        let mut events = self.event_rules.write().expect("event index lock poisoned");
        let mut criteria = self.rule_criteria.write().expect("criterion index lock poisoned");
        let mut responses = self.rule_responses.write().expect("response index lock poisoned");

        criteria.shift_remove(&rule);
        events.retain(|_, rules| {
            rules.retain(|r| *r != rule);
            !rules.is_empty()
        });
        responses.shift_remove(&rule);
    }
}
