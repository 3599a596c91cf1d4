//! The [`Engine`] owns every rule, criterion, response, binding and user
//! store, and exposes the administrative interface over them.
//!
//! Each shared collection sits behind its own `RwLock`. When an operation
//! needs several, it takes them in field declaration order:
//! rules → criteria → responses → events → response types → bindings →
//! recency → context definitions → users → a user's context store.
//! Removals that must check references hold the write lock of the collection
//! being removed from across both the scan and the mutation.

mod determine;
mod users;


use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use dds_core::{
    Context, CriterionId, DdsError, EngineConfig, EntityKind, Response, ResponseId, Result,
    RuleId, User, UserId,
};
use dds_notify::{Notifiable, Publisher};
use indexmap::{IndexMap, IndexSet};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::criterion::Criterion;
use crate::index::AssociationIndex;
use crate::recency::{EntityKey, RecencyLedger};
use crate::rule::{Rule, RuleSnapshot};
use crate::selection::Blend;

pub use self::determine::{Decision, RefreshFailure};

pub struct Engine {
    config: EngineConfig,
    rules: RwLock<IndexMap<RuleId, Arc<Rule>>>,
    criteria: RwLock<IndexMap<CriterionId, Arc<Criterion>>>,
    responses: RwLock<IndexMap<ResponseId, Response>>,
    events: RwLock<IndexSet<String>>,
    response_types: RwLock<IndexSet<String>>,
    index: AssociationIndex,
    recency: RecencyLedger,
    /// Context name → definition (initial value) copied into every user.
    context_defs: RwLock<IndexMap<String, Context>>,
    users: RwLock<HashMap<UserId, Arc<User>>>,
    publisher: Publisher,
    refresh_pool: rayon::ThreadPool,
    rng: Mutex<StdRng>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let refresh_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.refresh_threads.max(1))
            .thread_name(|i| format!("dds-refresh-{i}"))
            .build()
            .expect("Failed to build rayon thread pool");
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            config,
            rules: RwLock::new(IndexMap::new()),
            criteria: RwLock::new(IndexMap::new()),
            responses: RwLock::new(IndexMap::new()),
            events: RwLock::new(IndexSet::new()),
            response_types: RwLock::new(IndexSet::new()),
            index: AssociationIndex::new(),
            recency: RecencyLedger::new(),
            context_defs: RwLock::new(IndexMap::new()),
            users: RwLock::new(HashMap::new()),
            publisher: Publisher::new(),
            refresh_pool,
            rng: Mutex::new(rng),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn blend(&self) -> Blend {
        Blend {
            score_weight: self.config.score_weight,
            recency_weight: self.config.recency_weight,
        }
    }

    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    /// Register `subscriber` for responses of `response_type`.
    pub fn subscribe(&self, response_type: &str, subscriber: Arc<dyn Notifiable>) -> bool {
        self.add_response_type(response_type);
        self.publisher.add_subscriber(response_type, subscriber)
    }

    /// Last time the entity was part of a winning decision.
    pub fn last_used(&self, key: &EntityKey) -> Option<i64> {
        match key {
            EntityKey::Rule(id) => self.rule(*id).map(|r| r.last_used_time),
            _ => self.recency.last_used(key),
        }
    }

    // ── Rules ───────────────────────────────────────────────────────

    pub fn add_rule(&self, rule: Rule) -> RuleId {
        let id = Uuid::new_v4();
        self.rules
            .write()
            .expect("rules lock poisoned")
            .insert(id, Arc::new(rule));
        id
    }

    /// Remove a rule along with all of its bindings and recency entry.
    pub fn remove_rule(&self, id: RuleId) -> Result<()> {
        let mut rules = self.rules.write().expect("rules lock poisoned");
        if !rules.contains_key(&id) {
            return Err(DdsError::unknown(EntityKind::Rule, id));
        }
        self.index.remove_rule(id);
        self.recency.forget(&EntityKey::Rule(id));
        rules.shift_remove(&id);
        debug!(rule_id = %id, "rule removed");
        Ok(())
    }

    pub fn rule(&self, id: RuleId) -> Option<RuleSnapshot> {
        self.rules
            .read()
            .expect("rules lock poisoned")
            .get(&id)
            .map(|r| r.snapshot(id))
    }

    pub fn rules(&self) -> Vec<RuleSnapshot> {
        self.rules
            .read()
            .expect("rules lock poisoned")
            .iter()
            .map(|(id, r)| r.snapshot(*id))
            .collect()
    }

    fn require_rule(&self, id: RuleId) -> Result<Arc<Rule>> {
        self.rules
            .read()
            .expect("rules lock poisoned")
            .get(&id)
            .cloned()
            .ok_or_else(|| DdsError::unknown(EntityKind::Rule, id))
    }

    fn describe_rule(rules: &IndexMap<RuleId, Arc<Rule>>, id: RuleId) -> String {
        match rules.get(&id) {
            Some(rule) => format!("Rule {id} ({})", rule.description()),
            None => format!("Rule {id}"),
        }
    }

    // ── Criteria ────────────────────────────────────────────────────

    pub fn add_criterion(&self, criterion: Criterion) -> CriterionId {
        let id = Uuid::new_v4();
        self.criteria
            .write()
            .expect("criteria lock poisoned")
            .insert(id, Arc::new(criterion));
        id
    }

    /// Remove a criterion no rule references any more.
    pub fn remove_criterion(&self, id: CriterionId) -> Result<()> {
        let rules = self.rules.read().expect("rules lock poisoned");
        let mut criteria = self.criteria.write().expect("criteria lock poisoned");
        let Some(criterion) = criteria.get(&id) else {
            return Err(DdsError::unknown(EntityKind::Criterion, id));
        };

        if let Some(rule_id) = self.index.rule_using_criterion(id) {
            let err = DdsError::IntegrityViolation {
                entity: format!("Criterion {id} ({criterion})"),
                blocker: Self::describe_rule(&rules, rule_id),
            };
            warn!(criterion_id = %id, rule_id = %rule_id, "criterion removal blocked");
            return Err(err);
        }

        self.recency.forget(&EntityKey::Criterion(id));
        criteria.shift_remove(&id);
        Ok(())
    }

    pub fn criterion(&self, id: CriterionId) -> Option<Arc<Criterion>> {
        self.criteria
            .read()
            .expect("criteria lock poisoned")
            .get(&id)
            .cloned()
    }

    // ── Responses ───────────────────────────────────────────────────

    /// Register a response; its type tag joins the response-type registry.
    pub fn add_response(&self, response: Response) -> ResponseId {
        let id = Uuid::new_v4();
        let response_type = response.response_type.clone();
        self.responses
            .write()
            .expect("responses lock poisoned")
            .insert(id, response);
        self.add_response_type(&response_type);
        id
    }

    /// Remove a response no rule references any more.
    pub fn remove_response(&self, id: ResponseId) -> Result<()> {
        let rules = self.rules.read().expect("rules lock poisoned");
        let mut responses = self.responses.write().expect("responses lock poisoned");
        let Some(response) = responses.get(&id) else {
            return Err(DdsError::unknown(EntityKind::Response, id));
        };

        if let Some(rule_id) = self.index.rule_using_response(id) {
            let err = DdsError::IntegrityViolation {
                entity: format!(
                    "Response {id} ({}: {})",
                    response.response_type, response.value
                ),
                blocker: Self::describe_rule(&rules, rule_id),
            };
            warn!(response_id = %id, rule_id = %rule_id, "response removal blocked");
            return Err(err);
        }

        self.recency.forget(&EntityKey::Response(id));
        responses.shift_remove(&id);
        Ok(())
    }

    pub fn response(&self, id: ResponseId) -> Option<Response> {
        self.responses
            .read()
            .expect("responses lock poisoned")
            .get(&id)
            .cloned()
    }

    // ── Events and response types ───────────────────────────────────

    /// Register an event name; returns false if it was already known.
    pub fn add_event(&self, event: &str) -> bool {
        self.events
            .write()
            .expect("events lock poisoned")
            .insert(event.to_string())
    }

    /// Forget an event and every rule bound to it.
    pub fn remove_event(&self, event: &str) -> bool {
        let mut events = self.events.write().expect("events lock poisoned");
        let unbound = self.index.remove_event(event);
        if !unbound.is_empty() {
            debug!(event, rules = unbound.len(), "event bindings dropped");
        }
        events.shift_remove(event) || !unbound.is_empty()
    }

    pub fn events(&self) -> Vec<String> {
        self.events
            .read()
            .expect("events lock poisoned")
            .iter()
            .cloned()
            .collect()
    }

    pub fn add_response_type(&self, response_type: &str) -> bool {
        self.response_types
            .write()
            .expect("response types lock poisoned")
            .insert(response_type.to_string())
    }

    pub fn remove_response_type(&self, response_type: &str) -> bool {
        self.response_types
            .write()
            .expect("response types lock poisoned")
            .shift_remove(response_type)
    }

    pub fn response_types(&self) -> Vec<String> {
        self.response_types
            .read()
            .expect("response types lock poisoned")
            .iter()
            .cloned()
            .collect()
    }

    // ── Bindings ────────────────────────────────────────────────────

    /// Make `rule` a candidate whenever `event` fires. Registers the event.
    pub fn bind_event_rule(&self, event: &str, rule: RuleId) -> Result<()> {
        let rules = self.rules.read().expect("rules lock poisoned");
        if !rules.contains_key(&rule) {
            return Err(DdsError::unknown(EntityKind::Rule, rule));
        }
        self.events
            .write()
            .expect("events lock poisoned")
            .insert(event.to_string());
        self.index.bind_event(event, rule);
        Ok(())
    }

    pub fn unbind_event_rule(&self, event: &str, rule: RuleId) -> bool {
        self.index.unbind_event(event, rule)
    }

    pub fn bind_rule_criterion(&self, rule: RuleId, criterion: CriterionId) -> Result<()> {
        let rules = self.rules.read().expect("rules lock poisoned");
        let criteria = self.criteria.read().expect("criteria lock poisoned");
        if !rules.contains_key(&rule) {
            return Err(DdsError::unknown(EntityKind::Rule, rule));
        }
        if !criteria.contains_key(&criterion) {
            return Err(DdsError::unknown(EntityKind::Criterion, criterion));
        }
        self.index.bind_criterion(rule, criterion);
        Ok(())
    }

    pub fn unbind_rule_criterion(&self, rule: RuleId, criterion: CriterionId) -> bool {
        self.index.unbind_criterion(rule, criterion)
    }

    pub fn bind_rule_response(&self, rule: RuleId, response: ResponseId) -> Result<()> {
        let rules = self.rules.read().expect("rules lock poisoned");
        let responses = self.responses.read().expect("responses lock poisoned");
        if !rules.contains_key(&rule) {
            return Err(DdsError::unknown(EntityKind::Rule, rule));
        }
        if !responses.contains_key(&response) {
            return Err(DdsError::unknown(EntityKind::Response, response));
        }
        self.index.bind_response(rule, response);
        Ok(())
    }

    pub fn unbind_rule_response(&self, rule: RuleId, response: ResponseId) -> bool {
        self.index.unbind_response(rule, response)
    }

    pub fn rules_for_event(&self, event: &str) -> Vec<RuleId> {
        self.index.rules_for_event(event)
    }

    pub fn events_for_rule(&self, rule: RuleId) -> Vec<String> {
        self.index.events_for_rule(rule)
    }

    pub fn criteria_for_rule(&self, rule: RuleId) -> Vec<CriterionId> {
        self.index.criteria_for_rule(rule)
    }

    pub fn responses_for_rule(&self, rule: RuleId) -> Vec<ResponseId> {
        self.index.responses_for_rule(rule)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
