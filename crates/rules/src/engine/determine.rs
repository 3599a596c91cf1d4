//! Event handling: refresh candidate rules, pick one, commit and deliver.

use std::collections::HashSet;
use std::sync::Arc;

use dds_core::{
    now_millis, CriterionId, DdsError, Response, ResponseId, Result, RuleId, User, UserId,
};
use dds_notify::{Delivery, DeliveryResult};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::Engine;
use crate::criterion::Criterion;
use crate::recency::EntityKey;
use crate::rule::Rule;
use crate::selection::{self, Candidate, Tier};

/// Outcome of one event that selected a rule.
#[derive(Debug, Clone)]
pub struct Decision {
    pub event: String,
    pub user_id: UserId,
    pub rule_id: RuleId,
    pub tier: Tier,
    /// The winning rule's last-used time after the commit.
    pub used_at: i64,
    pub responses: Vec<Response>,
    pub deliveries: Vec<DeliveryResult>,
    /// Candidates left out because a criterion could not be refreshed.
    pub failures: Vec<RefreshFailure>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefreshFailure {
    pub rule_id: RuleId,
    pub error: DdsError,
}

/// A candidate rule with its criteria resolved.
struct Plan {
    rule_id: RuleId,
    rule: Arc<Rule>,
    criteria: Vec<(CriterionId, Arc<Criterion>)>,
}

impl Engine {
    /// Handle `event` for `user_id`: refresh every rule bound to the event
    /// against the user's contexts, select one, mark it used and deliver its
    /// responses.
    ///
    /// Returns `Ok(None)` when no rule is bound to the event or no tier
    /// produces a winner. A rule whose criteria fail to refresh is excluded;
    /// if every candidate fails, the first failure is returned.
    pub fn determine_response(&self, user_id: UserId, event: &str) -> Result<Option<Decision>> {
        let user = self.user(user_id)?;

        let plans = self.plan_candidates(event);
        if plans.is_empty() {
            debug!(event, user_id, "no rules bound to event");
            return Ok(None);
        }

        let outcomes: Vec<Result<Option<f64>>> = self
            .refresh_pool
            .install(|| plans.par_iter().map(|plan| refresh(&user, plan)).collect());

        let mut viable: Vec<(&Plan, Candidate)> = Vec::with_capacity(plans.len());
        let mut failures = Vec::new();
        for (plan, outcome) in plans.iter().zip(outcomes) {
            match outcome {
                Ok(score) => {
                    viable.push((plan, Candidate::new(score, plan.rule.last_used_time())));
                }
                Err(error) => {
                    warn!(
                        event,
                        user_id,
                        rule_id = %plan.rule_id,
                        %error,
                        "candidate refresh failed"
                    );
                    failures.push(RefreshFailure {
                        rule_id: plan.rule_id,
                        error,
                    });
                }
            }
        }

        if viable.is_empty() {
            return match failures.into_iter().next() {
                Some(failure) => Err(failure.error),
                None => Ok(None),
            };
        }

        let candidates: Vec<Candidate> = viable.iter().map(|(_, c)| *c).collect();
        let chosen = {
            let mut rng = self.rng.lock().expect("rng lock poisoned");
            selection::select(&candidates, now_millis(), &self.blend(), &mut *rng)
        };
        let Some(chosen) = chosen else {
            debug!(event, user_id, candidates = candidates.len(), "no rule selected");
            return Ok(None);
        };
        let (winner, _) = viable[chosen.index];

        let responses = self.resolve_responses(winner.rule_id);
        let payloads: Vec<Response> = responses.iter().map(|(_, r)| r.clone()).collect();
        self.publisher.ensure_routable(&payloads)?;

        let used_at = winner.rule.update_last_used_time();
        self.recency.stamp_all(
            winner
                .criteria
                .iter()
                .flat_map(|(id, c)| {
                    [
                        EntityKey::Criterion(*id),
                        EntityKey::Context(c.context_name().to_string()),
                    ]
                })
                .chain(responses.iter().map(|(id, _)| EntityKey::Response(*id))),
            used_at,
        );

        info!(
            event,
            user_id,
            rule_id = %winner.rule_id,
            tier = %chosen.tier,
            candidates = candidates.len(),
            responses = payloads.len(),
            "rule selected"
        );

        let delivery = Delivery {
            user_id,
            event,
            rule_id: winner.rule_id,
            state: self,
        };
        let deliveries = self.publisher.publish(&delivery, &payloads);

        Ok(Some(Decision {
            event: event.to_string(),
            user_id,
            rule_id: winner.rule_id,
            tier: chosen.tier,
            used_at,
            responses: payloads,
            deliveries,
            failures,
        }))
    }

    /// Rules bound to `event` (first binding wins for duplicates) with their criteria.
    fn plan_candidates(&self, event: &str) -> Vec<Plan> {
        let mut seen = HashSet::new();
        let rule_ids: Vec<RuleId> = self
            .index
            .rules_for_event(event)
            .into_iter()
            .filter(|id| seen.insert(*id))
            .collect();
        if rule_ids.is_empty() {
            return Vec::new();
        }

        let rules = self.rules.read().expect("rules lock poisoned");
        let criteria = self.criteria.read().expect("criteria lock poisoned");
        rule_ids
            .into_iter()
            .filter_map(|rule_id| {
                let rule = Arc::clone(rules.get(&rule_id)?);
                let criteria = self
                    .index
                    .criteria_for_rule(rule_id)
                    .into_iter()
                    .filter_map(|id| criteria.get(&id).map(|c| (id, Arc::clone(c))))
                    .collect();
                Some(Plan {
                    rule_id,
                    rule,
                    criteria,
                })
            })
            .collect()
    }

    fn resolve_responses(&self, rule_id: RuleId) -> Vec<(ResponseId, Response)> {
        let responses = self.responses.read().expect("responses lock poisoned");
        self.index
            .responses_for_rule(rule_id)
            .into_iter()
            .filter_map(|id| responses.get(&id).map(|r| (id, r.clone())))
            .collect()
    }
}

/// Re-evaluate every criterion of `plan` against the user's contexts.
fn refresh(user: &User, plan: &Plan) -> Result<Option<f64>> {
    let mut outcomes = Vec::with_capacity(plan.criteria.len());
    for (_, criterion) in &plan.criteria {
        let context = user
            .contexts()
            .get(criterion.context_name())
            .ok_or_else(|| DdsError::UnknownContext(criterion.context_name().to_string()))?;
        outcomes.push((criterion.weight(), criterion.update(&context)?));
    }
    Ok(selection::weight_score(outcomes))
}
