//! End-to-end decision tests through the public engine API: tier behavior,
//! recency updates, tie-break fairness, integrity and concurrent firing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dds_core::{
    now_millis, Context, DdsError, EngineConfig, Response, RuleId, UserState, Value, ValueType,
};
use dds_notify::{Delivery, Notifiable, NotifyError};
use dds_rules::{ComparisonType, Criterion, Engine, Rule, Tier};

// ============================================================================
// Test Helpers
// ============================================================================

#[derive(Default)]
struct Counter {
    hits: AtomicUsize,
}

impl Notifiable for Counter {
    fn handle_response(
        &self,
        _delivery: &Delivery<'_>,
        _response: &Response,
    ) -> Result<(), NotifyError> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        "counter"
    }
}

fn config(seed: u64) -> EngineConfig {
    EngineConfig {
        refresh_threads: 2,
        ..EngineConfig::seeded(seed)
    }
}

/// Engine with one user, an Integer `hp` context and a counting `text` sink.
fn setup(seed: u64) -> (Engine, Arc<Counter>) {
    let engine = Engine::new(config(seed));
    let counter = Arc::new(Counter::default());
    engine.subscribe("text", counter.clone());
    engine.add_context(Context::new("hp", ValueType::Integer, "100"));
    engine.add_user(1).unwrap();
    (engine, counter)
}

/// Add a rule for `event` that answers with one text response.
fn add_rule(engine: &Engine, event: &str, rule: Rule) -> RuleId {
    let description = rule.description().to_string();
    let id = engine.add_rule(rule);
    let response = engine.add_response(Response::new("text", description));
    engine.bind_event_rule(event, id).unwrap();
    engine.bind_rule_response(id, response).unwrap();
    id
}

fn add_criterion(engine: &Engine, rule: RuleId, op: ComparisonType, literal: &str, weight: f64) {
    let criterion = Criterion::new("hp", op, ValueType::Integer, literal, weight).unwrap();
    let id = engine.add_criterion(criterion);
    engine.bind_rule_criterion(rule, id).unwrap();
}

fn winner(engine: &Engine, event: &str) -> (RuleId, Tier) {
    let decision = engine
        .determine_response(1, event)
        .unwrap()
        .expect("a rule should be selected");
    (decision.rule_id, decision.tier)
}

// ============================================================================
// Tiers
// ============================================================================

#[test]
fn event_without_rules_delivers_nothing() {
    let (engine, counter) = setup(1);
    add_rule(&engine, "greet", Rule::new("greet", "hello"));

    assert!(engine.determine_response(1, "farewell").unwrap().is_none());
    assert_eq!(counter.hits.load(Ordering::SeqCst), 0);
}

#[test]
fn single_candidate_wins_and_time_moves_forward() {
    let (engine, counter) = setup(1);
    let rule = add_rule(&engine, "greet", Rule::new("greet", "hello"));
    // A false criterion does not stop a lone candidate.
    add_criterion(&engine, rule, ComparisonType::GreaterThan, "0", 1.0);

    let mut previous = 0;
    for _ in 0..5 {
        let decision = engine.determine_response(1, "greet").unwrap().unwrap();
        assert_eq!(decision.rule_id, rule);
        assert_eq!(decision.tier, Tier::Single);
        assert!(decision.used_at >= previous);
        assert!(decision.used_at > 0);
        previous = decision.used_at;
    }
    assert_eq!(engine.rule(rule).unwrap().last_used_time, previous);
    assert_eq!(counter.hits.load(Ordering::SeqCst), 5);
}

#[test]
fn never_used_rule_takes_priority() {
    let (engine, _) = setup(1);
    let now = now_millis();
    let used = add_rule(&engine, "greet", Rule::with_last_used_time("greet", "used", now - 1_000));
    add_criterion(&engine, used, ComparisonType::EqualTo, "100", 1.0);
    let fresh = add_rule(&engine, "greet", Rule::new("greet", "fresh"));
    add_criterion(&engine, fresh, ComparisonType::EqualTo, "100", 0.5);
    add_criterion(&engine, fresh, ComparisonType::EqualTo, "5", 0.5);

    assert_eq!(winner(&engine, "greet"), (fresh, Tier::NeverUsed));
    // Both are used now; the fully satisfied one wins on score.
    assert_eq!(winner(&engine, "greet").0, used);
}

#[test]
fn rules_without_criteria_rotate_least_recently_used_first() {
    let (engine, _) = setup(1);
    let now = now_millis();
    let first = add_rule(&engine, "idle", Rule::with_last_used_time("idle", "t1", now - 3_000));
    let second = add_rule(&engine, "idle", Rule::with_last_used_time("idle", "t2", now - 2_000));
    let third = add_rule(&engine, "idle", Rule::with_last_used_time("idle", "t3", now - 1_000));

    assert_eq!(winner(&engine, "idle"), (first, Tier::LeastRecentlyUsed));
    assert_eq!(winner(&engine, "idle"), (second, Tier::LeastRecentlyUsed));
    assert_eq!(winner(&engine, "idle"), (third, Tier::LeastRecentlyUsed));
}

#[test]
fn weighted_tier_prefers_the_better_match() {
    let (engine, _) = setup(1);
    let t = now_millis() - 5_000;
    let strong = add_rule(&engine, "hit", Rule::with_last_used_time("hit", "strong", t));
    add_criterion(&engine, strong, ComparisonType::LessThan, "50", 1.0);
    let weak = add_rule(&engine, "hit", Rule::with_last_used_time("hit", "weak", t));
    add_criterion(&engine, weak, ComparisonType::LessThan, "50", 0.5);
    add_criterion(&engine, weak, ComparisonType::GreaterThan, "50", 0.5);

    assert_eq!(winner(&engine, "hit"), (strong, Tier::Weighted));
}

#[test]
fn unconditional_rule_covers_when_no_criteria_match() {
    let (engine, _) = setup(1);
    let now = now_millis();
    let picky = add_rule(&engine, "hit", Rule::with_last_used_time("hit", "picky", now - 9_000));
    add_criterion(&engine, picky, ComparisonType::GreaterThan, "10", 1.0);
    let plain = add_rule(&engine, "hit", Rule::with_last_used_time("hit", "plain", now - 1_000));

    assert_eq!(winner(&engine, "hit"), (plain, Tier::Fallback));
}

#[test]
fn nothing_is_selected_when_no_rule_qualifies() {
    let (engine, counter) = setup(1);
    let now = now_millis();
    for (name, offset) in [("a", 2_000), ("b", 1_000)] {
        let rule = add_rule(&engine, "hit", Rule::with_last_used_time("hit", name, now - offset));
        add_criterion(&engine, rule, ComparisonType::GreaterThan, "10", 1.0);
    }

    assert!(engine.determine_response(1, "hit").unwrap().is_none());
    assert_eq!(counter.hits.load(Ordering::SeqCst), 0);
}

#[test]
fn equal_weighted_scores_are_broken_uniformly() {
    const TRIALS: u64 = 400;
    let mut first_wins = 0;
    for seed in 0..TRIALS {
        let engine = Engine::new(EngineConfig {
            refresh_threads: 1,
            ..EngineConfig::seeded(seed)
        });
        engine.subscribe("text", Arc::new(Counter::default()));
        engine.add_context(Context::new("hp", ValueType::Integer, "100"));
        engine.add_user(1).unwrap();

        let t = now_millis() - 10_000;
        let a = add_rule(&engine, "hit", Rule::with_last_used_time("hit", "a", t));
        add_criterion(&engine, a, ComparisonType::EqualTo, "100", 1.0);
        let b = add_rule(&engine, "hit", Rule::with_last_used_time("hit", "b", t));
        add_criterion(&engine, b, ComparisonType::EqualTo, "100", 1.0);

        let (rule, tier) = winner(&engine, "hit");
        assert_eq!(tier, Tier::Weighted);
        assert!(rule == a || rule == b);
        if rule == a {
            first_wins += 1;
        }
    }
    // Expected 200; the bound is far outside binomial noise.
    assert!(
        (120..=280).contains(&first_wins),
        "first rule won {first_wins} of {TRIALS}"
    );
}

// ============================================================================
// State and integrity
// ============================================================================

#[test]
fn integer_values_round_trip_through_criteria() {
    let (engine, _) = setup(1);
    engine.set_value(1, "hp", "42").unwrap();
    assert_eq!(engine.get_value(1, "hp").unwrap(), Value::Integer(42));

    let rule = add_rule(&engine, "check", Rule::new("check", "exact"));
    let criterion = engine.add_criterion(
        Criterion::new("hp", ComparisonType::EqualTo, ValueType::Integer, "42", 1.0).unwrap(),
    );
    engine.bind_rule_criterion(rule, criterion).unwrap();

    engine.determine_response(1, "check").unwrap().unwrap();
    assert!(engine.criterion(criterion).unwrap().is_true());

    engine.set_value(1, "hp", "41").unwrap();
    engine.determine_response(1, "check").unwrap().unwrap();
    assert!(!engine.criterion(criterion).unwrap().is_true());
}

#[test]
fn failed_removal_leaves_bindings_untouched() {
    let (engine, _) = setup(1);
    let rule = add_rule(&engine, "greet", Rule::new("greet", "hello"));
    add_criterion(&engine, rule, ComparisonType::LessThan, "0", 1.0);
    let criteria = engine.criteria_for_rule(rule);
    let responses = engine.responses_for_rule(rule);

    for id in &criteria {
        assert!(matches!(
            engine.remove_criterion(*id),
            Err(DdsError::IntegrityViolation { .. })
        ));
    }
    for id in &responses {
        assert!(matches!(
            engine.remove_response(*id),
            Err(DdsError::IntegrityViolation { .. })
        ));
    }
    assert!(matches!(
        engine.remove_context("hp"),
        Err(DdsError::IntegrityViolation { .. })
    ));

    assert_eq!(engine.criteria_for_rule(rule), criteria);
    assert_eq!(engine.responses_for_rule(rule), responses);
    assert_eq!(engine.rules_for_event("greet"), vec![rule]);
    assert!(engine.determine_response(1, "greet").unwrap().is_some());
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn concurrent_firing_loses_no_updates() {
    const THREADS: usize = 8;
    const FIRES: usize = 50;

    let (engine, counter) = setup(3);
    for user in 2..=THREADS as u64 {
        engine.add_user(user).unwrap();
    }
    let rules: Vec<RuleId> = (0..3)
        .map(|i| add_rule(&engine, "tick", Rule::new("tick", format!("rule {i}"))))
        .collect();

    let latest: Vec<i64> = std::thread::scope(|scope| {
        let handles: Vec<_> = (1..=THREADS as u64)
            .map(|user| {
                let (engine, rules) = (&engine, &rules);
                scope.spawn(move || {
                    let mut last = 0;
                    for i in 0..FIRES {
                        let decision = engine.determine_response(user, "tick").unwrap().unwrap();
                        assert!(rules.contains(&decision.rule_id));
                        if i % 10 == 0 {
                            engine.set_value(user, "hp", &i.to_string()).unwrap();
                        }
                        last = last.max(decision.used_at);
                    }
                    last
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(counter.hits.load(Ordering::SeqCst), THREADS * FIRES);
    let newest_rule = rules
        .iter()
        .map(|id| engine.rule(*id).unwrap().last_used_time)
        .max()
        .unwrap();
    assert_eq!(newest_rule, latest.into_iter().max().unwrap());
    assert!(rules
        .iter()
        .all(|id| engine.rule(*id).unwrap().last_used_time > 0));
}

#[test]
fn concurrent_firing_respects_each_users_criteria() {
    const THREADS: u64 = 6;
    const FIRES: usize = 60;
    const HP: [i64; 7] = [10, 65, 95, 49, 50, 80, 79];

    let (engine, _) = setup(11);
    for user in 2..=THREADS {
        engine.add_user(user).unwrap();
    }

    // Both criteria are shared: `50 > hp` and `80 <= hp`.
    let past = now_millis() - 60_000;
    let wounded = engine.add_criterion(
        Criterion::new("hp", ComparisonType::GreaterThan, ValueType::Integer, "50", 1.0).unwrap(),
    );
    let healthy = engine.add_criterion(
        Criterion::new("hp", ComparisonType::LessOrEqual, ValueType::Integer, "80", 1.0).unwrap(),
    );
    let low = add_rule(&engine, "strike", Rule::with_last_used_time("strike", "low", past));
    engine.bind_rule_criterion(low, wounded).unwrap();
    let high = add_rule(&engine, "strike", Rule::with_last_used_time("strike", "high", past));
    engine.bind_rule_criterion(high, healthy).unwrap();
    let either = add_rule(&engine, "strike", Rule::with_last_used_time("strike", "either", past));
    engine.bind_rule_criterion(either, wounded).unwrap();
    engine.bind_rule_criterion(either, healthy).unwrap();
    let steady = add_rule(&engine, "strike", Rule::with_last_used_time("strike", "steady", past));
    let rules = [low, high, either, steady];

    let score = |rule: RuleId, hp: i64| -> f64 {
        let (w, h) = (50 > hp, 80 <= hp);
        match rule {
            r if r == low => f64::from(u8::from(w)),
            r if r == high => f64::from(u8::from(h)),
            r if r == either => f64::from(u8::from(w) + u8::from(h)) / 2.0,
            _ => 0.0,
        }
    };

    std::thread::scope(|scope| {
        for user in 1..=THREADS {
            let (engine, rules, score) = (&engine, &rules, &score);
            scope.spawn(move || {
                let mut seen = [0i64; 4];
                for i in 0..FIRES {
                    let hp = HP[(user as usize + i) % HP.len()];
                    engine.set_value(user, "hp", &hp.to_string()).unwrap();
                    let decision = engine.determine_response(user, "strike").unwrap().unwrap();

                    match decision.tier {
                        Tier::Weighted => {
                            assert_ne!(decision.rule_id, steady);
                            assert!(
                                score(decision.rule_id, hp) > 0.0,
                                "user {user} with hp {hp} got a rule with no true criteria"
                            );
                        }
                        Tier::Fallback => {
                            assert_eq!(decision.rule_id, steady);
                            assert!(rules.iter().all(|r| score(*r, hp) == 0.0));
                        }
                        other => panic!("unexpected tier {other}"),
                    }

                    for (slot, id) in seen.iter_mut().zip(rules.iter()) {
                        let used = engine.rule(*id).unwrap().last_used_time;
                        assert!(used >= *slot, "last-used time of {id} went backwards");
                        *slot = used;
                    }
                    assert!(seen.iter().max().copied().unwrap_or(0) >= decision.used_at);
                }
            });
        }
    });
}
