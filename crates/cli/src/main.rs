mod cli;
mod scenario;

use anyhow::{bail, Context, Result};
use clap::Parser;
use indexmap::IndexMap;
use tracing::info;

use dds_core::{EngineConfig, UserState};
use dds_rules::Decision;

use crate::cli::{parse_override, CliArgs, Command};
use crate::scenario::{Scenario, PLAYER};

/// Walkthrough steps: context overrides, then the event to fire.
const SCRIPT: &[(&[(&str, &str)], &str)] = &[
    (&[], "greet"),
    (&[], "greet"),
    (&[], "idle"),
    (&[], "idle"),
    (&[("mood", "angry")], "hit"),
    (&[("hp", "12")], "hit"),
    (&[], "idle"),
    (&[("gold", "250")], "greet"),
];

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    dds_core::config::load_dotenv();
    let args = CliArgs::parse();

    let mut config = EngineConfig::from_env();
    if args.seed.is_some() {
        config.rng_seed = args.seed;
    }
    if args.show_config {
        config.log_summary();
    }

    let scenario = Scenario::build(config).context("failed to build the tavern scenario")?;

    match args.command {
        Command::Demo => demo(&scenario),
        Command::Fire {
            event,
            overrides,
            json,
        } => {
            for raw in &overrides {
                let Some((name, value)) = parse_override(raw) else {
                    bail!("override '{raw}' is not of the form NAME=VALUE");
                };
                apply(&scenario, name, value)?;
            }
            let decision = scenario
                .engine
                .determine_response(PLAYER, &event)
                .with_context(|| format!("failed to handle event '{event}'"))?;
            if json {
                let body = decision_json(&scenario, &event, decision.as_ref());
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                print_decision(&scenario, &event, decision.as_ref());
            }
            Ok(())
        }
        Command::Simulate {
            event,
            users,
            fires,
        } => simulate(&scenario, &event, users, fires),
    }
}

fn apply(scenario: &Scenario, name: &str, value: &str) -> Result<()> {
    scenario
        .engine
        .set_value(PLAYER, name, value)
        .with_context(|| format!("failed to set {name}={value}"))
}

fn demo(scenario: &Scenario) -> Result<()> {
    for (overrides, event) in SCRIPT {
        for (name, value) in *overrides {
            println!("  * {name} = {value}");
            apply(scenario, name, value)?;
        }
        let decision = scenario
            .engine
            .determine_response(PLAYER, event)
            .with_context(|| format!("failed to handle event '{event}'"))?;
        print_decision(scenario, event, decision.as_ref());
    }
    Ok(())
}

fn rule_name(scenario: &Scenario, decision: &Decision) -> String {
    scenario
        .engine
        .rule(decision.rule_id)
        .map(|r| r.description)
        .unwrap_or_else(|| decision.rule_id.to_string())
}

fn print_decision(scenario: &Scenario, event: &str, decision: Option<&Decision>) {
    let Some(decision) = decision else {
        println!("[{event}] (silence)");
        return;
    };
    println!("[{event}] {} via {}", rule_name(scenario, decision), decision.tier);
    for line in scenario.speaker.drain() {
        println!("    \"{line}\"");
    }
    for failure in &decision.failures {
        println!("    ! skipped rule {}: {}", failure.rule_id, failure.error);
    }
}

fn decision_json(
    scenario: &Scenario,
    event: &str,
    decision: Option<&Decision>,
) -> serde_json::Value {
    scenario.speaker.drain();
    match decision {
        None => serde_json::json!({ "event": event, "selected": null }),
        Some(d) => serde_json::json!({
            "event": event,
            "selected": {
                "rule_id": d.rule_id,
                "rule": rule_name(scenario, d),
                "tier": d.tier,
                "used_at": d.used_at,
            },
            "responses": d.responses,
            "deliveries": d.deliveries,
            "failures": d.failures.iter().map(|f| serde_json::json!({
                "rule_id": f.rule_id,
                "error": f.error.to_string(),
            })).collect::<Vec<_>>(),
        }),
    }
}

fn simulate(scenario: &Scenario, event: &str, users: u64, fires: usize) -> Result<()> {
    let users = users.max(1);
    for user in (PLAYER + 1)..(PLAYER + users) {
        scenario.engine.add_user(user)?;
    }

    let outcomes: Vec<Vec<Option<Decision>>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (PLAYER..PLAYER + users)
            .map(|user| {
                scope.spawn(move || {
                    (0..fires)
                        .map(|_| scenario.engine.determine_response(user, event))
                        .collect::<dds_core::Result<Vec<_>>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("simulation thread panicked"))
            .collect::<dds_core::Result<Vec<_>>>()
    })
    .with_context(|| format!("simulation of '{event}' failed"))?;
    scenario.speaker.drain();

    let mut tally: IndexMap<String, usize> = IndexMap::new();
    let mut silent = 0usize;
    for decision in outcomes.iter().flatten() {
        match decision {
            Some(d) => *tally.entry(rule_name(scenario, d)).or_default() += 1,
            None => silent += 1,
        }
    }
    tally.sort_by(|_, a, _, b| b.cmp(a));

    info!(event, users, fires, "simulation finished");
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "event": event,
            "users": users,
            "fires_per_user": fires,
            "winners": tally,
            "silent": silent,
        }))?
    );
    Ok(())
}
