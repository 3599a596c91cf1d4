//! The built-in tavern scenario the CLI drives.

use std::sync::{Arc, Mutex};

use dds_core::{Context, EngineConfig, Response, Result, RuleId, UserId, ValueType};
use dds_notify::{Delivery, Notifiable, NotifyError};
use dds_rules::{ComparisonType, Criterion, Engine, Rule};
use tracing::debug;

pub const PLAYER: UserId = 1;

/// Collects every spoken line, in delivery order.
#[derive(Default)]
pub struct Speaker {
    lines: Mutex<Vec<String>>,
}

impl Speaker {
    /// Take the lines spoken since the last drain.
    pub fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock().expect("speaker lock poisoned"))
    }
}

impl Notifiable for Speaker {
    fn handle_response(
        &self,
        delivery: &Delivery<'_>,
        response: &Response,
    ) -> std::result::Result<(), NotifyError> {
        debug!(user_id = delivery.user_id, line = %response.value, "speaking");
        self.lines
            .lock()
            .expect("speaker lock poisoned")
            .push(response.value.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "speaker"
    }
}

/// Applies `mood` responses to the listening user's state.
struct MoodShift;

impl Notifiable for MoodShift {
    fn handle_response(
        &self,
        delivery: &Delivery<'_>,
        response: &Response,
    ) -> std::result::Result<(), NotifyError> {
        delivery
            .state
            .set_value(delivery.user_id, "mood", &response.value)?;
        Ok(())
    }

    fn name(&self) -> &str {
        "mood-shift"
    }
}

pub struct Scenario {
    pub engine: Engine,
    pub speaker: Arc<Speaker>,
}

struct Line<'a> {
    event: &'a str,
    description: &'a str,
    /// `(context, operator, literal, weight)`, read as `literal <op> context`.
    criteria: &'a [(&'a str, ComparisonType, &'a str, f64)],
    responses: &'a [(&'a str, &'a str)],
}

const LINES: &[Line<'static>] = &[
    Line {
        event: "greet",
        description: "first greeting",
        criteria: &[],
        responses: &[
            ("text", "Welcome, stranger! First time in the Crooked Flagon?"),
            ("mood", "friendly"),
        ],
    },
    Line {
        event: "greet",
        description: "friendly regular",
        criteria: &[("mood", ComparisonType::EqualTo, "friendly", 1.0)],
        responses: &[("text", "Good to see you again, friend.")],
    },
    Line {
        event: "greet",
        description: "rich customer",
        criteria: &[
            ("gold", ComparisonType::LessOrEqual, "100", 0.8),
            ("mood", ComparisonType::EqualTo, "friendly", 0.2),
        ],
        responses: &[("text", "Something fine for a fine patron?")],
    },
    Line {
        event: "hit",
        description: "wounded",
        criteria: &[("hp", ComparisonType::GreaterThan, "30", 1.0)],
        responses: &[
            ("text", "You look terrible. Sit down before you fall down."),
            ("mood", "calm"),
        ],
    },
    Line {
        event: "hit",
        description: "brawl",
        criteria: &[
            ("mood", ComparisonType::EqualTo, "angry", 0.6),
            ("hp", ComparisonType::LessOrEqual, "30", 0.4),
        ],
        responses: &[("text", "Take it outside!")],
    },
    Line {
        event: "hit",
        description: "shrug",
        criteria: &[],
        responses: &[("text", "Watch it.")],
    },
    Line {
        event: "idle",
        description: "fireside",
        criteria: &[],
        responses: &[("text", "The fire's warm tonight.")],
    },
    Line {
        event: "idle",
        description: "rumors",
        criteria: &[],
        responses: &[("text", "Heard rumors from the north. Nothing good.")],
    },
    Line {
        event: "idle",
        description: "ale",
        criteria: &[],
        responses: &[("text", "More ale?")],
    },
];

impl Scenario {
    /// Build the engine with the tavern contexts, rules and sinks, and one player.
    pub fn build(config: EngineConfig) -> Result<Self> {
        let engine = Engine::new(config);

        let speaker = Arc::new(Speaker::default());
        engine.subscribe("text", speaker.clone());
        engine.subscribe("mood", Arc::new(MoodShift));

        for context in [
            Context::new("hp", ValueType::Integer, "100"),
            Context::new("gold", ValueType::Integer, "10"),
            Context::new("mood", ValueType::String, "neutral"),
        ] {
            engine.add_context(context);
        }

        for line in LINES {
            add_line(&engine, line)?;
        }
        engine.add_user(PLAYER)?;

        Ok(Self { engine, speaker })
    }
}

fn add_line(engine: &Engine, line: &Line<'_>) -> Result<RuleId> {
    let rule = engine.add_rule(Rule::new(line.event, line.description));
    engine.bind_event_rule(line.event, rule)?;
    for (context, op, literal, weight) in line.criteria {
        let value_type = match *context {
            "mood" => ValueType::String,
            _ => ValueType::Integer,
        };
        let criterion =
            engine.add_criterion(Criterion::new(*context, *op, value_type, *literal, *weight)?);
        engine.bind_rule_criterion(rule, criterion)?;
    }
    for (response_type, value) in line.responses {
        let response = engine.add_response(Response::new(*response_type, *value));
        engine.bind_rule_response(rule, response)?;
    }
    Ok(rule)
}
