use clap::{Parser, Subcommand};

/// Drive the dialog engine against a built-in scenario.
///
/// The scenario is a small tavern: a keeper greets, reacts to the player's
/// health and mood, and rotates idle chatter.
#[derive(Parser, Debug)]
#[command(name = "dds", about = "Rule-driven dialog selection demo")]
pub struct CliArgs {
    /// Seed for tie-breaks (overrides DDS_RNG_SEED)
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Print the active engine configuration before running
    #[arg(long, global = true)]
    pub show_config: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play the scripted walkthrough, printing every line spoken.
    Demo,

    /// Fire one event for a user after applying context overrides.
    Fire {
        /// Event name, e.g. greet, hit, idle
        event: String,

        /// Context overrides as name=value (repeatable)
        #[arg(long = "set", value_name = "NAME=VALUE")]
        overrides: Vec<String>,

        /// Print the decision as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Fire an event many times from several users and tally the winners.
    Simulate {
        /// Event name to fire
        #[arg(long, default_value = "idle")]
        event: String,

        /// Number of concurrent users
        #[arg(long, default_value = "4")]
        users: u64,

        /// Fires per user
        #[arg(long, default_value = "25")]
        fires: usize,
    },
}

/// Split a `name=value` override.
pub fn parse_override(raw: &str) -> Option<(&str, &str)> {
    let (name, value) = raw.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name, value.trim()))
}
