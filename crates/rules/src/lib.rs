//! Rule-driven response selection.
//!
//! This crate provides:
//! - Typed, weighted `Criterion` comparisons over user contexts
//! - `Rule`s with monotonic last-used times
//! - Event → rule → criterion/response bindings (`AssociationIndex`)
//! - Tiered selection with recency weighting and random tie-breaks
//! - The `Engine` tying it together with users, contexts and delivery

pub mod criterion;
pub mod engine;
pub mod index;
pub mod recency;
pub mod rule;
pub mod selection;

pub use criterion::{ComparisonType, Criterion};
pub use engine::{Decision, Engine, RefreshFailure};
pub use index::AssociationIndex;
pub use recency::{EntityKey, RecencyLedger};
pub use rule::{Rule, RuleSnapshot};
pub use selection::{Blend, Candidate, Selection, Tier};
