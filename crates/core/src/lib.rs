//! Shared types for the dynamic dialog engine.
//!
//! This crate provides:
//! - Typed context values (`ValueType`, `Value`) and the `Context` record
//! - The `Response` payload delivered to subscribers
//! - A splay-tree backed per-user `ContextStore`
//! - The `UserState` interface handed to response handlers
//! - Engine configuration and the shared error type

pub mod config;
pub mod context;
pub mod entity;
pub mod error;
pub mod response;
pub mod state;
pub mod store;
pub mod user;
pub mod value;

pub use config::EngineConfig;
pub use context::Context;
pub use entity::*;
pub use error::*;
pub use response::Response;
pub use state::UserState;
pub use store::ContextStore;
pub use user::User;
pub use value::{Value, ValueType};
