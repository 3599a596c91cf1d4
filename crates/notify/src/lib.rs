//! Response delivery for the dynamic dialog engine.
//!
//! This crate provides:
//! - `Notifiable` trait implemented by external response handlers
//! - `Delivery` handle describing the decision a response came from
//! - `Publisher` that fans responses out to subscribers by response type

pub mod publisher;
pub mod traits;

pub use publisher::Publisher;
pub use traits::{Delivery, DeliveryResult, Notifiable, NotifyError};
