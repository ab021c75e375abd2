//! Shopflow core: the stateful control logic of the diagnostic dialogue
//! controller.
//!
//! This crate owns fact locking, anti-redundancy gating, domain locking,
//! the deterministic misfire path, overlay injection, and tier escalation.
//! Everything conversational-I/O shaped (phrasing, vehicle extraction,
//! safety lookup) is a capability trait implemented elsewhere.

pub mod answer;
pub mod code;
pub mod directive;
pub mod domain;
pub mod error;
pub mod facts;
pub mod gate;
pub mod overlay;
pub mod path;
pub mod phrasing;
pub mod safety;
pub mod session;
pub mod template;
pub mod tier;
pub mod vehicle;

// Re-export the shared error type.
pub use error::{Result, ShopflowError};
