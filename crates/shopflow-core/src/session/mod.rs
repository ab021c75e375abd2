//! Session domain module.
//!
//! - `model`: the per-conversation session record (`DiagnosticSession`)
//! - `repository`: persistence trait (`SessionRepository`)
//! - `manager`: per-conversation lifecycle and locking (`SessionManager`)

mod manager;
mod model;
mod repository;

pub use manager::SessionManager;
pub use model::{DiagnosticSession, SessionMode};
pub use repository::SessionRepository;
