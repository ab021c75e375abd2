//! Shopflow application layer.
//!
//! Wires the core turn pipeline to concrete capabilities and storage: the
//! `TurnUseCase` drives one conversation turn end to end, `ControllerConfig`
//! carries its tunables, and `MemorySessionRepository` is the default
//! storage backend.

pub mod config;
pub mod memory_repository;
pub mod turn;

pub use config::ControllerConfig;
pub use memory_repository::MemorySessionRepository;
pub use turn::{TurnRequest, TurnResponse, TurnUseCase};
