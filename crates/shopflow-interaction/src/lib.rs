//! Shopflow capability implementations.
//!
//! Everything here sits behind a trait defined in `shopflow-core`: the
//! deterministic template phraser, the regex vehicle extractor with its
//! in-memory VIN decoder, and the keyword safety-rule tables. The core
//! never depends on this crate; wiring happens in the application layer.

pub mod safety_rules;
pub mod template_phraser;
pub mod vehicle_extractor;

pub use safety_rules::KeywordSafetyRules;
pub use template_phraser::TemplatePhraser;
pub use vehicle_extractor::{MemoryVinDecoder, RegexVehicleExtractor};
