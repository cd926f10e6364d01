//! Business-logic services sitting between HTTP handlers and storage.

mod generation;

pub use generation::{GenerateInput, GenerationService, GenerationStatusSummary};
