//! Pure domain logic for the decora generation platform.
//!
//! No I/O lives here. The orchestration service in `decora-api` composes
//! these pieces with the persistence layer (`decora-db`) and the provider
//! client (`decora-genai`).

pub mod billing;
pub mod credits;
pub mod error;
pub mod kv;
pub mod prompt;
pub mod types;
