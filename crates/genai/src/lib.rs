//! Client wrapper for the multimodal image-generation provider.
//!
//! [`client::GeminiClient`] wraps the provider's `generateContent`-style
//! REST call with a hard deadline, tagged safety-rejection handling, and a
//! narrow retry policy. Response bodies are classified into
//! [`outcome::GenerateOutcome`] so retry decisions dispatch on a tag, never
//! on error-message text.

pub mod client;
pub mod outcome;

pub use client::{GeminiClient, GenAiConfig, GenAiError, ImageGenerator};
pub use outcome::{GeneratedImage, GenerateOutcome};
