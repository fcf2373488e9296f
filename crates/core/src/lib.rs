//! Session-metadata generation for an interactive tutoring service.
//!
//! Given the latest turn of a tutoring conversation, this crate decides which
//! auxiliary artifacts the turn needs (quiz batch, coding challenge,
//! follow-up suggestions, progress update), generates exactly those through
//! structured prompts against an injected [`backend::GenerationBackend`], and
//! merges them into one validated [`artifacts::MetadataEnvelope`]. The
//! onboarding stage ([`onboarding::TopicGenerator`]) and the code evaluators
//! ([`evaluator`]) share the same prompt-out / validated-JSON-in contract.

pub mod artifacts;
pub mod backend;
pub mod classifier;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod generators;
pub mod onboarding;
pub mod parse;
pub mod pipeline;
pub mod prompts;
pub mod quiz_run;
pub mod signals;
pub mod turn;

pub use pipeline::{MetadataPipeline, PipelineOptions};
