//! Keyword-driven story and poem generation library.
//!
//! This crate provides everything behind the story/poem front-ends:
//! - Prompt construction from keywords, genre/style and tone parameters
//! - Post-processing (sanitizing) of raw model output
//! - A generation service wrapping a remote text-generation model
//! - JSON-backed history and favorites
//! - Plain-text export and configuration loading
//!
//! Only the high-level API is exposed publicly. Low-level helpers
//! are kept internal to ensure consistency and prevent misuse.

/// Generation requests, prompts, sanitizer, model backends and the generation service.
pub mod model;

/// History and favorites persistence.
pub mod store;

/// Request and reply bodies of the HTTP API.
pub mod api;

/// Export of a result to a timestamped text file.
pub mod export;

/// Application configuration (`config.json`).
pub mod config;

/// Error type shared by the whole crate.
pub mod error;

/// I/O utilities (file loading, path helpers).
///
/// Not exposed
pub(crate) mod io;

pub use error::{Error, Result};
