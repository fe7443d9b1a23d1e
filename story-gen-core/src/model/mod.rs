//! Top-level module for the story/poem generation system.
//!
//! This module provides the whole keyword-to-text pipeline:
//! - Generation requests and their closed option sets (`request`)
//! - Prompt templates, one per genre/style variant (`prompt`)
//! - Output clean-up (`sanitizer`)
//! - The model boundary and startup model selection (`backend`)
//! - A high-level generation interface (`generator`)

/// Generation request, mode, genres, styles and tone parameters.
///
/// Validates temperature and token budget on assignment.
pub mod request;

/// Prompt builder.
///
/// Maps keywords, mode and tone parameters to the instruction sent to the model.
pub mod prompt;

/// Pure post-processing of raw model output.
pub mod sanitizer;

/// Text-generation backends.
///
/// Defines the `TextGenerator` seam, the sampling parameter profiles,
/// the HTTP backend and the one-shot model initialization.
pub mod backend;

/// High-level generation service.
///
/// Never fails: rejections and backend errors come back as result text.
pub mod generator;
