use thiserror::Error;

/// Errors raised by the core library.
///
/// Front-ends rarely see these directly: the generation service turns them
/// into result text and the store logs and swallows persistence failures.
#[derive(Debug, Error)]
pub enum Error {
	/// Keywords contain Latin letters; only the Chinese script is supported.
	#[error("keywords contain Latin characters: {0}")]
	MixedScript(String),

	#[error("temperature must be between 0.1 and 1.0, got {0}")]
	InvalidTemperature(f32),

	#[error("max length must be greater than 0")]
	InvalidMaxLength,

	/// Nothing to save or export.
	#[error("content is empty")]
	EmptyContent,

	#[error("model request failed: {0}")]
	Http(#[from] reqwest::Error),

	#[error("model returned no sequence")]
	EmptyResponse,

	#[error("json error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("io error: {0}")]
	Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
