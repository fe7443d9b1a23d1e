//! Payloads exchanged between the HTTP server and its clients.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::request::{
	Emotion, Genre, GenerationRequest, Kind, PoemStyle, Rhyme, ToneParams, WritingStyle,
};

/// Body of `POST /v1/story`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct StoryBody {
	pub keywords: String,
	#[serde(default)]
	pub genre: Genre,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub writing_style: Option<WritingStyle>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub character: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub max_length: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub temperature: Option<f32>,
}

impl StoryBody {
	/// Validates the body into a request; unset numbers keep their defaults.
	///
	/// # Errors
	/// Returns `Error::InvalidTemperature` or `Error::InvalidMaxLength`.
	pub fn into_request(self) -> Result<GenerationRequest> {
		let mut request = GenerationRequest::story(self.keywords, self.genre);
		request.tone = ToneParams {
			writing_style: self.writing_style,
			character: self.character,
			..ToneParams::default()
		};
		apply_numbers(&mut request, self.max_length, self.temperature)?;
		Ok(request)
	}
}

/// Body of `POST /v1/poem`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct PoemBody {
	pub keywords: String,
	#[serde(default)]
	pub style: PoemStyle,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub rhyme: Option<Rhyme>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub emotion: Option<Emotion>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub max_length: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub temperature: Option<f32>,
}

impl PoemBody {
	/// Validates the body into a request; unset numbers keep their defaults.
	///
	/// # Errors
	/// Returns `Error::InvalidTemperature` or `Error::InvalidMaxLength`.
	pub fn into_request(self) -> Result<GenerationRequest> {
		let mut request = GenerationRequest::poem(self.keywords, self.style);
		request.tone = ToneParams {
			rhyme: self.rhyme,
			emotion: self.emotion,
			..ToneParams::default()
		};
		apply_numbers(&mut request, self.max_length, self.temperature)?;
		Ok(request)
	}
}

fn apply_numbers(request: &mut GenerationRequest, max_length: Option<u32>, temperature: Option<f32>) -> Result<()> {
	if let Some(max_length) = max_length {
		request.set_max_length(max_length)?;
	}
	if let Some(temperature) = temperature {
		request.set_temperature(temperature)?;
	}
	Ok(())
}

/// Answer of the generation endpoints.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GenerationReply {
	pub content: String,
	pub kind: Kind,
}

/// Body of `POST /v1/favorites`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FavoriteBody {
	pub content: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub kind: Option<Kind>,
}
