use std::time::Duration;

use log::{info, warn};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::config::ModelConfig;
use crate::error::{Error, Result};

use super::request::{GenerationRequest, Mode};

/// A text-generation capability.
///
/// One blocking call per prompt, exactly one sequence returned.
/// Implementations return the raw generated text (the prompt may be echoed).
pub trait TextGenerator: Send + Sync {
	fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String>;

	/// Name of the model behind this generator.
	fn model_name(&self) -> &str;
}

/// Sampling parameters sent with a prompt.
///
/// Serialized as the `parameters` object of the inference request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationParams {
	pub max_new_tokens: u32,
	pub temperature: f32,
	pub top_p: f32,
	pub repetition_penalty: f32,
	pub no_repeat_ngram_size: u32,
	pub do_sample: bool,
	pub truncation: bool,
	pub num_return_sequences: u32,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub pad_token_id: Option<u32>,
}

impl GenerationParams {
	/// Story profile: mild repetition penalty, 2-gram window.
	pub fn story(max_new_tokens: u32, temperature: f32) -> Self {
		Self {
			max_new_tokens,
			temperature,
			top_p: 0.9,
			repetition_penalty: 1.1,
			no_repeat_ngram_size: 2,
			do_sample: true,
			truncation: true,
			num_return_sequences: 1,
			pad_token_id: None,
		}
	}

	/// Poem profile: poetry is more sensitive to repeated phrasing,
	/// hence the stronger penalty and the 3-gram window.
	pub fn poem(max_new_tokens: u32, temperature: f32) -> Self {
		Self {
			top_p: 0.95,
			repetition_penalty: 1.3,
			no_repeat_ngram_size: 3,
			..Self::story(max_new_tokens, temperature)
		}
	}

	pub fn for_request(request: &GenerationRequest) -> Self {
		match request.mode {
			Mode::Story(_) => Self::story(request.max_length(), request.temperature()),
			Mode::Poem(_) => Self::poem(request.max_length(), request.temperature()),
		}
	}
}

#[derive(Serialize)]
struct InferenceRequest<'a> {
	inputs: &'a str,
	parameters: &'a GenerationParams,
}

#[derive(Deserialize)]
struct GeneratedSequence {
	generated_text: String,
}

/// Servers answer either a list of sequences or a single one.
#[derive(Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
	Many(Vec<GeneratedSequence>),
	One(GeneratedSequence),
}

/// Extracts the first generated sequence from an inference response body.
fn parse_response(body: &str) -> Result<String> {
	match serde_json::from_str::<InferenceResponse>(body)? {
		InferenceResponse::One(sequence) => Ok(sequence.generated_text),
		InferenceResponse::Many(sequences) => sequences
			.into_iter()
			.next()
			.map(|s| s.generated_text)
			.ok_or(Error::EmptyResponse),
	}
}

/// Generator backed by a remote inference endpoint.
///
/// Speaks the Hugging Face inference wire format:
/// `POST {endpoint}/models/{model}` with `{"inputs": ..., "parameters": {...}}`,
/// answered by `[{"generated_text": ...}]`.
#[derive(Debug, Clone)]
pub struct HttpGenerator {
	client: Client,
	url: String,
	model: String,
	pad_token_id: Option<u32>,
	probe_timeout: Duration,
}

impl HttpGenerator {
	pub fn new(client: Client, endpoint: &str, model: &str) -> Self {
		Self {
			client,
			url: format!("{}/models/{}", endpoint.trim_end_matches('/'), model),
			model: model.to_owned(),
			pad_token_id: None,
			probe_timeout: Duration::from_secs(10),
		}
	}

	/// Padding token sent when a request does not set one.
	pub fn with_pad_token_id(mut self, pad_token_id: Option<u32>) -> Self {
		self.pad_token_id = pad_token_id;
		self
	}

	pub fn with_probe_timeout(mut self, probe_timeout: Duration) -> Self {
		self.probe_timeout = probe_timeout;
		self
	}

	pub fn url(&self) -> &str {
		&self.url
	}

	/// Checks that the endpoint serves the model.
	///
	/// # Errors
	/// Returns `Error::Http` on connection failure or non-success status.
	pub fn probe(&self) -> Result<()> {
		self.client
			.get(&self.url)
			.timeout(self.probe_timeout)
			.send()?
			.error_for_status()?;
		Ok(())
	}
}

impl TextGenerator for HttpGenerator {
	fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
		let mut parameters = params.clone();
		if parameters.pad_token_id.is_none() {
			parameters.pad_token_id = self.pad_token_id;
		}

		let body = self
			.client
			.post(&self.url)
			.json(&InferenceRequest { inputs: prompt, parameters: &parameters })
			.send()?
			.error_for_status()?
			.text()?;

		parse_response(&body)
	}

	fn model_name(&self) -> &str {
		&self.model
	}
}

/// Where the primary model was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSource {
	Primary,
	Mirror,
}

/// Outcome of the one-shot model initialization, decided at startup.
#[derive(Debug)]
pub enum ModelInit<G> {
	/// The configured model answered on the primary endpoint or its mirror.
	Loaded { generator: G, source: ModelSource },
	/// Neither answered; the generic fallback model is used.
	Fallback { generator: G, reason: String },
}

/// Serializable summary of a `ModelInit`, reported to front-ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ModelStatus {
	Loaded { model: String, source: ModelSource },
	Fallback { model: String, reason: String },
}

impl<G: TextGenerator> ModelInit<G> {
	/// Tries each candidate in order with `probe`, falling back to `fallback`.
	///
	/// The fallback is not probed: it is used as-is and the collected probe
	/// errors become the fallback reason.
	pub fn select<P>(candidates: Vec<(ModelSource, G)>, fallback: G, probe: P) -> Self
	where
		P: Fn(&G) -> Result<()>,
	{
		let mut failures = Vec::new();
		for (source, generator) in candidates {
			match probe(&generator) {
				Ok(()) => {
					info!("model '{}' loaded from {:?} endpoint", generator.model_name(), source);
					return ModelInit::Loaded { generator, source };
				}
				Err(e) => {
					warn!("model '{}' unavailable on {:?} endpoint: {e}", generator.model_name(), source);
					failures.push(format!("{source:?}: {e}"));
				}
			}
		}

		let reason = if failures.is_empty() {
			"no model endpoint configured".to_owned()
		} else {
			failures.join("; ")
		};
		warn!("falling back to model '{}' ({reason})", fallback.model_name());
		ModelInit::Fallback { generator: fallback, reason }
	}

	pub fn status(&self) -> ModelStatus {
		match self {
			ModelInit::Loaded { generator, source } => ModelStatus::Loaded {
				model: generator.model_name().to_owned(),
				source: *source,
			},
			ModelInit::Fallback { generator, reason } => ModelStatus::Fallback {
				model: generator.model_name().to_owned(),
				reason: reason.clone(),
			},
		}
	}

	pub fn into_generator(self) -> G {
		match self {
			ModelInit::Loaded { generator, .. } | ModelInit::Fallback { generator, .. } => generator,
		}
	}
}

impl ModelInit<HttpGenerator> {
	/// Loads the configured model: primary endpoint, then mirror, then the
	/// fallback model on the primary endpoint.
	///
	/// # Errors
	/// Only fails if the HTTP client cannot be built; unreachable endpoints
	/// lead to `ModelInit::Fallback`.
	pub fn load(config: &ModelConfig) -> Result<Self> {
		let client = Client::builder().timeout(config.request_timeout()).build()?;
		let make = |endpoint: &str, model: &str| {
			HttpGenerator::new(client.clone(), endpoint, model)
				.with_pad_token_id(config.pad_token_id)
				.with_probe_timeout(config.probe_timeout())
		};

		let mut candidates = vec![(ModelSource::Primary, make(&config.endpoint, &config.model))];
		if let Some(mirror) = config.mirror_endpoint.as_deref().filter(|m| !m.trim().is_empty()) {
			candidates.push((ModelSource::Mirror, make(mirror, &config.model)));
		}
		let fallback = make(&config.endpoint, &config.fallback_model);

		Ok(Self::select(candidates, fallback, HttpGenerator::probe))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::request::{Genre, PoemStyle};

	struct Named(&'static str);

	impl TextGenerator for Named {
		fn generate(&self, _: &str, _: &GenerationParams) -> Result<String> {
			Ok(String::new())
		}

		fn model_name(&self) -> &str {
			self.0
		}
	}

	#[test]
	fn profiles_differ_by_mode() {
		let story = GenerationParams::for_request(&GenerationRequest::story("龙", Genre::Fantasy));
		assert_eq!(story.top_p, 0.9);
		assert_eq!(story.repetition_penalty, 1.1);
		assert_eq!(story.no_repeat_ngram_size, 2);

		let poem = GenerationParams::for_request(&GenerationRequest::poem("月", PoemStyle::Modern));
		assert_eq!(poem.top_p, 0.95);
		assert_eq!(poem.repetition_penalty, 1.3);
		assert_eq!(poem.no_repeat_ngram_size, 3);

		for params in [story, poem] {
			assert!(params.do_sample);
			assert!(params.truncation);
			assert_eq!(params.num_return_sequences, 1);
		}
	}

	#[test]
	fn params_serialize_to_wire_names() {
		let params = GenerationParams::story(120, 0.5);
		let value = serde_json::to_value(InferenceRequest { inputs: "提示", parameters: &params }).unwrap();
		assert_eq!(value["inputs"], "提示");
		assert_eq!(value["parameters"]["max_new_tokens"], 120);
		assert_eq!(value["parameters"]["no_repeat_ngram_size"], 2);
		assert_eq!(value["parameters"]["do_sample"], true);
		assert!(value["parameters"].get("pad_token_id").is_none());

		let with_pad = GenerationParams { pad_token_id: Some(0), ..params };
		let value = serde_json::to_value(&with_pad).unwrap();
		assert_eq!(value["pad_token_id"], 0);
	}

	#[test]
	fn responses_are_parsed() {
		assert_eq!(parse_response(r#"[{"generated_text":"从前"}]"#).unwrap(), "从前");
		assert_eq!(parse_response(r#"{"generated_text":"从前"}"#).unwrap(), "从前");
		assert!(matches!(parse_response("[]"), Err(Error::EmptyResponse)));
		assert!(matches!(parse_response("not json"), Err(Error::Json(_))));
	}

	#[test]
	fn model_url_is_built_from_endpoint() {
		let generator = HttpGenerator::new(Client::new(), "http://localhost:8080/", "uer/gpt2");
		assert_eq!(generator.url(), "http://localhost:8080/models/uer/gpt2");
		assert_eq!(generator.model_name(), "uer/gpt2");
	}

	#[test]
	fn first_answering_candidate_is_loaded() {
		let init = ModelInit::select(
			vec![(ModelSource::Primary, Named("down")), (ModelSource::Mirror, Named("up"))],
			Named("gpt2"),
			|g| if g.0 == "up" { Ok(()) } else { Err(Error::EmptyResponse) },
		);
		assert_eq!(init.status(), ModelStatus::Loaded { model: "up".to_owned(), source: ModelSource::Mirror });
		assert_eq!(init.into_generator().0, "up");
	}

	#[test]
	fn fallback_carries_the_reasons() {
		let init = ModelInit::select(
			vec![(ModelSource::Primary, Named("a")), (ModelSource::Mirror, Named("b"))],
			Named("gpt2"),
			|_| Err(Error::EmptyResponse),
		);
		match init.status() {
			ModelStatus::Fallback { model, reason } => {
				assert_eq!(model, "gpt2");
				assert!(reason.contains("Primary"));
				assert!(reason.contains("Mirror"));
			}
			other => panic!("unexpected status {other:?}"),
		}
	}

	#[test]
	fn fallback_is_not_probed() {
		let init = ModelInit::select(Vec::new(), Named("gpt2"), |_| panic!("probed"));
		assert!(matches!(init, ModelInit::Fallback { .. }));
	}

	#[test]
	fn status_round_trips_through_json() {
		let status = ModelStatus::Fallback { model: "gpt2".to_owned(), reason: "down".to_owned() };
		let json = serde_json::to_string(&status).unwrap();
		assert!(json.contains(r#""state":"fallback""#));
		assert_eq!(serde_json::from_str::<ModelStatus>(&json).unwrap(), status);
	}
}
