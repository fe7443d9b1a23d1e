use std::sync::Arc;

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::model::backend::{GenerationParams, TextGenerator};
use crate::model::prompt::{build_prompt, contains_latin, normalize_keywords};
use crate::model::request::{GenerationRequest, Kind};
use crate::model::sanitizer::sanitize;

/// Output of one successful generation.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedText {
	/// Model output with the prompt echo removed and whitespace trimmed.
	pub raw: String,
	/// `raw` after the sanitizer.
	pub cleaned: String,
}

/// High-level generation service.
///
/// # Responsibilities
/// - Reject keywords mixing Latin letters into the Chinese input
/// - Build the prompt and the sampling profile for the request
/// - Call the backend once and clean its output
///
/// Cheap to clone: the backend is shared.
#[derive(Clone)]
pub struct Generator {
	backend: Arc<dyn TextGenerator>,
}

impl Generator {
	pub fn new<G: TextGenerator + 'static>(backend: G) -> Self {
		Self { backend: Arc::new(backend) }
	}

	pub fn model_name(&self) -> &str {
		self.backend.model_name()
	}

	/// Runs the whole pipeline and returns errors as such.
	///
	/// # Errors
	/// - `Error::MixedScript` if the keywords contain Latin letters
	///   (the backend is not called)
	/// - Any backend error
	pub fn try_generate(&self, request: &GenerationRequest) -> Result<GeneratedText> {
		let keywords = normalize_keywords(&request.keywords);
		if contains_latin(&keywords) {
			return Err(Error::MixedScript(keywords));
		}

		let prompt = build_prompt(&keywords, request.mode, &request.tone);
		let params = GenerationParams::for_request(request);
		debug!("generating {} with '{}': {:?}", request.mode.kind(), self.model_name(), params);

		let output = self.backend.generate(&prompt, &params)?;
		let raw = output.replacen(&prompt, "", 1).trim().to_owned();
		let cleaned = sanitize(&raw, request.mode);
		Ok(GeneratedText { raw, cleaned })
	}

	/// Generates the text to show for `request`. Never fails.
	///
	/// Rejected keywords and backend failures come back as a readable
	/// message in place of the generated text.
	pub fn generate(&self, request: &GenerationRequest) -> String {
		let kind = request.mode.kind();
		match self.try_generate(request) {
			Ok(text) => text.cleaned,
			Err(Error::MixedScript(_)) => rejection_message(kind),
			Err(e) => {
				warn!("{kind} generation failed: {e}");
				format!("生成{}时出错: {e}", kind.label())
			}
		}
	}
}

/// Message shown instead of a result when keywords contain Latin letters.
pub fn rejection_message(kind: Kind) -> String {
	format!("请使用中文关键词，生成英文{}暂不支持。", kind.label())
}

#[cfg(test)]
mod tests {
	use std::sync::Mutex;

	use super::*;
	use crate::model::request::{Genre, PoemStyle};

	/// Records prompts and answers with a canned output.
	struct Scripted {
		answer: Box<dyn Fn(&str) -> Result<String> + Send + Sync>,
		calls: Arc<Mutex<Vec<(String, GenerationParams)>>>,
	}

	impl Scripted {
		fn new<F>(answer: F) -> (Self, Arc<Mutex<Vec<(String, GenerationParams)>>>)
		where
			F: Fn(&str) -> Result<String> + Send + Sync + 'static,
		{
			let calls = Arc::new(Mutex::new(Vec::new()));
			(Self { answer: Box::new(answer), calls: calls.clone() }, calls)
		}
	}

	impl TextGenerator for Scripted {
		fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
			self.calls.lock().unwrap().push((prompt.to_owned(), params.clone()));
			(self.answer)(prompt)
		}

		fn model_name(&self) -> &str {
			"scripted"
		}
	}

	#[test]
	fn latin_keywords_are_rejected_without_calling_the_model() {
		let (backend, calls) = Scripted::new(|_| Ok("不该出现".to_owned()));
		let generator = Generator::new(backend);

		let story = generator.generate(&GenerationRequest::story("公主,dragon", Genre::Fantasy));
		assert_eq!(story, "请使用中文关键词，生成英文故事暂不支持。");

		let poem = generator.generate(&GenerationRequest::poem("春天，a", PoemStyle::Modern));
		assert_eq!(poem, "请使用中文关键词，生成英文诗歌暂不支持。");

		assert!(calls.lock().unwrap().is_empty());
	}

	#[test]
	fn prompt_echo_is_stripped_and_story_terminated() {
		let (backend, calls) = Scripted::new(|prompt| Ok(format!("{prompt}  这是一个故事  ")));
		let generator = Generator::new(backend);

		let text = generator.try_generate(&GenerationRequest::story("公主，城堡", Genre::Fantasy)).unwrap();
		assert_eq!(text.raw, "这是一个故事");
		assert_eq!(text.cleaned, "这是一个故事。");

		let calls = calls.lock().unwrap();
		assert_eq!(calls.len(), 1);
		assert!(calls[0].0.contains("：公主,城堡\n故事内容："));
		assert_eq!(calls[0].1, GenerationParams::story(200, 0.7));
	}

	#[test]
	fn only_the_first_prompt_echo_is_removed() {
		let (backend, _) = Scripted::new(|prompt| Ok(format!("{prompt}{prompt}")));
		let generator = Generator::new(backend);
		let request = GenerationRequest::poem("月光", PoemStyle::Classical);
		let text = generator.try_generate(&request).unwrap();
		let prompt = build_prompt("月光", request.mode, &request.tone);
		assert_eq!(text.raw, prompt.trim());
	}

	#[test]
	fn poem_output_is_cleaned_with_poem_profile() {
		let (backend, calls) = Scripted::new(|_| Ok("1. 春风拂面\n\n2. 花开满园\n".to_owned()));
		let generator = Generator::new(backend);
		let mut request = GenerationRequest::poem("春天", PoemStyle::Classical);
		request.set_max_length(64).unwrap();
		request.set_temperature(0.5).unwrap();

		assert_eq!(generator.generate(&request), "春风拂面\n花开满园");
		assert_eq!(calls.lock().unwrap()[0].1, GenerationParams::poem(64, 0.5));
	}

	#[test]
	fn backend_failure_becomes_a_message() {
		let (backend, _) = Scripted::new(|_| Err(Error::EmptyResponse));
		let generator = Generator::new(backend);

		let story = generator.generate(&GenerationRequest::story("龙", Genre::Horror));
		assert_eq!(story, "生成故事时出错: model returned no sequence");

		let poem = generator.generate(&GenerationRequest::poem("星辰", PoemStyle::Ci));
		assert!(poem.starts_with("生成诗歌时出错: "));
	}

	#[test]
	fn empty_output_passes_through() {
		let (backend, _) = Scripted::new(|prompt| Ok(prompt.to_owned()));
		let generator = Generator::new(backend);
		assert_eq!(generator.generate(&GenerationRequest::story("龙", Genre::Comedy)), "");
		assert_eq!(generator.generate(&GenerationRequest::poem("龙", PoemStyle::Modern)), "");
	}
}
