use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default token budget for stories.
pub const DEFAULT_STORY_MAX_LENGTH: u32 = 200;

/// Default token budget for poems.
pub const DEFAULT_POEM_MAX_LENGTH: u32 = 100;

pub const DEFAULT_STORY_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_POEM_TEMPERATURE: f32 = 0.8;

/// Accepted sampling temperature range (inclusive).
pub const TEMPERATURE_RANGE: std::ops::RangeInclusive<f32> = 0.1..=1.0;

/// Declares a closed option set with a Chinese display label per variant.
///
/// Every generated enum gets `ALL` (declaration order, first is the default),
/// `label()` and `Default`.
macro_rules! labelled {
	(
		$(#[$meta:meta])*
		$name:ident { $($variant:ident => $label:literal),+ $(,)? }
	) => {
		$(#[$meta])*
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
		#[serde(rename_all = "snake_case")]
		pub enum $name {
			$($variant),+
		}

		impl $name {
			pub const ALL: &'static [$name] = &[$($name::$variant),+];

			/// Label used in prompts, history entries and the UI.
			pub fn label(&self) -> &'static str {
				match self {
					$($name::$variant => $label),+
				}
			}
		}

		impl Default for $name {
			fn default() -> Self {
				Self::ALL[0]
			}
		}

		impl std::fmt::Display for $name {
			fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
				f.write_str(self.label())
			}
		}
	};
}

labelled! {
	/// Story theme.
	Genre {
		Fantasy => "奇幻",
		SciFi => "科幻",
		Mystery => "悬疑",
		Romance => "爱情",
		Adventure => "冒险",
		History => "历史",
		Horror => "恐怖",
		Comedy => "喜剧",
	}
}

labelled! {
	/// Story writing style.
	WritingStyle {
		Popular => "通俗",
		Literary => "文艺",
		Classical => "古典",
		Modern => "现代",
		Suspense => "悬疑",
		Relaxed => "轻松",
	}
}

labelled! {
	/// Poem form. Each variant has its own prompt template.
	PoemStyle {
		Modern => "现代诗",
		Classical => "古体诗",
		Ci => "宋词",
		NurseryRhyme => "儿歌",
	}
}

labelled! {
	/// Rhyme requirement for poems. `Free` adds nothing to the prompt.
	Rhyme {
		Free => "不要求",
		Rhymed => "押韵",
		Strict => "严格押韵",
		EvenLines => "偶句押韵",
	}
}

labelled! {
	/// Emotional tone of a poem.
	Emotion {
		Calm => "平静",
		Joy => "喜悦",
		Sorrow => "忧伤",
		Longing => "思念",
		Inspiring => "励志",
		Passionate => "激昂",
	}
}

/// What is being generated.
///
/// A story is parameterized by its genre, a poem by its style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
	Story(Genre),
	Poem(PoemStyle),
}

impl Mode {
	pub fn kind(&self) -> Kind {
		match self {
			Mode::Story(_) => Kind::Story,
			Mode::Poem(_) => Kind::Poem,
		}
	}

	/// Genre or style label stored alongside history entries.
	pub fn label(&self) -> &'static str {
		match self {
			Mode::Story(genre) => genre.label(),
			Mode::Poem(style) => style.label(),
		}
	}
}

/// Kind of a generated text, as persisted in history and favorites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
	#[serde(rename = "故事")]
	Story,
	#[serde(rename = "诗歌")]
	Poem,
}

impl Kind {
	pub fn label(&self) -> &'static str {
		match self {
			Kind::Story => "故事",
			Kind::Poem => "诗歌",
		}
	}

	/// Guesses the kind of free-standing content.
	///
	/// Content whose first 100 characters mention "故事" is a story,
	/// anything else is a poem.
	pub fn guess(content: &str) -> Self {
		let head: String = content.chars().take(100).collect();
		if head.contains("故事") { Kind::Story } else { Kind::Poem }
	}
}

impl std::fmt::Display for Kind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.label())
	}
}

/// Optional tone parameters refining a prompt.
///
/// Story requests use `writing_style` and `character`, poem requests use
/// `rhyme` and `emotion`; fields that do not apply to the mode are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToneParams {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub writing_style: Option<WritingStyle>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub character: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub rhyme: Option<Rhyme>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub emotion: Option<Emotion>,
}

/// One generation request.
///
/// # Invariants
/// - `temperature` is within `TEMPERATURE_RANGE`
/// - `max_length` is strictly positive
///
/// Keywords are kept as typed by the user (comma separated, both the
/// full-width and the ASCII comma are accepted). They are normalized and
/// checked for Latin characters by the generation service.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
	/// Raw keyword string.
	pub keywords: String,

	pub mode: Mode,

	pub tone: ToneParams,

	/// Maximum number of new tokens.
	max_length: u32,

	/// Sampling temperature.
	temperature: f32,
}

impl GenerationRequest {
	/// Story request with the default budget and temperature.
	pub fn story(keywords: impl Into<String>, genre: Genre) -> Self {
		Self {
			keywords: keywords.into(),
			mode: Mode::Story(genre),
			tone: ToneParams::default(),
			max_length: DEFAULT_STORY_MAX_LENGTH,
			temperature: DEFAULT_STORY_TEMPERATURE,
		}
	}

	/// Poem request with the default budget and temperature.
	pub fn poem(keywords: impl Into<String>, style: PoemStyle) -> Self {
		Self {
			keywords: keywords.into(),
			mode: Mode::Poem(style),
			tone: ToneParams::default(),
			max_length: DEFAULT_POEM_MAX_LENGTH,
			temperature: DEFAULT_POEM_TEMPERATURE,
		}
	}

	pub fn max_length(&self) -> u32 {
		self.max_length
	}

	pub fn temperature(&self) -> f32 {
		self.temperature
	}

	/// Sets the token budget.
	///
	/// # Errors
	/// Returns `Error::InvalidMaxLength` for 0.
	pub fn set_max_length(&mut self, max_length: u32) -> Result<()> {
		if max_length == 0 {
			return Err(Error::InvalidMaxLength);
		}
		self.max_length = max_length;
		Ok(())
	}

	/// Sets the sampling temperature (0.1..=1.0).
	///
	/// # Errors
	/// Returns `Error::InvalidTemperature` if the value is outside the valid range.
	pub fn set_temperature(&mut self, temperature: f32) -> Result<()> {
		if !TEMPERATURE_RANGE.contains(&temperature) {
			return Err(Error::InvalidTemperature(temperature));
		}
		self.temperature = temperature;
		Ok(())
	}
}
