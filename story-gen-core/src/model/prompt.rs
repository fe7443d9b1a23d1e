use super::request::{Emotion, Genre, Mode, PoemStyle, Rhyme, ToneParams, WritingStyle};

/// Quick-insert keywords offered on the story tab.
pub const STORY_QUICK_KEYWORDS: [&str; 8] = ["公主", "城堡", "龙", "魔法", "冒险", "森林", "巫师", "宝藏"];

/// Quick-insert keywords offered on the poem tab.
pub const POEM_QUICK_KEYWORDS: [&str; 8] = ["春天", "花朵", "希望", "月光", "梦想", "河流", "星辰", "思念"];

/// Normalizes a keyword string before it is embedded in a prompt.
///
/// The full-width comma is replaced by the ASCII one and the result is trimmed.
/// Duplicates are kept.
pub fn normalize_keywords(keywords: &str) -> String {
	keywords.replace('，', ",").trim().to_owned()
}

/// Returns `true` if the keywords contain any Latin (ASCII) letter.
///
/// Strict on purpose: a single stray letter inside Chinese keywords counts.
pub fn contains_latin(keywords: &str) -> bool {
	keywords.chars().any(|c| c.is_ascii_alphabetic())
}

/// Appends a quick keyword to the current keyword input.
///
/// - Blank input is replaced by `keyword`
/// - Otherwise `keyword` is appended after an ASCII comma
pub fn add_keyword(current: &str, keyword: &str) -> String {
	let current = current.trim();
	if current.is_empty() {
		keyword.to_owned()
	} else {
		format!("{current},{keyword}")
	}
}

/// Builds the instruction sent to the model.
///
/// `keywords` are normalized here; the Latin check is the caller's business.
/// Tone fields that do not apply to `mode` are ignored.
pub fn build_prompt(keywords: &str, mode: Mode, tone: &ToneParams) -> String {
	let keywords = normalize_keywords(keywords);
	match mode {
		Mode::Story(genre) => story_prompt(&keywords, genre, tone.writing_style, tone.character.as_deref()),
		Mode::Poem(style) => {
			let tone = poem_tone(tone.rhyme, tone.emotion);
			match style {
				PoemStyle::Modern => modern_poem_prompt(&keywords, &tone),
				PoemStyle::Classical => classical_poem_prompt(&keywords, &tone),
				PoemStyle::Ci => ci_prompt(&keywords, &tone),
				PoemStyle::NurseryRhyme => nursery_rhyme_prompt(&keywords, &tone),
			}
		}
	}
}

fn story_prompt(keywords: &str, genre: Genre, style: Option<WritingStyle>, character: Option<&str>) -> String {
	let mut tone = String::new();
	if let Some(style) = style {
		tone.push_str(&format!("，写作风格为{}", style.label()));
	}
	if let Some(character) = character.map(str::trim).filter(|c| !c.is_empty()) {
		tone.push_str(&format!("，主要角色为{character}"));
	}
	format!(
		"请根据以下关键词生成一个{}风格的完整故事，要求以连续的文本段落形式呈现，不要使用数字编号列表，要有明确的开头、发展和结尾{tone}：{keywords}\n故事内容：",
		genre.label()
	)
}

/// Extra clauses shared by every poem template.
fn poem_tone(rhyme: Option<Rhyme>, emotion: Option<Emotion>) -> String {
	let mut tone = String::new();
	if let Some(rhyme) = rhyme.filter(|r| *r != Rhyme::Free) {
		tone.push_str(&format!("，押韵方式为{}", rhyme.label()));
	}
	if let Some(emotion) = emotion {
		tone.push_str(&format!("，情感基调为{}", emotion.label()));
	}
	tone
}

fn modern_poem_prompt(keywords: &str, tone: &str) -> String {
	format!(
		"请根据以下关键词创作一首优美的现代诗，要求以连续的分行形式呈现，不要使用任何数字编号，语言优美，意境深远，具有文学性{tone}：{keywords}\n诗歌内容："
	)
}

fn classical_poem_prompt(keywords: &str, tone: &str) -> String {
	format!(
		"请根据以下关键词创作一首古体诗，要求符合古诗格律，押韵工整，不要使用数字编号，语言典雅，意境优美{tone}：{keywords}\n诗歌内容："
	)
}

fn ci_prompt(keywords: &str, tone: &str) -> String {
	format!(
		"请根据以下关键词创作一首宋词风格的作品，要求情感细腻，语言优美，不要使用数字编号，具有古典韵味{tone}：{keywords}\n诗歌内容："
	)
}

fn nursery_rhyme_prompt(keywords: &str, tone: &str) -> String {
	format!(
		"请根据以下关键词创作一首简单易懂的儿歌，要求语言明快，节奏流畅，不要使用数字编号，适合儿童传唱{tone}：{keywords}\n诗歌内容："
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn keywords_are_normalized() {
		assert_eq!(normalize_keywords("  公主，城堡,龙 "), "公主,城堡,龙");
		assert_eq!(normalize_keywords("龙，龙"), "龙,龙");
	}

	#[test]
	fn latin_detection_is_strict() {
		assert!(contains_latin("dragon"));
		assert!(contains_latin("公主,AI,城堡"));
		assert!(!contains_latin("公主，城堡，123"));
		assert!(!contains_latin("ｄｒａｇｏｎ"));
	}

	#[test]
	fn add_keyword_appends_with_comma() {
		assert_eq!(add_keyword("", "龙"), "龙");
		assert_eq!(add_keyword("   ", "龙"), "龙");
		assert_eq!(add_keyword(" 公主 ", "龙"), "公主,龙");
	}

	#[test]
	fn story_prompt_embeds_genre_and_keywords() {
		let prompt = build_prompt("公主，城堡", Mode::Story(Genre::SciFi), &ToneParams::default());
		assert_eq!(
			prompt,
			"请根据以下关键词生成一个科幻风格的完整故事，要求以连续的文本段落形式呈现，不要使用数字编号列表，要有明确的开头、发展和结尾：公主,城堡\n故事内容："
		);
	}

	#[test]
	fn story_tone_is_inserted_before_keywords() {
		let tone = ToneParams {
			writing_style: Some(WritingStyle::Literary),
			character: Some(" 勇敢的骑士 ".to_owned()),
			..ToneParams::default()
		};
		let prompt = build_prompt("龙", Mode::Story(Genre::Fantasy), &tone);
		assert!(prompt.contains("结尾，写作风格为文艺，主要角色为勇敢的骑士：龙\n"));
	}

	#[test]
	fn blank_character_is_ignored() {
		let tone = ToneParams { character: Some("  ".to_owned()), ..ToneParams::default() };
		let with_blank = build_prompt("龙", Mode::Story(Genre::Fantasy), &tone);
		let plain = build_prompt("龙", Mode::Story(Genre::Fantasy), &ToneParams::default());
		assert_eq!(with_blank, plain);
	}

	#[test]
	fn every_poem_style_has_its_own_template() {
		let prompts: Vec<String> = PoemStyle::ALL
			.iter()
			.map(|style| build_prompt("春天", Mode::Poem(*style), &ToneParams::default()))
			.collect();
		for (i, a) in prompts.iter().enumerate() {
			assert!(a.contains("不要使用"));
			assert!(a.contains("数字编号"));
			assert!(a.ends_with("：春天\n诗歌内容："));
			for b in &prompts[i + 1..] {
				assert_ne!(a, b);
			}
		}
		assert!(prompts[0].contains("现代诗"));
		assert!(prompts[1].contains("古体诗"));
		assert!(prompts[2].contains("宋词"));
		assert!(prompts[3].contains("儿歌"));
	}

	#[test]
	fn poem_tone_skips_free_rhyme() {
		let tone = ToneParams { rhyme: Some(Rhyme::Free), emotion: Some(Emotion::Longing), ..ToneParams::default() };
		let prompt = build_prompt("月光", Mode::Poem(PoemStyle::Classical), &tone);
		assert!(!prompt.contains("押韵方式"));
		assert!(prompt.contains("，情感基调为思念：月光"));

		let tone = ToneParams { rhyme: Some(Rhyme::EvenLines), ..ToneParams::default() };
		let prompt = build_prompt("月光", Mode::Poem(PoemStyle::NurseryRhyme), &tone);
		assert!(prompt.contains("，押韵方式为偶句押韵：月光"));
	}

	#[test]
	fn story_tone_is_ignored_for_poems() {
		let tone = ToneParams { writing_style: Some(WritingStyle::Relaxed), ..ToneParams::default() };
		let prompt = build_prompt("星辰", Mode::Poem(PoemStyle::Modern), &tone);
		assert_eq!(prompt, build_prompt("星辰", Mode::Poem(PoemStyle::Modern), &ToneParams::default()));
	}
}
