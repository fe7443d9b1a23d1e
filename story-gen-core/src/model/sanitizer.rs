use std::sync::LazyLock;

use regex::Regex;

use super::request::{Mode, PoemStyle};

/// Characters accepted as the end of a story.
const SENTENCE_ENDINGS: [char; 7] = ['.', '。', '!', '！', '?', '？', '…'];

/// Characters after which a one-line modern poem is broken.
const LINE_BREAKS: [char; 6] = ['，', '。', '！', '？', '；', '：'];

/// Line-leading "1. ", "2." ... (runs like "1. 2. " included).
///
/// Only horizontal whitespace is matched: a marker never spans two lines.
static NUMBERED: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"(?m)^[^\S\n]*(?:\d+\.[^\S\n]*)+").expect("valid numbered-list regex"));

/// Line-leading arabic or Chinese numerals followed by "、", "." or "．".
static POEM_NUMBERED: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?m)^[^\S\n]*(?:[\d一二三四五六七八九十]+[^\S\n]*[、.．][^\S\n]*)+").expect("valid poem numbering regex")
});

static NEWLINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n+").expect("valid newline regex"));

/// Cleans raw model output for display.
///
/// # Behavior
/// - Removes line-leading numbered-list markers (both modes)
/// - Poems: also removes Chinese-numeral markers ("一、"), drops blank lines
///   and trims every line; a modern poem that ended up on a single line is
///   broken after clause punctuation
/// - Collapses consecutive newlines
/// - Stories: drops trailing whitespace and appends "。" when the text does
///   not end a sentence
///
/// An empty result is valid. Applying the function twice gives the same
/// result as applying it once.
pub fn sanitize(text: &str, mode: Mode) -> String {
	let text = NUMBERED.replace_all(text, "");
	match mode {
		Mode::Story(_) => {
			let mut story = NEWLINES.replace_all(&text, "\n").trim_end().to_owned();
			if !story.is_empty() && !story.ends_with(SENTENCE_ENDINGS) {
				story.push('。');
			}
			story
		}
		Mode::Poem(style) => {
			let text = POEM_NUMBERED.replace_all(&text, "");
			let text = NEWLINES.replace_all(&text, "\n");
			let lines: Vec<&str> = text
				.split('\n')
				.map(str::trim)
				.filter(|line| !line.is_empty())
				.collect();

			if style == PoemStyle::Modern && lines.len() == 1 {
				let broken = break_line(lines[0]);
				if broken.len() > 1 {
					return broken.join("\n");
				}
			}
			lines.join("\n")
		}
	}
}

/// Splits a line right after each clause punctuation mark.
///
/// Fragments are cleaned like full lines; empty ones are dropped.
fn break_line(line: &str) -> Vec<String> {
	line.split_inclusive(LINE_BREAKS)
		.map(|fragment| POEM_NUMBERED.replace(fragment, "").trim().to_owned())
		.filter(|fragment| !fragment.is_empty())
		.collect()
}
