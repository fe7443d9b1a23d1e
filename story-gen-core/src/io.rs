use std::path::{Path, PathBuf};
use std::{env, fs, io};

use chrono::Local;

/// Reads a whole UTF-8 text file.
///
/// Returns `Ok(None)` when the file does not exist, so callers can tell
/// "nothing saved yet" apart from a real read failure.
pub(crate) fn read_file<P: AsRef<Path>>(filename: P) -> io::Result<Option<String>> {
	match fs::read_to_string(filename) {
		Ok(contents) => Ok(Some(contents)),
		Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
		Err(e) => Err(e),
	}
}

/// Overwrites `filename` with `contents`, creating the parent directory if needed.
///
/// Whole-file write: a crash in the middle can leave a truncated file behind.
pub(crate) fn write_file<P: AsRef<Path>>(filename: P, contents: &str) -> io::Result<()> {
	let filename = filename.as_ref();
	if let Some(parent) = filename.parent() {
		if !parent.as_os_str().is_empty() {
			fs::create_dir_all(parent)?;
		}
	}
	fs::write(filename, contents)
}

/// Current local time formatted as `%Y%m%d_%H%M%S`.
///
/// Used for entry titles and export file names.
pub(crate) fn local_stamp() -> String {
	Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Builds `<dir>/<prefix>_<stamp>.<extension>`.
///
/// Example:
/// `"out"`, `"ai_creation"`, `"txt"` → `out/ai_creation_20250101_120000.txt`
pub(crate) fn build_stamped_path<P: AsRef<Path>>(dir: P, prefix: &str, extension: &str) -> PathBuf {
	let mut output = PathBuf::from(dir.as_ref());
	output.push(format!("{}_{}", prefix, local_stamp()));
	output.set_extension(extension);
	output
}

/// Normalize a folder path.
///
/// - `"."` or `"./"` resolves to the current working directory
/// - Other paths are returned as-is (not canonicalized)
pub(crate) fn normalize_folder<P: AsRef<Path>>(input: P) -> PathBuf {
	let input = input.as_ref();
	if input == Path::new(".") || input == Path::new("./") {
		env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
	} else {
		input.to_path_buf()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::TempDir;

	#[test]
	fn missing_file_reads_as_none() {
		let dir = TempDir::new();
		assert!(read_file(dir.path().join("nope.json")).unwrap().is_none());
	}

	#[test]
	fn write_creates_parent_and_overwrites() {
		let dir = TempDir::new();
		let path = dir.path().join("nested").join("file.txt");
		write_file(&path, "first").unwrap();
		write_file(&path, "second").unwrap();
		assert_eq!(read_file(&path).unwrap().as_deref(), Some("second"));
	}

	#[test]
	fn stamped_path_has_prefix_and_extension() {
		let path = build_stamped_path("out", "ai_creation", "txt");
		let name = path.file_name().unwrap().to_string_lossy().to_string();
		assert!(name.starts_with("ai_creation_"));
		assert!(name.ends_with(".txt"));
		// ai_creation_ + 15 stamp chars + .txt
		assert_eq!(name.len(), "ai_creation_".len() + 15 + 4);
		assert_eq!(path.parent(), Some(Path::new("out")));
	}

	#[test]
	fn dot_folder_resolves_to_cwd() {
		assert_eq!(normalize_folder("."), env::current_dir().unwrap());
		assert_eq!(normalize_folder("data"), PathBuf::from("data"));
	}
}
