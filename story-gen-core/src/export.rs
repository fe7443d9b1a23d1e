use std::path::{Path, PathBuf};

use log::info;

use crate::error::Result;
use crate::io;

/// Writes `content` to `<dir>/ai_creation_<timestamp>.txt`.
///
/// Returns `Ok(None)` without touching the filesystem when `content` is blank.
///
/// # Errors
/// Returns `Error::Io` if the file cannot be written.
pub fn export_text<P: AsRef<Path>>(dir: P, content: &str) -> Result<Option<PathBuf>> {
	if content.trim().is_empty() {
		return Ok(None);
	}
	let path = io::build_stamped_path(dir, "ai_creation", "txt");
	io::write_file(&path, content)?;
	info!("exported result to {}", path.display());
	Ok(Some(path))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::TempDir;

	#[test]
	fn blank_content_is_not_exported() {
		let dir = TempDir::new();
		assert!(export_text(dir.path(), " \n ").unwrap().is_none());
		assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
	}

	#[test]
	fn content_is_written_verbatim() {
		let dir = TempDir::new();
		let path = export_text(dir.path(), "春风拂面，\n花开满园。").unwrap().unwrap();
		assert_eq!(path.parent(), Some(dir.path()));
		assert!(path.file_name().unwrap().to_string_lossy().starts_with("ai_creation_"));
		assert_eq!(std::fs::read_to_string(&path).unwrap(), "春风拂面，\n花开满园。");
	}

	#[test]
	fn unwritable_target_is_an_error() {
		let dir = TempDir::new();
		let blocker = dir.path().join("file");
		std::fs::write(&blocker, "x").unwrap();
		assert!(export_text(blocker.join("sub"), "内容").is_err());
	}
}
