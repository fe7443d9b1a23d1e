use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{error, warn};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::io;
use crate::model::request::{GenerationRequest, Kind, Mode};

pub const HISTORY_FILE: &str = "generation_history.json";
pub const FAVORITES_FILE: &str = "favorites.json";

/// Default number of history entries kept.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// A persisted generation, in history or in favorites.
///
/// Story history entries carry `genre`, poem history entries carry `style`.
/// Favorites carry neither, nor keywords.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Entry {
	pub title: String,
	pub content: String,
	#[serde(rename = "type")]
	pub kind: Kind,
	/// Seconds since the Unix epoch.
	pub timestamp: f64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub keywords: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub genre: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub style: Option<String>,
}

impl Entry {
	/// History entry for a finished request; `content` is whatever was shown.
	pub fn history(request: &GenerationRequest, content: &str) -> Self {
		let kind = request.mode.kind();
		let (genre, style) = match request.mode {
			Mode::Story(genre) => (Some(genre.label().to_owned()), None),
			Mode::Poem(style) => (None, Some(style.label().to_owned())),
		};
		Self {
			title: format!("{}_{}", kind.label(), io::local_stamp()),
			content: content.to_owned(),
			kind,
			timestamp: now(),
			keywords: Some(request.keywords.clone()),
			genre,
			style,
		}
	}

	pub fn favorite(kind: Kind, content: &str) -> Self {
		Self {
			title: format!("收藏_{}", io::local_stamp()),
			content: content.to_owned(),
			kind,
			timestamp: now(),
			keywords: None,
			genre: None,
			style: None,
		}
	}

	/// Genre or style, whichever is set.
	pub fn genre_or_style(&self) -> Option<&str> {
		self.genre.as_deref().or(self.style.as_deref())
	}
}

fn now() -> f64 {
	Utc::now().timestamp_millis() as f64 / 1000.0
}

/// The two persisted collections.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
	/// Capped, oldest entries evicted first.
	History,
	/// Unbounded, curated by the user.
	Favorites,
}

impl Collection {
	pub fn file_name(&self) -> &'static str {
		match self {
			Collection::History => HISTORY_FILE,
			Collection::Favorites => FAVORITES_FILE,
		}
	}
}

/// Owner of history and favorites, mirrored to one JSON file each.
///
/// Both collections are loaded when the store is opened and the matching
/// file is rewritten after every mutation. Persistence failures never reach
/// the caller: unreadable files load as empty collections and failed saves
/// are logged, the in-memory state is kept either way.
#[derive(Debug)]
pub struct Store {
	dir: PathBuf,
	history_limit: usize,
	history: Vec<Entry>,
	favorites: Vec<Entry>,
}

impl Store {
	/// Opens the store in `dir`.
	///
	/// A `history_limit` of 0 is raised to 1: the latest generation is always kept.
	pub fn open<P: AsRef<Path>>(dir: P, history_limit: usize) -> Self {
		if history_limit == 0 {
			warn!("history limit 0 is not supported, keeping the last entry only");
		}
		let mut store = Self {
			dir: dir.as_ref().to_path_buf(),
			history_limit: history_limit.max(1),
			history: Vec::new(),
			favorites: Vec::new(),
		};
		store.history = store.load(Collection::History);
		store.favorites = store.load(Collection::Favorites);
		store
	}

	pub fn from_config(config: &AppConfig) -> Self {
		Self::open(config.data_dir(), config.history_limit)
	}

	pub fn path(&self, collection: Collection) -> PathBuf {
		self.dir.join(collection.file_name())
	}

	/// Reads a collection from disk.
	///
	/// A missing or malformed file yields an empty collection.
	pub fn load(&self, collection: Collection) -> Vec<Entry> {
		let path = self.path(collection);
		let data = match io::read_file(&path) {
			Ok(Some(data)) => data,
			Ok(None) => return Vec::new(),
			Err(e) => {
				warn!("cannot read {}: {e}", path.display());
				return Vec::new();
			}
		};
		serde_json::from_str(&data).unwrap_or_else(|e| {
			warn!("ignoring malformed {}: {e}", path.display());
			Vec::new()
		})
	}

	/// Writes a whole collection to disk (indented JSON, UTF-8).
	///
	/// Failures are logged and otherwise ignored.
	pub fn save(&self, collection: Collection, entries: &[Entry]) {
		let path = self.path(collection);
		let result = serde_json::to_string_pretty(entries)
			.map_err(Error::from)
			.and_then(|json| io::write_file(&path, &json).map_err(Error::from));
		if let Err(e) = result {
			error!("failed to save {}: {e}", path.display());
		}
	}

	pub fn entries(&self, collection: Collection) -> &[Entry] {
		match collection {
			Collection::History => &self.history,
			Collection::Favorites => &self.favorites,
		}
	}

	pub fn get(&self, collection: Collection, index: usize) -> Option<&Entry> {
		self.entries(collection).get(index)
	}

	/// Appends an entry and saves the collection.
	///
	/// History keeps only the `history_limit` most recent entries.
	pub fn append(&mut self, collection: Collection, entry: Entry) {
		let limit = self.history_limit;
		let entries = self.entries_mut(collection);
		entries.push(entry);
		if collection == Collection::History && entries.len() > limit {
			let excess = entries.len() - limit;
			entries.drain(..excess);
		}
		self.sync(collection);
	}

	/// Removes a favorite by position.
	///
	/// Out-of-range indexes and the history collection are left untouched.
	pub fn remove_at(&mut self, collection: Collection, index: usize) -> Option<Entry> {
		if collection != Collection::Favorites || index >= self.favorites.len() {
			return None;
		}
		let removed = self.favorites.remove(index);
		self.sync(collection);
		Some(removed)
	}

	pub fn clear(&mut self, collection: Collection) {
		self.entries_mut(collection).clear();
		self.sync(collection);
	}

	/// Reloads a collection from disk, dropping the in-memory copy.
	pub fn refresh(&mut self, collection: Collection) -> &[Entry] {
		let entries = self.load(collection);
		*self.entries_mut(collection) = entries;
		self.entries(collection)
	}

	/// Records a finished generation in history.
	pub fn record_generation(&mut self, request: &GenerationRequest, content: &str) -> &Entry {
		self.append(Collection::History, Entry::history(request, content));
		&self.history[self.history.len() - 1]
	}

	/// Adds a result to favorites.
	///
	/// Without an explicit kind, the kind is guessed from the content.
	///
	/// # Errors
	/// Returns `Error::EmptyContent` for blank content.
	pub fn add_favorite(&mut self, content: &str, kind: Option<Kind>) -> Result<&Entry> {
		if content.trim().is_empty() {
			return Err(Error::EmptyContent);
		}
		let kind = kind.unwrap_or_else(|| Kind::guess(content));
		self.append(Collection::Favorites, Entry::favorite(kind, content));
		Ok(&self.favorites[self.favorites.len() - 1])
	}

	fn entries_mut(&mut self, collection: Collection) -> &mut Vec<Entry> {
		match collection {
			Collection::History => &mut self.history,
			Collection::Favorites => &mut self.favorites,
		}
	}

	fn sync(&self, collection: Collection) {
		self.save(collection, self.entries(collection));
	}
}
