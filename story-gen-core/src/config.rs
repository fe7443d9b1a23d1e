use std::path::{Path, PathBuf};
use std::time::Duration;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::io;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Environment variable overriding the configuration file path.
pub const CONFIG_ENV: &str = "STORY_GEN_CONFIG";

/// Model endpoints and identifiers.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
	/// Inference endpoint serving `/models/{model}`.
	pub endpoint: String,
	/// Second endpoint tried when the primary one does not serve the model.
	pub mirror_endpoint: Option<String>,
	/// Preferred model.
	pub model: String,
	/// Generic model used when the preferred one is unavailable.
	pub fallback_model: String,
	pub pad_token_id: Option<u32>,
	/// Generation timeout in seconds. `None` waits as long as the model needs.
	pub request_timeout_secs: Option<u64>,
	pub probe_timeout_secs: u64,
}

impl Default for ModelConfig {
	fn default() -> Self {
		Self {
			endpoint: "http://127.0.0.1:8080".to_owned(),
			mirror_endpoint: Some("https://hf-mirror.com".to_owned()),
			model: "uer/gpt2-chinese-cluecorpussmall".to_owned(),
			fallback_model: "gpt2".to_owned(),
			pad_token_id: None,
			request_timeout_secs: None,
			probe_timeout_secs: 10,
		}
	}
}

impl ModelConfig {
	pub fn request_timeout(&self) -> Option<Duration> {
		self.request_timeout_secs.map(Duration::from_secs)
	}

	pub fn probe_timeout(&self) -> Duration {
		Duration::from_secs(self.probe_timeout_secs)
	}
}

/// Address the HTTP server binds to and the UI connects to.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
	pub host: String,
	pub port: u16,
}

impl Default for ServerConfig {
	fn default() -> Self {
		Self { host: "127.0.0.1".to_owned(), port: 5000 }
	}
}

impl ServerConfig {
	/// Base URL of the API, e.g. `http://127.0.0.1:5000/v1`.
	pub fn base_url(&self) -> String {
		format!("http://{}:{}/v1", self.host, self.port)
	}
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct AppConfig {
	pub model: ModelConfig,
	/// Directory holding `generation_history.json` and `favorites.json`.
	pub data_dir: PathBuf,
	/// Directory receiving exported texts.
	pub export_dir: PathBuf,
	/// Number of history entries kept.
	pub history_limit: usize,
	pub server: ServerConfig,
}

impl Default for AppConfig {
	fn default() -> Self {
		Self {
			model: ModelConfig::default(),
			data_dir: PathBuf::from("."),
			export_dir: PathBuf::from("."),
			history_limit: 50,
			server: ServerConfig::default(),
		}
	}
}

impl AppConfig {
	/// Path of the configuration file: `$STORY_GEN_CONFIG` or `config.json`.
	pub fn default_path() -> PathBuf {
		std::env::var_os(CONFIG_ENV)
			.map(PathBuf::from)
			.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
	}

	/// Loads the configuration, writing the defaults first if the file is missing.
	///
	/// Missing fields take their default value.
	///
	/// # Errors
	/// Returns an error if the file cannot be read, parsed or created.
	pub fn load_or_init<P: AsRef<Path>>(path: P) -> Result<Self> {
		let path = path.as_ref();
		match io::read_file(path)? {
			Some(data) => Ok(serde_json::from_str(&data)?),
			None => {
				let config = Self::default();
				config.save(path)?;
				info!("wrote default configuration to {}", path.display());
				Ok(config)
			}
		}
	}

	pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
		let json = serde_json::to_string_pretty(self)?;
		io::write_file(path, &json)?;
		Ok(())
	}

	/// `data_dir` with `"."` resolved to the working directory.
	pub fn data_dir(&self) -> PathBuf {
		io::normalize_folder(&self.data_dir)
	}

	/// `export_dir` with `"."` resolved to the working directory.
	pub fn export_dir(&self) -> PathBuf {
		io::normalize_folder(&self.export_dir)
	}
}
