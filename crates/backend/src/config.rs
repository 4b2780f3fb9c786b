//! Backend configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Tunables of the backend control loop and worker pool.
///
/// Every field has a default, so an empty TOML document is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
	/// Upper bound of job bodies running at once.
	pub max_concurrent_jobs: usize,
	/// Pool permits only interactive requests may take.
	pub interactive_reserve: usize,
	/// Period of the `Alive` heartbeat in milliseconds. `0` disables it.
	pub alive_interval_ms: u64,
	/// Hidden documents beyond this many resident ones get suspended.
	pub max_resident_documents: usize,
}

impl Default for BackendConfig {
	fn default() -> Self {
		Self {
			max_concurrent_jobs: std::thread::available_parallelism().map_or(1, |n| n.get()),
			interactive_reserve: 1,
			alive_interval_ms: 5_000,
			max_resident_documents: 10,
		}
	}
}

impl BackendConfig {
	/// Location of the user config file: `<config dir>/codemodel/backend.toml`.
	pub fn default_path() -> Option<PathBuf> {
		dirs::config_dir().map(|dir| dir.join("codemodel").join("backend.toml"))
	}

	/// Parses a config from TOML text.
	pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str::<Self>(text)?.normalized())
	}

	/// Reads and parses a config file.
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
			path: path.to_path_buf(),
			source,
		})?;
		Self::from_toml_str(&text)
	}

	/// Loads `explicit` if given. Otherwise loads the user config file when it
	/// exists, falling back to defaults.
	pub fn load_or_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
		if let Some(path) = explicit {
			return Self::load(path);
		}
		match Self::default_path() {
			Some(path) if path.is_file() => Self::load(&path),
			_ => Ok(Self::default()),
		}
	}

	/// Heartbeat period, or `None` when disabled.
	pub fn alive_interval(&self) -> Option<Duration> {
		(self.alive_interval_ms > 0).then(|| Duration::from_millis(self.alive_interval_ms))
	}

	/// Raises `max_concurrent_jobs` to 1 and keeps the reserve below it.
	pub fn normalized(mut self) -> Self {
		self.max_concurrent_jobs = self.max_concurrent_jobs.max(1);
		self.interactive_reserve = self.interactive_reserve.min(self.max_concurrent_jobs - 1);
		self
	}
}
