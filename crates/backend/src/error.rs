//! Error types for the backend core.

use std::path::PathBuf;

use codemodel_protocol::ProjectPartId;
use thiserror::Error;

use crate::registry::UnitRole;

/// Failures of [`Registry`](crate::registry::Registry) operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
	#[error("unknown project part referenced: {0}")]
	UnknownProjectPartReferenced(ProjectPartId),
	#[error("{role} document already exists: {}", .path.display())]
	DocumentAlreadyExists { path: PathBuf, role: UnitRole },
	#[error("{role} document does not exist: {}", .path.display())]
	DocumentDoesNotExist { path: PathBuf, role: UnitRole },
	/// A job context still holds the translation unit.
	#[error("document is pinned by {pins} job context(s): {}", .path.display())]
	DocumentPinned { path: PathBuf, pins: usize },
}

/// Failures to bind a job request to live registry state.
///
/// These are the only failures a client ever hears about, as a `RequestFailed`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BindError {
	#[error("no such document: {}", .0.display())]
	NoSuchDocument(PathBuf),
	#[error("no such project part: {0}")]
	NoSuchProjectPart(ProjectPartId),
}

/// Failures reported by a [`ParseEngine`](crate::engine::ParseEngine).
#[derive(Debug, Error)]
pub enum EngineError {
	#[error("failed to read {}: {source}", .path.display())]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("parse failed: {0}")]
	Parse(String),
}

/// Failures while loading [`BackendConfig`](crate::config::BackendConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("failed to read config {}: {source}", .path.display())]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("invalid config: {0}")]
	Toml(#[from] toml::de::Error),
}
