use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashMap;

/// Immutable view of every unsaved file at one version.
///
/// Jobs keep the snapshot they were prepared with; later edits build a new
/// snapshot instead of touching this one.
#[derive(Debug, Default)]
pub struct UnsavedFilesSnapshot {
	version: u64,
	files: FxHashMap<PathBuf, Arc<str>>,
}

impl UnsavedFilesSnapshot {
	pub fn version(&self) -> u64 {
		self.version
	}

	pub fn get(&self, path: &Path) -> Option<&Arc<str>> {
		self.files.get(path)
	}

	pub fn len(&self) -> usize {
		self.files.len()
	}

	pub fn is_empty(&self) -> bool {
		self.files.is_empty()
	}
}

#[derive(Debug, Default)]
pub(crate) struct UnsavedFiles {
	current: Arc<UnsavedFilesSnapshot>,
}

impl UnsavedFiles {
	pub(crate) fn version(&self) -> u64 {
		self.current.version
	}

	pub(crate) fn snapshot(&self) -> Arc<UnsavedFilesSnapshot> {
		Arc::clone(&self.current)
	}

	pub(crate) fn update(&mut self, path: PathBuf, content: Arc<str>) -> u64 {
		let mut files = self.current.files.clone();
		files.insert(path, content);
		self.replace(files)
	}

	/// Returns the new version, or `None` when `path` had no unsaved content.
	pub(crate) fn remove(&mut self, path: &Path) -> Option<u64> {
		if !self.current.files.contains_key(path) {
			return None;
		}
		let mut files = self.current.files.clone();
		files.remove(path);
		Some(self.replace(files))
	}

	fn replace(&mut self, files: FxHashMap<PathBuf, Arc<str>>) -> u64 {
		let version = self.current.version + 1;
		self.current = Arc::new(UnsavedFilesSnapshot { version, files });
		version
	}
}
