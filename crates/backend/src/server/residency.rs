use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;

/// Documents that hold parsed state, most recently visible first.
#[derive(Debug, Default)]
pub(super) struct Residency {
	recent: VecDeque<PathBuf>,
}

impl Residency {
	/// Moves `path` to the front, inserting it if needed.
	pub(super) fn touch(&mut self, path: &Path) {
		if let Some(index) = self.recent.iter().position(|resident| resident == path) {
			self.recent.remove(index);
		}
		self.recent.push_front(path.to_path_buf());
	}

	pub(super) fn forget(&mut self, path: &Path) -> bool {
		let before = self.recent.len();
		self.recent.retain(|resident| resident != path);
		before != self.recent.len()
	}

	#[cfg(test)]
	pub(super) fn contains(&self, path: &Path) -> bool {
		self.recent.iter().any(|resident| resident == path)
	}

	pub(super) fn len(&self) -> usize {
		self.recent.len()
	}

	/// Drops least recent documents not in `keep` until at most `limit`
	/// remain, and returns them oldest first.
	pub(super) fn evict(&mut self, limit: usize, keep: &FxHashSet<&Path>) -> Vec<PathBuf> {
		let mut evicted = Vec::new();
		let mut index = self.recent.len();
		while self.recent.len() > limit && index > 0 {
			index -= 1;
			if keep.contains(self.recent[index].as_path()) {
				continue;
			}
			if let Some(path) = self.recent.remove(index) {
				evicted.push(path);
			}
		}
		evicted
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	fn paths(names: &[&str]) -> Vec<PathBuf> {
		names.iter().map(PathBuf::from).collect()
	}

	#[test]
	fn evicts_oldest_hidden_documents() {
		let mut residency = Residency::default();
		for name in ["a", "b", "c", "d"] {
			residency.touch(Path::new(name));
		}
		residency.touch(Path::new("a"));

		let keep: FxHashSet<&Path> = [Path::new("b")].into_iter().collect();
		assert_eq!(residency.evict(2, &keep), paths(&["c", "d"]));
		assert_eq!(residency.len(), 2);
		assert!(residency.contains(Path::new("a")));
		assert!(residency.contains(Path::new("b")));
	}

	#[test]
	fn visible_documents_may_exceed_the_limit() {
		let mut residency = Residency::default();
		for name in ["a", "b", "c"] {
			residency.touch(Path::new(name));
		}
		let keep: FxHashSet<&Path> = [Path::new("a"), Path::new("b"), Path::new("c")].into_iter().collect();

		assert!(residency.evict(1, &keep).is_empty());
		assert_eq!(residency.len(), 3);
		assert!(residency.forget(Path::new("b")));
		assert!(!residency.forget(Path::new("b")));
	}
}
