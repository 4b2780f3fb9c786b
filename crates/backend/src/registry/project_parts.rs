use std::sync::Arc;

use codemodel_protocol::{ProjectPart, ProjectPartId};
use rustc_hash::FxHashMap;

/// A stored project part and the version it was last changed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPartEntry {
	pub part: ProjectPart,
	pub version: u64,
}

/// Project parts by id.
///
/// Versions come from one clock for the whole table, so a part that is
/// removed and registered again never reuses an old version.
#[derive(Debug, Default)]
pub(crate) struct ProjectParts {
	entries: FxHashMap<ProjectPartId, Arc<ProjectPartEntry>>,
	clock: u64,
}

impl ProjectParts {
	pub(crate) fn upsert(&mut self, part: ProjectPart) -> u64 {
		self.clock += 1;
		let version = self.clock;
		self.entries.insert(part.id.clone(), Arc::new(ProjectPartEntry { part, version }));
		version
	}

	pub(crate) fn remove(&mut self, id: &ProjectPartId) -> bool {
		self.entries.remove(id).is_some()
	}

	pub(crate) fn get(&self, id: &ProjectPartId) -> Option<&Arc<ProjectPartEntry>> {
		self.entries.get(id)
	}

	pub(crate) fn len(&self) -> usize {
		self.entries.len()
	}
}
