use std::path::{Path, PathBuf};
use std::sync::Arc;

use codemodel_protocol::ProjectPartId;

use super::unit::{TranslationUnit, UnitRole};

/// A registered source file and its translation units.
#[derive(Debug)]
pub struct Document {
	pub(super) path: PathBuf,
	pub(super) project_part: ProjectPartId,
	pub(super) revision: u64,
	pub(super) closed: bool,
	pub(super) main: Arc<TranslationUnit>,
	pub(super) supportive: Option<Arc<TranslationUnit>>,
}

impl Document {
	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn project_part(&self) -> &ProjectPartId {
		&self.project_part
	}

	/// Edit counter. Starts at 1 and only ever grows.
	pub fn revision(&self) -> u64 {
		self.revision
	}

	/// Set once the editor unregistered the document. A closed document only
	/// waits for its pins to drain before removal.
	pub fn is_closed(&self) -> bool {
		self.closed
	}

	/// Whether the main unit released its parsed state.
	pub fn is_suspended(&self) -> bool {
		self.main.is_suspended()
	}

	pub fn unit(&self, role: UnitRole) -> Option<&Arc<TranslationUnit>> {
		match role {
			UnitRole::Main => Some(&self.main),
			UnitRole::Supportive => self.supportive.as_ref(),
		}
	}

	pub fn main(&self) -> &Arc<TranslationUnit> {
		&self.main
	}

	pub fn supportive(&self) -> Option<&Arc<TranslationUnit>> {
		self.supportive.as_ref()
	}

	/// Pins held on every unit of the document.
	pub fn pin_count(&self) -> usize {
		self.main.pin_count() + self.supportive.as_ref().map_or(0, |unit| unit.pin_count())
	}
}
