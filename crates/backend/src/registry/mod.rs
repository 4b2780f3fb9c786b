//! Registry of project parts, unsaved files and documents.
//!
//! The registry is owned by the backend control loop and mutated only through
//! `&mut self`. Jobs never hold a reference into it: they hold `Arc` clones of
//! the entries they bound to, plus a [`UnitPin`] that keeps their translation
//! unit from being removed.
//!
//! Every resource carries a version so a job can tell whether the state it
//! was admitted against is still current (see [`ResourceVersions`]).

mod document;
mod project_parts;
mod unit;
mod unsaved_files;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use codemodel_protocol::{ProjectPart, ProjectPartId};
use rustc_hash::FxHashMap;

pub use self::document::Document;
pub use self::project_parts::ProjectPartEntry;
use self::project_parts::ProjectParts;
pub use self::unit::{ParseOutcome, TranslationUnit, UnitId, UnitPin, UnitRole};
pub use self::unsaved_files::UnsavedFilesSnapshot;
use self::unsaved_files::UnsavedFiles;
use crate::engine::ParsedHandle;
use crate::error::RegistryError;

/// Versions of the three resources a parse depends on.
///
/// Ordering is lexicographic. Since every component comes from a monotonic
/// clock, a snapshot taken later never compares below an earlier one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceVersions {
	/// Document revision.
	pub revision: u64,
	/// Version of the unsaved files table.
	pub unsaved_version: u64,
	/// Last-change version of the document's project part.
	pub part_version: u64,
}

#[derive(Debug, Default)]
pub struct Registry {
	parts: ProjectParts,
	unsaved: UnsavedFiles,
	documents: FxHashMap<PathBuf, Document>,
	next_unit: u64,
}

impl Registry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Stores each part by id, replacing previous entries and bumping versions.
	pub fn create_or_update_project_parts(&mut self, parts: impl IntoIterator<Item = ProjectPart>) {
		for part in parts {
			let id = part.id.clone();
			let version = self.parts.upsert(part);
			tracing::debug!(project_part = %id, version, "registry.project_part.update");
		}
	}

	/// Returns how many of `ids` were registered.
	pub fn remove_project_parts<'a>(&mut self, ids: impl IntoIterator<Item = &'a ProjectPartId>) -> usize {
		let mut removed = 0;
		for id in ids {
			if self.parts.remove(id) {
				tracing::debug!(project_part = %id, "registry.project_part.remove");
				removed += 1;
			}
		}
		removed
	}

	pub fn project_part(&self, id: &ProjectPartId) -> Result<&Arc<ProjectPartEntry>, RegistryError> {
		self.parts
			.get(id)
			.ok_or_else(|| RegistryError::UnknownProjectPartReferenced(id.clone()))
	}

	pub fn project_part_count(&self) -> usize {
		self.parts.len()
	}

	/// Registers the `role` unit of the document at `path`.
	///
	/// A [`UnitRole::Main`] registration creates the document itself. A
	/// [`UnitRole::Supportive`] one attaches to an existing open document.
	pub fn create_document(
		&mut self,
		path: &Path,
		role: UnitRole,
		project_part: &ProjectPartId,
	) -> Result<&Arc<TranslationUnit>, RegistryError> {
		self.project_part(project_part)?;

		let unit_id = UnitId(self.next_unit);
		match role {
			UnitRole::Main => {
				if self.documents.contains_key(path) {
					return Err(RegistryError::DocumentAlreadyExists {
						path: path.to_path_buf(),
						role,
					});
				}
				self.next_unit += 1;
				let document = Document {
					path: path.to_path_buf(),
					project_part: project_part.clone(),
					revision: 1,
					closed: false,
					main: TranslationUnit::new(unit_id, path.to_path_buf(), role),
					supportive: None,
				};
				let document = self.documents.entry(path.to_path_buf()).or_insert(document);
				tracing::debug!(path = %path.display(), unit = %unit_id, "registry.document.create");
				Ok(&document.main)
			}
			UnitRole::Supportive => {
				let document = match self.documents.get_mut(path) {
					Some(document) if !document.closed => document,
					_ => {
						return Err(RegistryError::DocumentDoesNotExist {
							path: path.to_path_buf(),
							role: UnitRole::Main,
						});
					}
				};
				if document.supportive.is_some() {
					return Err(RegistryError::DocumentAlreadyExists {
						path: path.to_path_buf(),
						role,
					});
				}
				self.next_unit += 1;
				tracing::debug!(path = %path.display(), unit = %unit_id, "registry.document.attach_supportive");
				let unit: &Arc<TranslationUnit> = document
					.supportive
					.insert(TranslationUnit::new(unit_id, path.to_path_buf(), role));
				Ok(unit)
			}
		}
	}

	/// Looks up a document that has a unit for `role`.
	pub fn document(&self, path: &Path, role: UnitRole) -> Result<&Document, RegistryError> {
		self.documents
			.get(path)
			.filter(|document| document.unit(role).is_some())
			.ok_or_else(|| RegistryError::DocumentDoesNotExist {
				path: path.to_path_buf(),
				role,
			})
	}

	pub fn documents(&self) -> impl Iterator<Item = &Document> {
		self.documents.values()
	}

	pub fn document_count(&self) -> usize {
		self.documents.len()
	}

	/// Removes a unit, or the whole document when `role` is [`UnitRole::Main`].
	///
	/// Fails with [`RegistryError::DocumentPinned`] while any job context holds
	/// an affected unit. The caller decides when to retry.
	pub fn remove_document(&mut self, path: &Path, role: UnitRole) -> Result<(), RegistryError> {
		let document = self.documents.get_mut(path).ok_or_else(|| RegistryError::DocumentDoesNotExist {
			path: path.to_path_buf(),
			role,
		})?;

		match role {
			UnitRole::Main => {
				let pins = document.pin_count();
				if pins > 0 {
					return Err(RegistryError::DocumentPinned {
						path: path.to_path_buf(),
						pins,
					});
				}
				self.documents.remove(path);
				tracing::debug!(path = %path.display(), "registry.document.remove");
			}
			UnitRole::Supportive => {
				let Some(unit) = &document.supportive else {
					return Err(RegistryError::DocumentDoesNotExist {
						path: path.to_path_buf(),
						role,
					});
				};
				let pins = unit.pin_count();
				if pins > 0 {
					return Err(RegistryError::DocumentPinned {
						path: path.to_path_buf(),
						pins,
					});
				}
				document.supportive = None;
				tracing::debug!(path = %path.display(), "registry.document.detach_supportive");
			}
		}
		Ok(())
	}

	/// Suspending releases the parsed handle. Resuming clears the flag so the
	/// next job rebuilds it. The unit keeps its identity either way.
	///
	/// Returns whether the flag changed.
	pub fn set_is_suspended(&mut self, path: &Path, role: UnitRole, suspended: bool) -> Result<bool, RegistryError> {
		let document = self.document(path, role)?;
		let changed = document.unit(role).is_some_and(|unit| unit.set_suspended(suspended));
		if changed {
			tracing::debug!(path = %path.display(), role = role.as_str(), suspended, "registry.document.suspend");
		}
		Ok(changed)
	}

	/// Marks a document closed. Contexts bound to it become outdated at once.
	pub fn close_document(&mut self, path: &Path) -> Result<(), RegistryError> {
		let document = self.documents.get_mut(path).ok_or_else(|| RegistryError::DocumentDoesNotExist {
			path: path.to_path_buf(),
			role: UnitRole::Main,
		})?;
		document.closed = true;
		Ok(())
	}

	/// Stores in-memory content for `path`.
	///
	/// Bumps the unsaved files version and, when `path` is a registered
	/// document, its revision.
	pub fn update_unsaved_file(&mut self, path: PathBuf, content: impl Into<Arc<str>>) -> u64 {
		self.bump_revision(&path);
		let version = self.unsaved.update(path, content.into());
		tracing::trace!(version, "registry.unsaved.update");
		version
	}

	/// Drops in-memory content for `path`. Returns the new unsaved files
	/// version, or `None` when there was nothing to drop.
	pub fn remove_unsaved_file(&mut self, path: &Path) -> Option<u64> {
		let version = self.unsaved.remove(path)?;
		self.bump_revision(path);
		tracing::trace!(version, "registry.unsaved.remove");
		Some(version)
	}

	pub fn unsaved_files(&self) -> Arc<UnsavedFilesSnapshot> {
		self.unsaved.snapshot()
	}

	pub fn unsaved_version(&self) -> u64 {
		self.unsaved.version()
	}

	/// Current versions of everything the `role` unit of `path` depends on.
	pub fn versions(&self, path: &Path, role: UnitRole) -> Result<ResourceVersions, RegistryError> {
		let document = self.document(path, role)?;
		let part = self.project_part(&document.project_part)?;
		Ok(ResourceVersions {
			revision: document.revision,
			unsaved_version: self.unsaved.version(),
			part_version: part.version,
		})
	}

	/// Returns a handle of any unit of `path` parsed at exactly `versions`,
	/// preferring the main unit.
	pub fn freshest_handle(&self, path: &Path, versions: &ResourceVersions) -> Option<(UnitRole, ParsedHandle)> {
		let document = self.documents.get(path)?;
		[UnitRole::Main, UnitRole::Supportive].into_iter().find_map(|role| {
			let handle = document.unit(role)?.fresh_handle(versions)?;
			Some((role, handle))
		})
	}

	fn bump_revision(&mut self, path: &Path) {
		if let Some(document) = self.documents.get_mut(path) {
			document.revision += 1;
			tracing::trace!(path = %path.display(), revision = document.revision, "registry.document.revision");
		}
	}
}

#[cfg(test)]
mod tests;
