//! Binding of job requests to live registry state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::BindError;
use crate::jobs::JobRequest;
use crate::registry::{ProjectPartEntry, Registry, ResourceVersions, TranslationUnit, UnitId, UnitPin, UnsavedFilesSnapshot};

/// A job request bound to the resources it works on.
///
/// Holding a context pins its translation unit. Dropping it releases the pin.
#[derive(Debug)]
pub struct Context {
	unit: UnitPin,
	project_part: Arc<ProjectPartEntry>,
	unsaved: Arc<UnsavedFilesSnapshot>,
	snapshot: ResourceVersions,
	bound: ResourceVersions,
	outdated: AtomicBool,
}

/// Binds `request` to the document, unit and project part it names.
pub fn bind(registry: &Registry, request: &JobRequest) -> Result<Context, BindError> {
	let no_document = || BindError::NoSuchDocument(request.path.clone());

	let document = registry
		.document(&request.path, request.role)
		.ok()
		.filter(|document| !document.is_closed())
		.ok_or_else(no_document)?;
	let unit = document
		.unit(request.role)
		.filter(|unit| unit.id() == request.unit)
		.ok_or_else(no_document)?;
	let project_part = registry
		.project_part(&request.project_part)
		.map_err(|_| BindError::NoSuchProjectPart(request.project_part.clone()))?;

	let unsaved = registry.unsaved_files();
	let bound = ResourceVersions {
		revision: document.revision(),
		unsaved_version: unsaved.version(),
		part_version: project_part.version,
	};

	Ok(Context {
		unit: unit.pin(),
		project_part: Arc::clone(project_part),
		unsaved,
		snapshot: request.versions,
		bound,
		outdated: AtomicBool::new(false),
	})
}

impl Context {
	pub fn unit(&self) -> &Arc<TranslationUnit> {
		self.unit.unit()
	}

	pub fn unit_id(&self) -> UnitId {
		self.unit.id()
	}

	pub fn project_part(&self) -> &Arc<ProjectPartEntry> {
		&self.project_part
	}

	pub fn unsaved_files(&self) -> &Arc<UnsavedFilesSnapshot> {
		&self.unsaved
	}

	/// Versions the request was admitted against.
	pub fn snapshot(&self) -> ResourceVersions {
		self.snapshot
	}

	/// Versions current when the context was bound.
	pub fn bound(&self) -> ResourceVersions {
		self.bound
	}

	/// Whether the registry moved past the request's snapshot.
	///
	/// True once the document is closed or removed, its unit was replaced, or
	/// any of the three versions changed. Once true it stays true, even if the
	/// registry later returns to matching versions.
	pub fn is_outdated(&self, registry: &Registry) -> bool {
		if self.outdated.load(Ordering::Acquire) {
			return true;
		}

		let path = self.unit.path();
		let role = self.unit.role();
		let current = registry
			.document(path, role)
			.ok()
			.filter(|document| !document.is_closed())
			.filter(|document| document.unit(role).is_some_and(|unit| unit.id() == self.unit.id()))
			.and_then(|_| registry.versions(path, role).ok());

		let outdated = current != Some(self.snapshot);
		if outdated {
			self.outdated.store(true, Ordering::Release);
		}
		outdated
	}
}
