use std::fmt;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::ResourceVersions;
use crate::engine::ParsedHandle;

/// Identity of a translation unit. Never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitId(pub u64);

impl fmt::Display for UnitId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "tu{}", self.0)
	}
}

/// Which parse of a document a unit holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitRole {
	/// The unit that answers client requests.
	Main,
	/// A secondary unit reparsed in the background after edits, so the main
	/// unit can adopt an up-to-date parse without waiting.
	Supportive,
}

impl UnitRole {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Main => "main",
			Self::Supportive => "supportive",
		}
	}
}

impl fmt::Display for UnitRole {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A finished parse and the resource versions it was computed from.
#[derive(Clone)]
pub struct ParseOutcome {
	pub handle: ParsedHandle,
	pub versions: ResourceVersions,
}

impl fmt::Debug for ParseOutcome {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ParseOutcome").field("versions", &self.versions).finish_non_exhaustive()
	}
}

#[derive(Default)]
struct UnitState {
	handle: Option<ParsedHandle>,
	parsed: Option<ResourceVersions>,
	suspended: bool,
	generation: u64,
}

/// The parsed state of one document role.
///
/// Shared between the registry and job contexts through `Arc`. The registry
/// refuses to drop a unit while [`pin_count`](Self::pin_count) is non-zero.
/// Handles are immutable snapshots; workers receive clones and never lock.
pub struct TranslationUnit {
	id: UnitId,
	path: PathBuf,
	role: UnitRole,
	pins: AtomicUsize,
	state: Mutex<UnitState>,
}

impl fmt::Debug for TranslationUnit {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TranslationUnit")
			.field("id", &self.id)
			.field("path", &self.path)
			.field("role", &self.role)
			.field("pins", &self.pin_count())
			.finish_non_exhaustive()
	}
}

impl TranslationUnit {
	pub(crate) fn new(id: UnitId, path: PathBuf, role: UnitRole) -> Arc<Self> {
		Arc::new(Self {
			id,
			path,
			role,
			pins: AtomicUsize::new(0),
			state: Mutex::new(UnitState::default()),
		})
	}

	pub fn id(&self) -> UnitId {
		self.id
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn role(&self) -> UnitRole {
		self.role
	}

	/// Takes a pin that keeps the unit registered until the guard drops.
	pub fn pin(self: &Arc<Self>) -> UnitPin {
		self.pins.fetch_add(1, Ordering::AcqRel);
		UnitPin { unit: Arc::clone(self) }
	}

	pub fn pin_count(&self) -> usize {
		self.pins.load(Ordering::Acquire)
	}

	pub fn is_suspended(&self) -> bool {
		self.state.lock().suspended
	}

	pub fn has_handle(&self) -> bool {
		self.state.lock().handle.is_some()
	}

	/// Document revision of the installed parse.
	pub fn parsed_revision(&self) -> Option<u64> {
		self.state.lock().parsed.map(|versions| versions.revision)
	}

	/// Number of times a parse was installed into an empty unit.
	pub fn generation(&self) -> u64 {
		self.state.lock().generation
	}

	/// Returns the installed handle and the versions it was parsed at.
	pub fn handle(&self) -> Option<(ParsedHandle, ResourceVersions)> {
		let state = self.state.lock();
		Some((state.handle.clone()?, state.parsed?))
	}

	/// Returns the installed handle only if it was parsed at exactly `versions`.
	pub fn fresh_handle(&self, versions: &ResourceVersions) -> Option<ParsedHandle> {
		let state = self.state.lock();
		if state.parsed.as_ref() == Some(versions) {
			state.handle.clone()
		} else {
			None
		}
	}

	/// Records a finished parse unless the unit is suspended or already holds
	/// a parse of the same or newer versions.
	pub(crate) fn install(&self, outcome: ParseOutcome) -> bool {
		let mut state = self.state.lock();
		if state.suspended {
			return false;
		}
		if state.handle.is_some() && state.parsed.is_some_and(|current| current >= outcome.versions) {
			return false;
		}
		if state.handle.is_none() {
			state.generation += 1;
		}
		state.handle = Some(outcome.handle);
		state.parsed = Some(outcome.versions);
		true
	}

	/// Returns `false` when the unit already was in the requested state.
	pub(crate) fn set_suspended(&self, suspended: bool) -> bool {
		let mut state = self.state.lock();
		if state.suspended == suspended {
			return false;
		}
		state.suspended = suspended;
		state.parsed = None;
		if suspended {
			state.handle = None;
		}
		true
	}
}

/// RAII pin on a [`TranslationUnit`]. Dropping it releases the pin exactly once.
pub struct UnitPin {
	unit: Arc<TranslationUnit>,
}

impl UnitPin {
	pub fn unit(&self) -> &Arc<TranslationUnit> {
		&self.unit
	}
}

impl Deref for UnitPin {
	type Target = TranslationUnit;

	fn deref(&self) -> &TranslationUnit {
		&self.unit
	}
}

impl fmt::Debug for UnitPin {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("UnitPin").field(&self.unit.id).finish()
	}
}

impl Drop for UnitPin {
	fn drop(&mut self) {
		self.unit.pins.fetch_sub(1, Ordering::AcqRel);
	}
}
