use std::fmt;
use std::path::PathBuf;

use codemodel_protocol::{ProjectPartId, SourceLocation, Ticket};
use codemodel_workers::TaskClass;

use crate::error::{BindError, RegistryError};
use crate::registry::{Registry, ResourceVersions, UnitId, UnitRole};

/// Admission sequence number. Unique and increasing for the life of a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "job{}", self.0)
	}
}

/// What a job does, with its kind-specific payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobKind {
	/// First parse of a newly registered document.
	CreateInitialDocumentPreamble,
	/// First parse of the supportive unit after an edit.
	ParseSupportiveTranslationUnit,
	/// Later parses of the supportive unit.
	ReparseSupportiveTranslationUnit,
	RequestAnnotations,
	RequestReferences { at: SourceLocation },
	RequestToolTip { at: SourceLocation, text_codec_name: String },
	RequestFollowSymbol { at: SourceLocation },
	/// Release the parsed state of the main unit.
	SuspendDocument,
}

/// Payload-free discriminant of [`JobKind`]. Jobs of the same type on the same
/// unit are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobType {
	CreateInitialDocumentPreamble,
	ParseSupportiveTranslationUnit,
	ReparseSupportiveTranslationUnit,
	RequestAnnotations,
	RequestReferences,
	RequestToolTip,
	RequestFollowSymbol,
	SuspendDocument,
}

/// Dispatch band. Lower bands always dispatch first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
	/// Suspension and initial parses.
	Lifecycle,
	/// Requests a client waits on.
	Interactive,
	/// Background parses of supportive units.
	Supportive,
}

impl JobKind {
	pub fn job_type(&self) -> JobType {
		match self {
			Self::CreateInitialDocumentPreamble => JobType::CreateInitialDocumentPreamble,
			Self::ParseSupportiveTranslationUnit => JobType::ParseSupportiveTranslationUnit,
			Self::ReparseSupportiveTranslationUnit => JobType::ReparseSupportiveTranslationUnit,
			Self::RequestAnnotations => JobType::RequestAnnotations,
			Self::RequestReferences { .. } => JobType::RequestReferences,
			Self::RequestToolTip { .. } => JobType::RequestToolTip,
			Self::RequestFollowSymbol { .. } => JobType::RequestFollowSymbol,
			Self::SuspendDocument => JobType::SuspendDocument,
		}
	}
}

impl JobType {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::CreateInitialDocumentPreamble => "create_initial_document_preamble",
			Self::ParseSupportiveTranslationUnit => "parse_supportive_translation_unit",
			Self::ReparseSupportiveTranslationUnit => "reparse_supportive_translation_unit",
			Self::RequestAnnotations => "request_annotations",
			Self::RequestReferences => "request_references",
			Self::RequestToolTip => "request_tool_tip",
			Self::RequestFollowSymbol => "request_follow_symbol",
			Self::SuspendDocument => "suspend_document",
		}
	}

	pub const fn priority(self) -> Priority {
		match self {
			Self::SuspendDocument | Self::CreateInitialDocumentPreamble => Priority::Lifecycle,
			Self::RequestAnnotations | Self::RequestReferences | Self::RequestToolTip | Self::RequestFollowSymbol => {
				Priority::Interactive
			}
			Self::ParseSupportiveTranslationUnit | Self::ReparseSupportiveTranslationUnit => Priority::Supportive,
		}
	}

	pub const fn is_interactive(self) -> bool {
		matches!(self.priority(), Priority::Interactive)
	}

	/// Worker class used for the job body.
	pub const fn class(self) -> TaskClass {
		match self.priority() {
			Priority::Interactive => TaskClass::Interactive,
			Priority::Lifecycle | Priority::Supportive => TaskClass::Background,
		}
	}

	/// Unit role the job binds to.
	pub const fn role(self) -> UnitRole {
		match self {
			Self::ParseSupportiveTranslationUnit | Self::ReparseSupportiveTranslationUnit => UnitRole::Supportive,
			_ => UnitRole::Main,
		}
	}
}

/// A job as asked for, before admission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSubmission {
	pub kind: JobKind,
	pub path: PathBuf,
	pub ticket: Option<Ticket>,
}

impl JobSubmission {
	pub fn new(kind: JobKind, path: impl Into<PathBuf>) -> Self {
		Self {
			kind,
			path: path.into(),
			ticket: None,
		}
	}

	#[must_use]
	pub fn with_ticket(mut self, ticket: Ticket) -> Self {
		self.ticket = Some(ticket);
		self
	}
}

/// An admitted job request.
///
/// Immutable once created: `versions` is the registry state the request was
/// admitted against and is what staleness is judged by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
	pub id: JobId,
	pub kind: JobKind,
	pub path: PathBuf,
	pub role: UnitRole,
	/// Unit the request was admitted for. A re-registered document gets a new
	/// unit, which old requests never bind to.
	pub unit: UnitId,
	pub project_part: ProjectPartId,
	pub ticket: Option<Ticket>,
	pub versions: ResourceVersions,
}

impl JobRequest {
	/// Snapshots the registry state `submission` depends on.
	pub fn admit(id: JobId, submission: JobSubmission, registry: &Registry) -> Result<Self, BindError> {
		let JobSubmission { kind, path, ticket } = submission;
		let role = kind.job_type().role();

		let document = match registry.document(&path, role) {
			Ok(document) if !document.is_closed() => document,
			_ => return Err(BindError::NoSuchDocument(path)),
		};
		let Some(unit) = document.unit(role).map(|unit| unit.id()) else {
			return Err(BindError::NoSuchDocument(path));
		};
		let project_part = document.project_part().clone();
		let versions = registry.versions(&path, role).map_err(|err| match err {
			RegistryError::UnknownProjectPartReferenced(id) => BindError::NoSuchProjectPart(id),
			_ => BindError::NoSuchDocument(path.clone()),
		})?;

		Ok(Self {
			id,
			kind,
			path,
			role,
			unit,
			project_part,
			ticket,
			versions,
		})
	}

	pub fn job_type(&self) -> JobType {
		self.kind.job_type()
	}
}
