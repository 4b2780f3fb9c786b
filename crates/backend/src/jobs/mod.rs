//! Jobs and their three phases.
//!
//! A job is prepared and finalized on the control task, which owns the
//! [`Registry`]. Only [`run`] executes on a worker thread, and it sees nothing
//! but the owned [`PreparedWork`] captured at dispatch.
//!
//! ```text
//! Created --prepare--> Prepared --run--> Completed --finalize--> Finalized
//!    |                                                              ^
//!    +--(resources gone)--> Aborted     (outdated at dispatch) -----+
//! ```

mod request;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use codemodel_protocol::{Diagnostic, SourceRange, Ticket, TokenInfo};

pub use self::request::{JobId, JobKind, JobRequest, JobSubmission, JobType, Priority};
use crate::context::{Context, bind};
use crate::dispatcher::ClientDispatcher;
use crate::engine::{ParseEngine, ParseInput, ParsedHandle, SymbolReferences};
use crate::error::BindError;
use crate::registry::{ParseOutcome, ProjectPartEntry, Registry, ResourceVersions, TranslationUnit, UnitId, UnsavedFilesSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
	Created,
	Prepared,
	Completed,
	Finalized,
	Aborted,
}

/// Result of [`Job::prepare`].
pub enum Prepare {
	/// Work is ready to hand to a worker.
	Ready(PreparedWork),
	/// The registry moved past the request before it was dispatched.
	Outdated,
	/// A resource the request names is gone.
	Aborted(BindError),
}

/// Result of [`Job::finalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finalize {
	/// Parse installed and results delivered.
	Applied,
	/// The request went stale while running. Nothing was applied.
	Discarded,
	/// The job was never prepared.
	Aborted,
}

/// Parse a worker starts from.
pub enum BaseParse {
	/// Parsed at exactly the request's versions. `adopt` is set when the
	/// handle comes from the sibling unit and should be installed into this one.
	Fresh { handle: ParsedHandle, adopt: bool },
	/// An older parse to reparse from.
	Stale(ParsedHandle),
	/// Nothing parsed yet.
	Missing,
}

impl fmt::Debug for BaseParse {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Fresh { adopt, .. } => f.debug_struct("Fresh").field("adopt", adopt).finish_non_exhaustive(),
			Self::Stale(_) => f.write_str("Stale"),
			Self::Missing => f.write_str("Missing"),
		}
	}
}

/// Everything [`run`] needs, captured by value at dispatch.
#[derive(Debug)]
pub struct PreparedWork {
	job: JobId,
	kind: JobKind,
	path: PathBuf,
	project_part: Arc<ProjectPartEntry>,
	unsaved: Arc<UnsavedFilesSnapshot>,
	versions: ResourceVersions,
	base: BaseParse,
}

impl PreparedWork {
	pub fn job(&self) -> JobId {
		self.job
	}

	pub fn base(&self) -> &BaseParse {
		&self.base
	}
}

/// Kind-specific result of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobResult {
	/// Parse-only jobs.
	Silent,
	Annotations {
		diagnostics: Vec<Diagnostic>,
		token_infos: Vec<TokenInfo>,
	},
	References(SymbolReferences),
	ToolTip(String),
	FollowSymbol(Option<SourceRange>),
	Suspended,
}

impl JobResult {
	/// What a client receives when the run failed.
	pub fn empty(kind: &JobKind) -> Self {
		match kind {
			JobKind::CreateInitialDocumentPreamble
			| JobKind::ParseSupportiveTranslationUnit
			| JobKind::ReparseSupportiveTranslationUnit => Self::Silent,
			JobKind::RequestAnnotations => Self::Annotations {
				diagnostics: Vec::new(),
				token_infos: Vec::new(),
			},
			JobKind::RequestReferences { .. } => Self::References(SymbolReferences::default()),
			JobKind::RequestToolTip { .. } => Self::ToolTip(String::new()),
			JobKind::RequestFollowSymbol { .. } => Self::FollowSymbol(None),
			JobKind::SuspendDocument => Self::Suspended,
		}
	}
}

/// What a worker hands back to the control task.
#[derive(Debug)]
pub struct JobOutput {
	/// A parse to install into the job's unit.
	pub parse: Option<ParseOutcome>,
	pub result: JobResult,
}

impl JobOutput {
	pub fn empty(kind: &JobKind) -> Self {
		Self {
			parse: None,
			result: JobResult::empty(kind),
		}
	}
}

/// An admitted request and the context it holds.
#[derive(Debug)]
pub struct Job {
	request: JobRequest,
	context: Option<Context>,
	state: JobState,
	/// Set on a running suspension once an interactive request for the same
	/// unit was admitted. The suspension then finalizes without effect.
	revoked: bool,
}

impl Job {
	pub fn new(request: JobRequest, context: Context) -> Self {
		Self {
			request,
			context: Some(context),
			state: JobState::Created,
			revoked: false,
		}
	}

	pub fn request(&self) -> &JobRequest {
		&self.request
	}

	pub fn id(&self) -> JobId {
		self.request.id
	}

	pub fn job_type(&self) -> JobType {
		self.request.job_type()
	}

	pub fn unit_id(&self) -> UnitId {
		self.request.unit
	}

	pub fn state(&self) -> JobState {
		self.state
	}

	/// Keeps an in-flight [`JobKind::SuspendDocument`] from releasing a unit a
	/// client is waiting on.
	pub fn revoke_suspension(&mut self) {
		debug_assert_eq!(self.request.kind, JobKind::SuspendDocument);
		self.revoked = true;
	}

	pub fn is_revoked(&self) -> bool {
		self.revoked
	}

	/// Re-binds the context and captures the work for a worker.
	///
	/// Resumes a suspended unit for every kind but
	/// [`JobKind::SuspendDocument`].
	pub fn prepare(&mut self, registry: &mut Registry) -> Prepare {
		debug_assert_eq!(self.state, JobState::Created);
		let request = &self.request;
		self.context = None;

		let context = match bind(registry, request) {
			Ok(context) => context,
			Err(err) => {
				tracing::debug!(job = %request.id, path = %request.path.display(), error = %err, "job.prepare.abort");
				self.state = JobState::Aborted;
				return Prepare::Aborted(err);
			}
		};
		if context.is_outdated(registry) {
			tracing::trace!(job = %request.id, path = %request.path.display(), "job.prepare.outdated");
			self.state = JobState::Finalized;
			return Prepare::Outdated;
		}

		let unit = Arc::clone(context.unit());
		let base = if request.kind == JobKind::SuspendDocument {
			BaseParse::Missing
		} else {
			if unit.is_suspended() && registry.set_is_suspended(&request.path, request.role, false).unwrap_or(false) {
				tracing::debug!(job = %request.id, path = %request.path.display(), "job.prepare.resume");
			}
			base_parse(registry, &unit, &request.versions)
		};

		let work = PreparedWork {
			job: request.id,
			kind: request.kind.clone(),
			path: request.path.clone(),
			project_part: Arc::clone(context.project_part()),
			unsaved: Arc::clone(context.unsaved_files()),
			versions: request.versions,
			base,
		};
		tracing::trace!(job = %request.id, kind = request.job_type().as_str(), base = ?work.base, "job.prepare");
		self.context = Some(context);
		self.state = JobState::Prepared;
		Prepare::Ready(work)
	}

	/// Applies a run's output on the control task.
	///
	/// An outdated context discards the output whole. Otherwise the parse is
	/// installed, ticketed results go to every client, and a suspension takes
	/// effect unless it was revoked. The context, and with it the unit pin, is
	/// released either way.
	pub fn finalize(&mut self, output: JobOutput, registry: &mut Registry, dispatcher: &mut ClientDispatcher) -> Finalize {
		let Some(context) = self.context.take() else {
			self.state = JobState::Aborted;
			return Finalize::Aborted;
		};
		self.state = JobState::Completed;
		let request = &self.request;

		if context.is_outdated(registry) {
			tracing::debug!(
				job = %request.id,
				kind = request.job_type().as_str(),
				path = %request.path.display(),
				"job.finalize.discard"
			);
			self.state = JobState::Finalized;
			return Finalize::Discarded;
		}

		if let Some(parse) = output.parse {
			let revision = parse.versions.revision;
			if context.unit().install(parse) {
				tracing::trace!(job = %request.id, unit = %context.unit_id(), revision, "job.finalize.install");
			}
		}

		match output.result {
			JobResult::Silent => {}
			JobResult::Suspended if self.revoked => {
				tracing::debug!(job = %request.id, path = %request.path.display(), "job.finalize.suspend_revoked");
				self.state = JobState::Finalized;
				return Finalize::Discarded;
			}
			JobResult::Suspended => {
				if registry.set_is_suspended(&request.path, request.role, true).unwrap_or(false) {
					tracing::debug!(job = %request.id, path = %request.path.display(), "job.finalize.suspend");
				}
			}
			result => match request.ticket {
				Some(ticket) => deliver(dispatcher, &request.path, ticket, result),
				None => tracing::warn!(job = %request.id, "job.finalize.no_ticket"),
			},
		}

		self.state = JobState::Finalized;
		Finalize::Applied
	}
}

fn base_parse(registry: &Registry, unit: &TranslationUnit, versions: &ResourceVersions) -> BaseParse {
	if let Some(handle) = unit.fresh_handle(versions) {
		return BaseParse::Fresh { handle, adopt: false };
	}
	if let Some((role, handle)) = registry.freshest_handle(unit.path(), versions)
		&& role != unit.role()
	{
		return BaseParse::Fresh { handle, adopt: true };
	}
	match unit.handle() {
		Some((handle, _)) => BaseParse::Stale(handle),
		None => BaseParse::Missing,
	}
}

fn deliver(dispatcher: &mut ClientDispatcher, path: &Path, ticket: Ticket, result: JobResult) {
	match result {
		JobResult::Annotations { diagnostics, token_infos } => dispatcher.annotations(path, diagnostics, token_infos, ticket),
		JobResult::References(references) => dispatcher.references(path, references, ticket),
		JobResult::ToolTip(text) => dispatcher.tool_tip(path, text, ticket),
		JobResult::FollowSymbol(range) => dispatcher.follow_symbol(path, range, ticket),
		JobResult::Silent | JobResult::Suspended => {}
	}
}

/// Worker body: parses if needed, then computes the kind's result.
///
/// Engine failures are logged and turn into [`JobResult::empty`].
pub fn run(work: PreparedWork, engine: &dyn ParseEngine) -> JobOutput {
	let PreparedWork {
		job,
		kind,
		path,
		project_part,
		unsaved,
		versions,
		base,
	} = work;
	if kind == JobKind::SuspendDocument {
		return JobOutput {
			parse: None,
			result: JobResult::Suspended,
		};
	}

	let input = ParseInput {
		path: &path,
		project_part: &project_part.part,
		unsaved: &unsaved,
	};
	let parsed = match base {
		BaseParse::Fresh { handle, adopt } => Ok((handle, adopt)),
		BaseParse::Stale(previous) => previous.reparse(&input).map(|handle| (handle, true)),
		BaseParse::Missing => engine.parse(&input).map(|handle| (handle, true)),
	};
	let (handle, install) = match parsed {
		Ok(parsed) => parsed,
		Err(err) => {
			tracing::warn!(job = %job, path = %path.display(), error = %err, "job.run.engine_error");
			return JobOutput::empty(&kind);
		}
	};

	let result = match &kind {
		JobKind::CreateInitialDocumentPreamble
		| JobKind::ParseSupportiveTranslationUnit
		| JobKind::ReparseSupportiveTranslationUnit
		| JobKind::SuspendDocument => JobResult::Silent,
		JobKind::RequestAnnotations => JobResult::Annotations {
			diagnostics: handle.diagnostics(),
			token_infos: handle.token_infos(),
		},
		JobKind::RequestReferences { at } => JobResult::References(handle.references(*at)),
		JobKind::RequestToolTip { at, text_codec_name } => {
			let text = handle.tool_tip(*at).unwrap_or_default();
			JobResult::ToolTip(encode_for_codec(text, text_codec_name))
		}
		JobKind::RequestFollowSymbol { at } => JobResult::FollowSymbol(handle.follow_symbol(*at)),
	};
	tracing::trace!(job = %job, kind = kind.job_type().as_str(), parsed = install, "job.run");

	JobOutput {
		parse: install.then(|| ParseOutcome { handle, versions }),
		result,
	}
}

/// Restricts `text` to what the client's codec can represent.
///
/// Unknown codecs fall back to UTF-8.
fn encode_for_codec(text: String, codec: &str) -> String {
	let limit = match codec.to_ascii_lowercase().as_str() {
		"" | "utf-8" | "utf8" => return text,
		"latin1" | "latin-1" | "iso-8859-1" => 0xff,
		"ascii" | "us-ascii" => 0x7f,
		_ => {
			tracing::debug!(codec, "job.tool_tip.unknown_codec");
			return text;
		}
	};
	text.chars().map(|c| if u32::from(c) <= limit { c } else { '?' }).collect()
}
