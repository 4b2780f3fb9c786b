//! Backend control loop.
//!
//! [`Backend`] owns the registry, the scheduler and the client dispatcher.
//! Every inbound message, worker completion and heartbeat is handled on the
//! one task that runs [`Backend::run`], so registry mutation needs no locks.
//! After each event the loop removes drained documents and dispatches queued
//! jobs.
//!
//! # Document removal
//!
//! Unregistering closes a document at once: new requests fail to bind and
//! in-flight results are discarded as outdated. The document itself is only
//! removed once no job context pins it. A registration for a path that is
//! still draining waits until the removal went through.

mod residency;

use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use codemodel_protocol::{Inbound, ProjectPartId};
use rustc_hash::{FxHashMap, FxHashSet};
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use self::residency::Residency;
use crate::config::BackendConfig;
use crate::dispatcher::{ClientDispatcher, ClientId, ClientSink};
use crate::engine::{LexicalEngine, ParseEngine};
use crate::error::RegistryError;
use crate::jobs::{JobKind, JobSubmission};
use crate::registry::{Registry, UnitRole};
use crate::scheduler::{Completion, Scheduler};

#[derive(Debug)]
struct DeferredRegistration {
	project_part: ProjectPartId,
	content: Option<String>,
}

enum Event {
	Shutdown,
	Inbound(Option<Inbound>),
	Completion(Completion),
	Alive,
}

pub struct Backend {
	config: BackendConfig,
	registry: Registry,
	scheduler: Scheduler,
	dispatcher: ClientDispatcher,
	/// Unregistered documents waiting for their pins to drain.
	closing: FxHashSet<PathBuf>,
	deferred: FxHashMap<PathBuf, DeferredRegistration>,
	residency: Residency,
}

impl Backend {
	/// Creates a backend parsing with the built-in [`LexicalEngine`].
	pub fn new(config: BackendConfig) -> Self {
		Self::with_engine(config, Arc::new(LexicalEngine))
	}

	pub fn with_engine(config: BackendConfig, engine: Arc<dyn ParseEngine>) -> Self {
		let config = config.normalized();
		Self {
			scheduler: Scheduler::new(engine, &config),
			config,
			registry: Registry::new(),
			dispatcher: ClientDispatcher::new(),
			closing: FxHashSet::default(),
			deferred: FxHashMap::default(),
			residency: Residency::default(),
		}
	}

	pub fn config(&self) -> &BackendConfig {
		&self.config
	}

	pub fn registry(&self) -> &Registry {
		&self.registry
	}

	pub fn scheduler(&self) -> &Scheduler {
		&self.scheduler
	}

	pub fn add_client(&mut self, sink: ClientSink) -> ClientId {
		self.dispatcher.add_client(sink)
	}

	pub fn remove_client(&mut self, id: ClientId) -> bool {
		self.dispatcher.remove_client(id)
	}

	/// Whether `path` was unregistered and still waits for removal.
	pub fn is_closing(&self, path: &Path) -> bool {
		self.closing.contains(path)
	}

	/// Applies one inbound message, then dispatches whatever became runnable.
	///
	/// Returns [`ControlFlow::Break`] for [`Inbound::End`].
	pub fn handle(&mut self, message: Inbound) -> ControlFlow<()> {
		match message {
			Inbound::UpdateProjectParts { parts } => self.registry.create_or_update_project_parts(parts),
			Inbound::RemoveProjectParts { ids } => {
				self.registry.remove_project_parts(&ids);
			}
			Inbound::RegisterTranslationUnit {
				path,
				project_part,
				content,
			} => {
				if self.closing.contains(&path) {
					tracing::debug!(path = %path.display(), "backend.register.defer");
					self.deferred.insert(path, DeferredRegistration { project_part, content });
				} else {
					self.register(path, &project_part, content);
				}
			}
			Inbound::UnregisterTranslationUnit { path } => self.unregister(path),
			Inbound::UpdateUnsavedFile { path, content } => {
				self.registry.update_unsaved_file(path.clone(), content);
				self.parse_supportive(path);
			}
			Inbound::RemoveUnsavedFile { path } => {
				if self.registry.remove_unsaved_file(&path).is_some() {
					self.parse_supportive(path);
				}
			}
			Inbound::RequestAnnotations { path, ticket } => {
				self.submit(JobSubmission::new(JobKind::RequestAnnotations, path).with_ticket(ticket));
			}
			Inbound::RequestReferences { path, location, ticket } => {
				self.submit(JobSubmission::new(JobKind::RequestReferences { at: location }, path).with_ticket(ticket));
			}
			Inbound::RequestToolTip {
				path,
				location,
				text_codec_name,
				ticket,
			} => {
				let kind = JobKind::RequestToolTip {
					at: location,
					text_codec_name,
				};
				self.submit(JobSubmission::new(kind, path).with_ticket(ticket));
			}
			Inbound::RequestFollowSymbol { path, location, ticket } => {
				self.submit(JobSubmission::new(JobKind::RequestFollowSymbol { at: location }, path).with_ticket(ticket));
			}
			Inbound::SuspendTranslationUnit { path } => {
				self.submit(JobSubmission::new(JobKind::SuspendDocument, path));
			}
			Inbound::DocumentVisibilityChanged { current, visible } => self.visibility_changed(current, visible),
			Inbound::Echo { message } => self.dispatcher.echo(message),
			Inbound::End => return ControlFlow::Break(()),
		}
		self.pump();
		ControlFlow::Continue(())
	}

	/// Finalizes a worker result, then dispatches whatever became runnable.
	pub fn complete(&mut self, completion: Completion) {
		self.scheduler.complete(completion, &mut self.registry, &mut self.dispatcher);
		self.pump();
	}

	/// Waits for and finalizes one worker result. Returns `false` when
	/// nothing is in flight.
	pub async fn complete_next(&mut self) -> bool {
		let Some(completion) = self.scheduler.next_completion().await else {
			return false;
		};
		self.complete(completion);
		true
	}

	/// Runs every queued job to completion.
	pub async fn settle(&mut self) {
		self.pump();
		while self.complete_next().await {}
	}

	/// Serves `inbound` until [`Inbound::End`], a closed channel, or
	/// `shutdown`. Jobs still in flight are abandoned.
	pub async fn run(mut self, mut inbound: mpsc::UnboundedReceiver<Inbound>, shutdown: CancellationToken) {
		let mut alive = self.config.alive_interval().map(|period| {
			let mut interval = tokio::time::interval_at(Instant::now() + period, period);
			interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
			interval
		});
		tracing::info!(
			max_concurrent_jobs = self.scheduler.pool().capacity(),
			interactive_reserve = self.scheduler.pool().reserve(),
			"backend.start"
		);

		loop {
			let event = tokio::select! {
				biased;
				() = shutdown.cancelled() => Event::Shutdown,
				Some(completion) = self.scheduler.next_completion() => Event::Completion(completion),
				message = inbound.recv() => Event::Inbound(message),
				() = next_tick(&mut alive) => Event::Alive,
			};

			match event {
				Event::Shutdown | Event::Inbound(None) => break,
				Event::Inbound(Some(message)) => {
					if self.handle(message).is_break() {
						break;
					}
				}
				Event::Completion(completion) => self.complete(completion),
				Event::Alive => self.dispatcher.alive(),
			}
		}

		tracing::info!(
			documents = self.registry.document_count(),
			in_flight = self.scheduler.in_flight_len(),
			"backend.stop"
		);
	}

	fn submit(&mut self, submission: JobSubmission) {
		let _ = self.scheduler.enqueue(submission, &self.registry, &mut self.dispatcher);
	}

	fn register(&mut self, path: PathBuf, project_part: &ProjectPartId, content: Option<String>) {
		if let Err(err) = self.registry.create_document(&path, UnitRole::Main, project_part) {
			tracing::warn!(path = %path.display(), error = %err, "backend.register.failed");
			return;
		}
		if let Some(content) = content {
			self.registry.update_unsaved_file(path.clone(), content);
		}
		self.residency.touch(&path);
		self.submit(JobSubmission::new(JobKind::CreateInitialDocumentPreamble, path));
	}

	fn unregister(&mut self, path: PathBuf) {
		self.deferred.remove(&path);
		if let Err(err) = self.registry.close_document(&path) {
			tracing::debug!(path = %path.display(), error = %err, "backend.unregister.unknown");
			return;
		}
		let cancelled = self.scheduler.cancel_document(&path);
		self.residency.forget(&path);
		tracing::debug!(path = %path.display(), cancelled, "backend.unregister");
		self.closing.insert(path);
	}

	/// Schedules a background parse of the supportive unit after an edit.
	fn parse_supportive(&mut self, path: PathBuf) {
		let Ok(document) = self.registry.document(&path, UnitRole::Main) else {
			return;
		};
		if document.is_closed() {
			return;
		}
		let kind = match document.supportive() {
			Some(unit) if unit.has_handle() => JobKind::ReparseSupportiveTranslationUnit,
			Some(_) => JobKind::ParseSupportiveTranslationUnit,
			None => {
				let project_part = document.project_part().clone();
				if let Err(err) = self.registry.create_document(&path, UnitRole::Supportive, &project_part) {
					tracing::warn!(path = %path.display(), error = %err, "backend.supportive.create_failed");
					return;
				}
				JobKind::ParseSupportiveTranslationUnit
			}
		};
		self.submit(JobSubmission::new(kind, path));
	}

	/// Records visible documents as most recent and suspends hidden ones
	/// beyond the residency limit.
	fn visibility_changed(&mut self, current: Option<PathBuf>, visible: Vec<PathBuf>) {
		let shown: Vec<&Path> = visible.iter().chain(current.iter()).map(PathBuf::as_path).collect();
		for path in &shown {
			let open = self
				.registry
				.document(path, UnitRole::Main)
				.is_ok_and(|document| !document.is_closed());
			if open {
				self.residency.touch(path);
			}
		}

		let keep: FxHashSet<&Path> = shown.into_iter().collect();
		let evicted = self.residency.evict(self.config.max_resident_documents, &keep);
		for path in evicted {
			tracing::debug!(path = %path.display(), resident = self.residency.len(), "backend.residency.suspend");
			self.submit(JobSubmission::new(JobKind::SuspendDocument, path));
		}
	}

	fn pump(&mut self) {
		self.sweep_closing();
		self.scheduler.process(&mut self.registry);
	}

	/// Removes closed documents no context pins anymore and replays
	/// registrations that waited for them.
	fn sweep_closing(&mut self) {
		if self.closing.is_empty() {
			return;
		}
		let closing: Vec<PathBuf> = self.closing.iter().cloned().collect();
		for path in closing {
			match self.registry.remove_document(&path, UnitRole::Main) {
				Err(RegistryError::DocumentPinned { pins, .. }) => {
					assert!(
						self.scheduler.has_jobs_for(&path),
						"{} is pinned by {pins} context(s) but no job holds one",
						path.display()
					);
					continue;
				}
				Ok(()) | Err(_) => {}
			}
			self.closing.remove(&path);
			tracing::debug!(path = %path.display(), "backend.document.removed");

			if let Some(DeferredRegistration { project_part, content }) = self.deferred.remove(&path) {
				self.register(path, &project_part, content);
			}
		}
	}
}

async fn next_tick(alive: &mut Option<Interval>) {
	match alive {
		Some(interval) => {
			interval.tick().await;
		}
		None => std::future::pending().await,
	}
}
