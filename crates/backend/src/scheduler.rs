//! Job queue and dispatch.
//!
//! [`Scheduler`] admits job submissions, orders them by [`Priority`] band and
//! admission sequence, and hands prepared work to a bounded [`WorkerPool`].
//! Worker results come back over a channel and are finalized on the control
//! task, in completion order.
//!
//! # Exclusivity
//!
//! At most one job per `(unit, job type)` is queued, and at most one is
//! prepared or running. A newer submission for a queued key supersedes the
//! older one silently. A key that is running keeps its successor queued until
//! the running job completes.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use codemodel_workers::{TaskClass, WorkerPool, join_error_panic_message};
use rustc_hash::{FxHashMap, FxHashSet};
use tokio::sync::mpsc;

use crate::config::BackendConfig;
use crate::context::bind;
use crate::dispatcher::ClientDispatcher;
use crate::engine::ParseEngine;
use crate::error::BindError;
use crate::jobs::{Finalize, Job, JobId, JobOutput, JobRequest, JobSubmission, JobType, Prepare, Priority, run};
use crate::registry::{Registry, UnitId};

type ExclusiveKey = (UnitId, JobType);

/// A finished worker run, waiting to be finalized.
#[derive(Debug)]
pub struct Completion {
	id: JobId,
	/// Panic message when the worker body panicked.
	outcome: Result<JobOutput, String>,
}

impl Completion {
	pub fn id(&self) -> JobId {
		self.id
	}
}

/// Lifetime counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
	pub admitted: u64,
	/// Submissions that failed to bind.
	pub rejected: u64,
	pub superseded: u64,
	/// Queued jobs dropped by document cancellation, and suspensions cancelled
	/// or revoked by a later interactive request.
	pub cancelled: u64,
	pub dropped_outdated: u64,
	pub aborted: u64,
	pub finalized: u64,
	pub discarded: u64,
	pub panicked: u64,
}

pub struct Scheduler {
	engine: Arc<dyn ParseEngine>,
	pool: WorkerPool,
	/// Jobs waiting for dispatch, in dispatch order.
	queue: BTreeMap<(Priority, JobId), Job>,
	/// Queued job per exclusivity key.
	pending: FxHashMap<ExclusiveKey, JobId>,
	/// Keys with a prepared or running job.
	running: FxHashSet<ExclusiveKey>,
	in_flight: FxHashMap<JobId, Job>,
	next_id: u64,
	completion_tx: mpsc::UnboundedSender<Completion>,
	completion_rx: mpsc::UnboundedReceiver<Completion>,
	stats: SchedulerStats,
}

impl Scheduler {
	pub fn new(engine: Arc<dyn ParseEngine>, config: &BackendConfig) -> Self {
		let (completion_tx, completion_rx) = mpsc::unbounded_channel();
		Self {
			engine,
			pool: WorkerPool::new(config.max_concurrent_jobs, config.interactive_reserve),
			queue: BTreeMap::new(),
			pending: FxHashMap::default(),
			running: FxHashSet::default(),
			in_flight: FxHashMap::default(),
			next_id: 0,
			completion_tx,
			completion_rx,
			stats: SchedulerStats::default(),
		}
	}

	/// Admits a submission.
	///
	/// A submission that fails to bind is answered with `RequestFailed` when it
	/// carries a ticket. An interactive request also cancels a queued
	/// suspension of the same unit, or revokes one already running.
	pub fn enqueue(
		&mut self,
		submission: JobSubmission,
		registry: &Registry,
		dispatcher: &mut ClientDispatcher,
	) -> Result<JobId, BindError> {
		let id = JobId(self.next_id);
		self.next_id += 1;
		let ticket = submission.ticket;
		let kind = submission.kind.job_type();

		let admitted = JobRequest::admit(id, submission, registry)
			.and_then(|request| bind(registry, &request).map(|context| Job::new(request, context)));
		let job = match admitted {
			Ok(job) => job,
			Err(err) => {
				self.stats.rejected += 1;
				tracing::debug!(job = %id, kind = kind.as_str(), error = %err, "scheduler.enqueue.reject");
				if let Some(ticket) = ticket {
					dispatcher.request_failed(ticket, err.to_string());
				}
				return Err(err);
			}
		};

		let key = (job.unit_id(), kind);
		if kind.is_interactive() {
			self.cancel_suspension(key.0);
		}
		if let Some(old) = self.remove_queued(&key) {
			self.stats.superseded += 1;
			tracing::trace!(job = %id, superseded = %old.id(), kind = kind.as_str(), "scheduler.enqueue.supersede");
		}

		tracing::trace!(job = %id, unit = %key.0, kind = kind.as_str(), "scheduler.enqueue");
		self.pending.insert(key, id);
		self.queue.insert((kind.priority(), id), job);
		self.stats.admitted += 1;
		Ok(id)
	}

	/// Dispatches queued jobs while the pool has room. Returns how many
	/// started running.
	///
	/// Jobs whose key is running stay queued. Jobs already outdated or whose
	/// resources are gone are dropped here without reaching a worker.
	pub fn process(&mut self, registry: &mut Registry) -> usize {
		let mut dispatched = 0;
		let keys: Vec<(Priority, JobId)> = self.queue.keys().copied().collect();

		for queue_key in keys {
			let Some(job) = self.queue.get(&queue_key) else {
				continue;
			};
			let key = (job.unit_id(), job.job_type());
			if self.running.contains(&key) {
				continue;
			}
			let class = key.1.class();
			let Some(permit) = self.pool.try_acquire(class) else {
				if class == TaskClass::Interactive {
					break;
				}
				continue;
			};

			let Some(mut job) = self.queue.remove(&queue_key) else {
				continue;
			};
			self.pending.remove(&key);

			let work = match job.prepare(registry) {
				Prepare::Ready(work) => work,
				Prepare::Outdated => {
					self.stats.dropped_outdated += 1;
					continue;
				}
				Prepare::Aborted(_) => {
					self.stats.aborted += 1;
					continue;
				}
			};

			let id = job.id();
			let engine = Arc::clone(&self.engine);
			let handle = permit.spawn_blocking(move || run(work, engine.as_ref()));
			let tx = self.completion_tx.clone();
			codemodel_workers::spawn(class, async move {
				let outcome = handle.await.map_err(|err| {
					join_error_panic_message(err).unwrap_or_else(|| "worker task cancelled".to_string())
				});
				let _ = tx.send(Completion { id, outcome });
			});

			tracing::trace!(job = %id, kind = key.1.as_str(), class = class.as_str(), "scheduler.dispatch");
			self.running.insert(key);
			self.in_flight.insert(id, job);
			dispatched += 1;
		}

		dispatched
	}

	/// Waits for the next worker result. Returns `None` at once when nothing
	/// is in flight.
	pub async fn next_completion(&mut self) -> Option<Completion> {
		if self.in_flight.is_empty() {
			return None;
		}
		self.completion_rx.recv().await
	}

	pub fn try_next_completion(&mut self) -> Option<Completion> {
		self.completion_rx.try_recv().ok()
	}

	/// Finalizes a worker result on the control task.
	///
	/// A panicked run is finalized with the kind's empty result.
	pub fn complete(
		&mut self,
		completion: Completion,
		registry: &mut Registry,
		dispatcher: &mut ClientDispatcher,
	) -> Option<Finalize> {
		let Completion { id, outcome } = completion;
		let Some(mut job) = self.in_flight.remove(&id) else {
			tracing::warn!(job = %id, "scheduler.complete.unknown_job");
			return None;
		};
		self.running.remove(&(job.unit_id(), job.job_type()));

		let output = match outcome {
			Ok(output) => output,
			Err(panic) => {
				self.stats.panicked += 1;
				tracing::error!(job = %id, kind = job.job_type().as_str(), panic = %panic, "job.run.panic");
				JobOutput::empty(&job.request().kind)
			}
		};

		let finalized = job.finalize(output, registry, dispatcher);
		match finalized {
			Finalize::Applied => self.stats.finalized += 1,
			Finalize::Discarded => self.stats.discarded += 1,
			Finalize::Aborted => self.stats.aborted += 1,
		}
		Some(finalized)
	}

	/// Drops every queued job of the document at `path`. In-flight jobs run
	/// to completion and are discarded by staleness.
	pub fn cancel_document(&mut self, path: &Path) -> usize {
		let doomed: Vec<(Priority, JobId)> = self
			.queue
			.iter()
			.filter(|(_, job)| job.request().path == path)
			.map(|(key, _)| *key)
			.collect();
		for queue_key in &doomed {
			if let Some(job) = self.queue.remove(queue_key) {
				self.pending.remove(&(job.unit_id(), job.job_type()));
			}
		}
		if !doomed.is_empty() {
			self.stats.cancelled += doomed.len() as u64;
			tracing::debug!(path = %path.display(), cancelled = doomed.len(), "scheduler.cancel_document");
		}
		doomed.len()
	}

	/// Whether any queued or in-flight job targets `path`.
	pub fn has_jobs_for(&self, path: &Path) -> bool {
		self.queue
			.values()
			.chain(self.in_flight.values())
			.any(|job| job.request().path == path)
	}

	pub fn is_idle(&self) -> bool {
		self.queue.is_empty() && self.in_flight.is_empty()
	}

	pub fn queued_len(&self) -> usize {
		self.queue.len()
	}

	pub fn in_flight_len(&self) -> usize {
		self.in_flight.len()
	}

	pub fn stats(&self) -> SchedulerStats {
		self.stats
	}

	pub fn pool(&self) -> &WorkerPool {
		&self.pool
	}

	/// Drops a queued suspension of `unit` and revokes a running one.
	fn cancel_suspension(&mut self, unit: UnitId) {
		if self.remove_queued(&(unit, JobType::SuspendDocument)).is_some() {
			self.stats.cancelled += 1;
			tracing::debug!(unit = %unit, "scheduler.suspend.cancel");
		}
		let running = self
			.in_flight
			.values_mut()
			.find(|job| job.unit_id() == unit && job.job_type() == JobType::SuspendDocument && !job.is_revoked());
		if let Some(job) = running {
			job.revoke_suspension();
			self.stats.cancelled += 1;
			tracing::debug!(unit = %unit, job = %job.id(), "scheduler.suspend.revoke");
		}
	}

	fn remove_queued(&mut self, key: &ExclusiveKey) -> Option<Job> {
		let id = self.pending.remove(key)?;
		self.queue.remove(&(key.1.priority(), id))
	}
}
