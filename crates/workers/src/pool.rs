use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;

use crate::TaskClass;

/// Permit-bounded gate in front of the blocking pool.
///
/// At most `capacity` bodies run at once. The last `reserve` permits are only
/// handed to [`TaskClass::Interactive`] work so background parses can never
/// starve a request a client is waiting on.
#[derive(Debug, Clone)]
pub struct WorkerPool {
	permits: Arc<Semaphore>,
	capacity: usize,
	reserve: usize,
}

impl WorkerPool {
	/// Creates a pool. `capacity` is raised to 1 and `reserve` is clamped below
	/// `capacity` so background work always has at least one slot.
	pub fn new(capacity: usize, reserve: usize) -> Self {
		let capacity = capacity.max(1);
		let reserve = reserve.min(capacity - 1);
		Self {
			permits: Arc::new(Semaphore::new(capacity)),
			capacity,
			reserve,
		}
	}

	pub fn capacity(&self) -> usize {
		self.capacity
	}

	pub fn reserve(&self) -> usize {
		self.reserve
	}

	/// Number of permits currently free.
	pub fn available(&self) -> usize {
		self.permits.available_permits()
	}

	/// Takes a permit for work of `class` without waiting.
	///
	/// Returns `None` when the pool is saturated for that class.
	pub fn try_acquire(&self, class: TaskClass) -> Option<PoolPermit> {
		if class == TaskClass::Background && self.permits.available_permits() <= self.reserve {
			return None;
		}
		let permit = self.permits.clone().try_acquire_owned().ok()?;
		Some(PoolPermit { class, permit })
	}
}

/// A slot in a [`WorkerPool`], released when the work it carries finishes.
#[derive(Debug)]
pub struct PoolPermit {
	class: TaskClass,
	permit: OwnedSemaphorePermit,
}

impl PoolPermit {
	pub fn class(&self) -> TaskClass {
		self.class
	}

	/// Runs `f` on the blocking pool, holding the permit until `f` returns.
	pub fn spawn_blocking<F, R>(self, f: F) -> JoinHandle<R>
	where
		F: FnOnce() -> R + Send + 'static,
		R: Send + 'static,
	{
		let Self { class, permit } = self;
		crate::spawn_blocking(class, move || {
			let _permit = permit;
			f()
		})
	}
}
