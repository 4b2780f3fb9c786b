//! Classified spawning on the caller's Tokio runtime.
//!
//! Both functions panic outside a runtime, exactly like [`tokio::spawn`].
//! The task runs inside a `worker` span carrying its class, so events logged
//! by a job body are attributed to interactive or background work.

use std::future::Future;

use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::TaskClass;

/// Spawns an async task tagged with `class`.
pub fn spawn<F>(class: TaskClass, fut: F) -> JoinHandle<F::Output>
where
	F: Future + Send + 'static,
	F::Output: Send + 'static,
{
	let span = tracing::trace_span!("worker", class = class.as_str());
	tokio::spawn(fut.instrument(span))
}

/// Runs `f` on the blocking pool, tagged with `class`.
pub fn spawn_blocking<F, R>(class: TaskClass, f: F) -> JoinHandle<R>
where
	F: FnOnce() -> R + Send + 'static,
	R: Send + 'static,
{
	let span = tracing::trace_span!("worker.blocking", class = class.as_str());
	tokio::task::spawn_blocking(move || span.in_scope(f))
}

#[cfg(test)]
mod tests {
	use tokio::runtime::{Handle, RuntimeFlavor};

	use super::*;

	#[tokio::test]
	async fn spawned_work_runs_on_the_current_runtime() {
		let flavor = spawn(TaskClass::Background, async { Handle::current().runtime_flavor() })
			.await
			.unwrap();
		assert_eq!(flavor, RuntimeFlavor::CurrentThread);

		let flavor = spawn_blocking(TaskClass::Interactive, || Handle::current().runtime_flavor())
			.await
			.unwrap();
		assert_eq!(flavor, RuntimeFlavor::CurrentThread);
	}

	#[test]
	#[should_panic]
	fn spawning_outside_a_runtime_panics() {
		let _ = spawn_blocking(TaskClass::Background, || ());
	}
}
