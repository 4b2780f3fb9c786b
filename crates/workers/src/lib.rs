//! Worker runtime primitives shared by the code-model backend.
//!
//! Work is tagged with a [`TaskClass`] for scheduling and observability.
//! Blocking job bodies run on Tokio's blocking pool behind a [`WorkerPool`]
//! that bounds concurrency and keeps a reserve of permits for interactive work.

mod class;
mod panic;
mod pool;
mod spawn;

pub use class::TaskClass;
pub use panic::{join_error_panic_message, panic_payload_message};
pub use pool::{PoolPermit, WorkerPool};
pub use spawn::{spawn, spawn_blocking};

#[cfg(test)]
mod pool_tests;
