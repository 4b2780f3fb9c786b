use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{TaskClass, WorkerPool};

#[test]
fn reserve_is_clamped_below_capacity() {
	let pool = WorkerPool::new(2, 5);
	assert_eq!(pool.capacity(), 2);
	assert_eq!(pool.reserve(), 1);

	let pool = WorkerPool::new(0, 0);
	assert_eq!(pool.capacity(), 1);
	assert_eq!(pool.reserve(), 0);
}

#[test]
fn background_work_leaves_reserve_for_interactive() {
	let pool = WorkerPool::new(3, 1);

	let a = pool.try_acquire(TaskClass::Background).expect("first background slot");
	let b = pool.try_acquire(TaskClass::Background).expect("second background slot");
	assert!(pool.try_acquire(TaskClass::Background).is_none(), "reserve must be kept");

	let c = pool.try_acquire(TaskClass::Interactive).expect("interactive uses reserve");
	assert_eq!(c.class(), TaskClass::Interactive);
	assert!(pool.try_acquire(TaskClass::Interactive).is_none());

	drop(a);
	assert_eq!(pool.available(), 1);
	assert!(pool.try_acquire(TaskClass::Background).is_none());
	drop((b, c));
	assert_eq!(pool.available(), 3);
}

#[tokio::test]
async fn permit_is_released_when_body_returns() {
	let pool = WorkerPool::new(1, 0);
	let runs = Arc::new(AtomicUsize::new(0));

	let permit = pool.try_acquire(TaskClass::Interactive).unwrap();
	assert_eq!(pool.available(), 0);

	let counter = runs.clone();
	let value = permit
		.spawn_blocking(move || {
			counter.fetch_add(1, Ordering::SeqCst);
			7
		})
		.await
		.unwrap();

	assert_eq!(value, 7);
	assert_eq!(runs.load(Ordering::SeqCst), 1);
	assert_eq!(pool.available(), 1);
}

#[tokio::test]
async fn permit_is_released_when_body_panics() {
	let pool = WorkerPool::new(1, 0);
	let permit = pool.try_acquire(TaskClass::Background).unwrap();

	let result = permit.spawn_blocking(|| -> u32 { panic!("worker body failed") }).await;

	assert!(result.unwrap_err().is_panic());
	assert_eq!(pool.available(), 1);
}
