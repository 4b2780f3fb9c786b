//! Shared harness for backend integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use codemodel_backend::protocol::{Inbound, Outbound, ProjectPart, ProjectPartId, SourceLocation, Ticket};
use codemodel_backend::{Backend, BackendConfig, EngineError, LexicalEngine, ParseEngine, ParseInput, ParsedHandle};
use tokio::sync::{Semaphore, mpsc};

/// Parse engine whose parses block until released.
///
/// Parsing itself is delegated to [`LexicalEngine`].
pub struct MockEngine {
	pub parse_count: AtomicUsize,
	gate: Semaphore,
	fail: AtomicBool,
	panic: AtomicBool,
}

impl MockEngine {
	pub fn new() -> Self {
		Self {
			parse_count: AtomicUsize::new(0),
			gate: Semaphore::new(0),
			fail: AtomicBool::new(false),
			panic: AtomicBool::new(false),
		}
	}

	/// An engine that never blocks.
	pub fn open() -> Self {
		let engine = Self::new();
		engine.proceed_all();
		engine
	}

	/// Allows one pending parse to proceed.
	pub fn proceed(&self) {
		self.gate.add_permits(1);
	}

	/// Lets every current and future parse through.
	pub fn proceed_all(&self) {
		self.gate.close();
	}

	pub fn set_failing(&self, fail: bool) {
		self.fail.store(fail, Ordering::SeqCst);
	}

	pub fn set_panicking(&self, panic: bool) {
		self.panic.store(panic, Ordering::SeqCst);
	}

	pub fn parses(&self) -> usize {
		self.parse_count.load(Ordering::SeqCst)
	}
}

impl ParseEngine for MockEngine {
	fn parse(&self, input: &ParseInput<'_>) -> Result<ParsedHandle, EngineError> {
		self.parse_count.fetch_add(1, Ordering::SeqCst);
		if let Ok(permit) = futures::executor::block_on(self.gate.acquire()) {
			permit.forget();
		}

		if self.panic.load(Ordering::SeqCst) {
			panic!("mock engine panic");
		}
		if self.fail.load(Ordering::SeqCst) {
			return Err(EngineError::Parse("mock failure".into()));
		}
		LexicalEngine.parse(input)
	}
}

/// Releases every blocked parse when dropped, so a failing test never leaves
/// worker threads parked on the gate.
pub struct EngineGuard(pub Arc<MockEngine>);

impl Drop for EngineGuard {
	fn drop(&mut self) {
		self.0.proceed_all();
	}
}

/// A connected client's receiving end.
pub struct TestClient {
	rx: mpsc::UnboundedReceiver<Outbound>,
}

impl TestClient {
	pub fn connect(backend: &mut Backend) -> Self {
		let (tx, rx) = mpsc::unbounded_channel();
		backend.add_client(tx);
		Self { rx }
	}

	/// Everything received so far.
	pub fn drain(&mut self) -> Vec<Outbound> {
		std::iter::from_fn(|| self.rx.try_recv().ok()).collect()
	}

	pub async fn next(&mut self) -> Option<Outbound> {
		self.rx.recv().await
	}
}

pub fn config() -> BackendConfig {
	BackendConfig {
		max_concurrent_jobs: 2,
		interactive_reserve: 1,
		alive_interval_ms: 0,
		max_resident_documents: 10,
	}
}

/// A backend with project part `core` and one connected client.
pub fn backend(engine: Arc<MockEngine>) -> (Backend, TestClient) {
	backend_with(engine, config())
}

pub fn backend_with(engine: Arc<MockEngine>, config: BackendConfig) -> (Backend, TestClient) {
	let mut backend = Backend::with_engine(config, engine);
	let client = TestClient::connect(&mut backend);
	send(&mut backend, Inbound::UpdateProjectParts {
		parts: vec![ProjectPart::new("core")],
	});
	(backend, client)
}

pub fn path(name: &str) -> PathBuf {
	PathBuf::from(format!("/project/{name}.c"))
}

pub fn at(line: u32, column: u32) -> SourceLocation {
	SourceLocation::new(line, column)
}

pub fn send(backend: &mut Backend, message: Inbound) {
	assert!(backend.handle(message).is_continue());
}

pub fn register(backend: &mut Backend, name: &str, content: &str) {
	send(backend, Inbound::RegisterTranslationUnit {
		path: path(name),
		project_part: ProjectPartId::new("core"),
		content: Some(content.into()),
	});
}

pub fn request_annotations(backend: &mut Backend, name: &str, ticket: u64) {
	send(backend, Inbound::RequestAnnotations {
		path: path(name),
		ticket: Ticket(ticket),
	});
}

pub fn request_tool_tip(backend: &mut Backend, name: &str, location: SourceLocation, ticket: u64) {
	send(backend, Inbound::RequestToolTip {
		path: path(name),
		location,
		text_codec_name: "utf-8".into(),
		ticket: Ticket(ticket),
	});
}

pub fn tickets(messages: &[Outbound]) -> Vec<Ticket> {
	messages.iter().filter_map(Outbound::ticket).collect()
}
