//! Job scheduling and translation-unit lifecycle for the code-model backend.
//!
//! An editor front end registers source files and asks questions about them
//! (annotations, references, tooltips, definitions). Each question becomes a
//! job that is bound to the document it names, parsed on a worker, and answered
//! only if nothing it depended on changed in the meantime.
//!
//! - [`registry`]: project parts, unsaved buffers, documents and their units.
//! - [`context`]: binding a request to live registry state and pinning its unit.
//! - [`jobs`]: the prepare, run and finalize phases of every job kind.
//! - [`scheduler`]: priority queue, exclusivity and the bounded worker pool.
//! - [`dispatcher`]: fan-out of answers to connected clients.
//! - [`server`]: the control loop tying them together.

pub mod config;
pub mod context;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod jobs;
pub mod registry;
pub mod scheduler;
pub mod server;

pub use codemodel_protocol as protocol;
pub use config::BackendConfig;
pub use dispatcher::{ClientDispatcher, ClientId, ClientSink};
pub use engine::{LexicalEngine, ParseEngine, ParseInput, ParsedHandle, ParsedUnit, SymbolReferences};
pub use error::{BindError, ConfigError, EngineError, RegistryError};
pub use server::Backend;
