//! Parser engine seam.
//!
//! The backend treats parsing as an opaque capability: a [`ParseEngine`]
//! turns source text into a [`ParsedUnit`], and all queries go through that
//! unit. Engines run on worker threads, so both traits require `Send + Sync`.

mod lexical;

use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;

use codemodel_protocol::{Diagnostic, ProjectPart, SourceLocation, SourceRange, TokenInfo};

pub use self::lexical::LexicalEngine;
use crate::error::EngineError;
use crate::registry::UnsavedFilesSnapshot;

/// Shared, immutable parse result.
pub type ParsedHandle = Arc<dyn ParsedUnit>;

/// Everything a parse may read.
#[derive(Debug, Clone, Copy)]
pub struct ParseInput<'a> {
	pub path: &'a Path,
	pub project_part: &'a ProjectPart,
	pub unsaved: &'a UnsavedFilesSnapshot,
}

impl ParseInput<'_> {
	/// Content of the file being parsed: the unsaved buffer if there is one,
	/// the file on disk otherwise.
	pub fn source(&self) -> Result<Cow<'_, str>, EngineError> {
		if let Some(content) = self.unsaved.get(self.path) {
			return Ok(Cow::Borrowed(&content[..]));
		}
		std::fs::read_to_string(self.path)
			.map(Cow::Owned)
			.map_err(|source| EngineError::Read {
				path: self.path.to_path_buf(),
				source,
			})
	}
}

/// References to one symbol.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolReferences {
	pub locations: Vec<SourceLocation>,
	pub is_local_variable: bool,
}

pub trait ParseEngine: Send + Sync {
	fn parse(&self, input: &ParseInput<'_>) -> Result<ParsedHandle, EngineError>;
}

/// A parsed source file.
pub trait ParsedUnit: Send + Sync {
	/// Parses `input` again, reusing whatever this unit can offer.
	fn reparse(&self, input: &ParseInput<'_>) -> Result<ParsedHandle, EngineError>;

	fn diagnostics(&self) -> Vec<Diagnostic>;

	fn token_infos(&self) -> Vec<TokenInfo>;

	fn references(&self, at: SourceLocation) -> SymbolReferences;

	/// Hover text of the symbol at `at`, if it resolves.
	fn tool_tip(&self, at: SourceLocation) -> Option<String>;

	/// Range of the declared name of the symbol at `at`.
	fn follow_symbol(&self, at: SourceLocation) -> Option<SourceRange>;
}
