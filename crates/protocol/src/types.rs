//! Identifiers and payload types carried by backend messages.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Client-chosen correlation number for a request.
///
/// Every answer carries the ticket of the request that produced it unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Ticket(pub u64);

impl fmt::Display for Ticket {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// Identifier of a project part (one compilation configuration).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProjectPartId(pub String);

impl ProjectPartId {
	/// Creates an identifier from any string-like value.
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	/// Returns the identifier as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for ProjectPartId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// A compilation configuration shared by a set of source files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectPart {
	/// Stable identifier.
	pub id: ProjectPartId,
	/// Compiler arguments, excluding defines and include paths.
	#[serde(default)]
	pub arguments: Vec<String>,
	/// Macro definitions in `NAME` or `NAME=VALUE` form.
	#[serde(default)]
	pub defines: Vec<String>,
	/// Header search paths.
	#[serde(default)]
	pub include_paths: Vec<PathBuf>,
}

impl ProjectPart {
	/// Creates a project part with no arguments, defines or include paths.
	pub fn new(id: impl Into<String>) -> Self {
		Self {
			id: ProjectPartId::new(id),
			arguments: Vec::new(),
			defines: Vec::new(),
			include_paths: Vec::new(),
		}
	}

	/// Returns the macro names defined by this part, without their values.
	pub fn define_names(&self) -> impl Iterator<Item = &str> {
		self.defines.iter().map(|define| define.split_once('=').map_or(define.as_str(), |(name, _)| name))
	}
}

/// A 1-based line/column position in a source file.
///
/// Columns count characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
	/// 1-based line.
	pub line: u32,
	/// 1-based column.
	pub column: u32,
}

impl SourceLocation {
	/// Creates a location from a 1-based line and column.
	pub const fn new(line: u32, column: u32) -> Self {
		Self { line, column }
	}
}

impl fmt::Display for SourceLocation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.line, self.column)
	}
}

/// A half-open range between two source locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRange {
	/// First character of the range.
	pub start: SourceLocation,
	/// Position one past the last character of the range.
	pub end: SourceLocation,
}

/// Severity of a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
	/// Informational note attached to another diagnostic.
	Note,
	/// Suspicious but valid source.
	Warning,
	/// Invalid source.
	Error,
}

/// A problem reported by the parser for a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
	/// How severe the problem is.
	pub severity: Severity,
	/// Where the problem was detected.
	pub location: SourceLocation,
	/// Human readable description.
	pub text: String,
}

/// Highlighting class of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
	/// Reserved word of the language.
	Keyword,
	/// Any other name.
	Identifier,
	/// Identifier naming a preprocessor macro.
	Macro,
	/// Numeric literal.
	Number,
	/// String or character literal.
	String,
	/// Line or block comment.
	Comment,
	/// Preprocessor directive line.
	Preprocessor,
	/// Operators, brackets and separators.
	Punctuation,
}

/// Highlighting information for one token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
	/// Location of the first character of the token.
	pub location: SourceLocation,
	/// Length of the token in characters.
	pub length: u32,
	/// Highlighting class.
	pub kind: TokenKind,
}
