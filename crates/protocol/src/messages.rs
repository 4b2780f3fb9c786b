//! Messages flowing between an editor front end and the backend.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::{Diagnostic, ProjectPart, ProjectPartId, SourceLocation, SourceRange, Ticket, TokenInfo};

/// A message sent by a client to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Inbound {
	/// Create or replace project parts by id.
	UpdateProjectParts {
		/// Parts to store.
		parts: Vec<ProjectPart>,
	},
	/// Forget project parts.
	RemoveProjectParts {
		/// Ids of the parts to drop.
		ids: Vec<ProjectPartId>,
	},
	/// Start tracking a source file as a document.
	RegisterTranslationUnit {
		/// Absolute path of the file.
		path: PathBuf,
		/// Compilation configuration of the file.
		project_part: ProjectPartId,
		/// In-memory content, if the editor buffer differs from disk.
		#[serde(default)]
		content: Option<String>,
	},
	/// Stop tracking a document.
	UnregisterTranslationUnit {
		/// Path passed at registration.
		path: PathBuf,
	},
	/// Replace the in-memory content of a file.
	UpdateUnsavedFile {
		/// File path.
		path: PathBuf,
		/// New content.
		content: String,
	},
	/// Drop the in-memory content of a file so the disk content applies again.
	RemoveUnsavedFile {
		/// File path.
		path: PathBuf,
	},
	/// Ask for diagnostics and highlighting of a document.
	RequestAnnotations {
		/// Document path.
		path: PathBuf,
		/// Correlation ticket.
		ticket: Ticket,
	},
	/// Ask for every reference to the symbol under a position.
	RequestReferences {
		/// Document path.
		path: PathBuf,
		/// Cursor position.
		location: SourceLocation,
		/// Correlation ticket.
		ticket: Ticket,
	},
	/// Ask for hover text of the symbol under a position.
	RequestToolTip {
		/// Document path.
		path: PathBuf,
		/// Cursor position.
		location: SourceLocation,
		/// Name of the text codec the editor uses for the file (for example `UTF-8`).
		text_codec_name: String,
		/// Correlation ticket.
		ticket: Ticket,
	},
	/// Ask for the declaration of the symbol under a position.
	RequestFollowSymbol {
		/// Document path.
		path: PathBuf,
		/// Cursor position.
		location: SourceLocation,
		/// Correlation ticket.
		ticket: Ticket,
	},
	/// Release the parsed state of a document while keeping it registered.
	SuspendTranslationUnit {
		/// Document path.
		path: PathBuf,
	},
	/// Report which documents the editor currently shows.
	DocumentVisibilityChanged {
		/// Document with keyboard focus, if any.
		current: Option<PathBuf>,
		/// Every document shown in some view.
		visible: Vec<PathBuf>,
	},
	/// Connectivity check answered with [`Outbound::Echo`].
	Echo {
		/// Opaque text returned unchanged.
		message: String,
	},
	/// Stop the backend.
	End,
}

/// A message sent by the backend to every client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outbound {
	/// Diagnostics and highlighting of a document.
	Annotations {
		/// Document path.
		path: PathBuf,
		/// Problems found in the document.
		diagnostics: Vec<Diagnostic>,
		/// Highlighting of every token.
		token_infos: Vec<TokenInfo>,
		/// Ticket of the request.
		ticket: Ticket,
	},
	/// References to a symbol.
	References {
		/// Document path.
		path: PathBuf,
		/// Start of every reference, including the declaration.
		locations: Vec<SourceLocation>,
		/// Whether the symbol is a variable local to a function body.
		is_local_variable: bool,
		/// Ticket of the request.
		ticket: Ticket,
	},
	/// Hover text of a symbol. Empty when nothing is known about it.
	ToolTip {
		/// Document path.
		path: PathBuf,
		/// Text encoded as requested.
		text: String,
		/// Ticket of the request.
		ticket: Ticket,
	},
	/// Declaration of a symbol.
	FollowSymbol {
		/// Document path.
		path: PathBuf,
		/// Range of the declared name, if the symbol was resolved.
		range: Option<SourceRange>,
		/// Ticket of the request.
		ticket: Ticket,
	},
	/// A request could not be bound to a document or project part.
	RequestFailed {
		/// Ticket of the failed request.
		ticket: Ticket,
		/// Why binding failed.
		reason: String,
	},
	/// Periodic heartbeat.
	Alive,
	/// Answer to [`Inbound::Echo`].
	Echo {
		/// Text from the inbound message.
		message: String,
	},
}

impl Outbound {
	/// Returns the ticket this message answers, if any.
	pub fn ticket(&self) -> Option<Ticket> {
		match self {
			Self::Annotations { ticket, .. }
			| Self::References { ticket, .. }
			| Self::ToolTip { ticket, .. }
			| Self::FollowSymbol { ticket, .. }
			| Self::RequestFailed { ticket, .. } => Some(*ticket),
			Self::Alive | Self::Echo { .. } => None,
		}
	}
}
