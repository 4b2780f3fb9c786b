//! Fan-out of job results to connected clients.

use std::path::Path;

use codemodel_protocol::{Diagnostic, Outbound, SourceRange, Ticket, TokenInfo};
use tokio::sync::mpsc;

use crate::engine::SymbolReferences;

/// Outbound channel of one client. Sends never block.
pub type ClientSink = mpsc::UnboundedSender<Outbound>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub u64);

/// Delivers every outbound message to all registered clients.
///
/// Delivery is fire-and-forget. A client whose channel is closed is dropped
/// on the first failed send.
#[derive(Debug, Default)]
pub struct ClientDispatcher {
	clients: Vec<(ClientId, ClientSink)>,
	next_id: u64,
}

impl ClientDispatcher {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add_client(&mut self, sink: ClientSink) -> ClientId {
		let id = ClientId(self.next_id);
		self.next_id += 1;
		self.clients.push((id, sink));
		tracing::debug!(client = id.0, clients = self.clients.len(), "dispatcher.client.add");
		id
	}

	/// Returns `false` if `id` was not registered.
	pub fn remove_client(&mut self, id: ClientId) -> bool {
		let before = self.clients.len();
		self.clients.retain(|(client, _)| *client != id);
		before != self.clients.len()
	}

	pub fn client_count(&self) -> usize {
		self.clients.len()
	}

	pub fn annotations(&mut self, path: &Path, diagnostics: Vec<Diagnostic>, token_infos: Vec<TokenInfo>, ticket: Ticket) {
		self.broadcast(Outbound::Annotations {
			path: path.to_path_buf(),
			diagnostics,
			token_infos,
			ticket,
		});
	}

	pub fn references(&mut self, path: &Path, references: SymbolReferences, ticket: Ticket) {
		self.broadcast(Outbound::References {
			path: path.to_path_buf(),
			locations: references.locations,
			is_local_variable: references.is_local_variable,
			ticket,
		});
	}

	pub fn tool_tip(&mut self, path: &Path, text: String, ticket: Ticket) {
		self.broadcast(Outbound::ToolTip {
			path: path.to_path_buf(),
			text,
			ticket,
		});
	}

	pub fn follow_symbol(&mut self, path: &Path, range: Option<SourceRange>, ticket: Ticket) {
		self.broadcast(Outbound::FollowSymbol {
			path: path.to_path_buf(),
			range,
			ticket,
		});
	}

	pub fn request_failed(&mut self, ticket: Ticket, reason: String) {
		self.broadcast(Outbound::RequestFailed { ticket, reason });
	}

	pub fn alive(&mut self) {
		self.broadcast(Outbound::Alive);
	}

	pub fn echo(&mut self, message: String) {
		self.broadcast(Outbound::Echo { message });
	}

	fn broadcast(&mut self, message: Outbound) {
		self.clients.retain(|(id, sink)| {
			if sink.send(message.clone()).is_ok() {
				return true;
			}
			tracing::debug!(client = id.0, "dispatcher.client.closed");
			false
		});
	}
}
