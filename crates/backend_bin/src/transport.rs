//! Newline-delimited JSON over stdio.
//!
//! Each line carries one externally tagged [`Inbound`] or [`Outbound`] value.

use codemodel_backend::protocol::{Inbound, Outbound};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

/// Decodes inbound messages until EOF or until the backend stops listening.
///
/// Lines that fail to decode are logged and skipped.
pub async fn read_messages<R>(reader: R, tx: mpsc::UnboundedSender<Inbound>) -> anyhow::Result<()>
where
	R: AsyncBufRead + Unpin,
{
	let mut lines = reader.lines();
	while let Some(line) = lines.next_line().await? {
		let line = line.trim();
		if line.is_empty() {
			continue;
		}
		match serde_json::from_str::<Inbound>(line) {
			Ok(message) => {
				if tx.send(message).is_err() {
					break;
				}
			}
			Err(err) => tracing::warn!(error = %err, "transport.decode_failed"),
		}
	}
	tracing::debug!("transport.reader.closed");
	Ok(())
}

/// Encodes outbound messages until every sender is gone.
pub async fn write_messages<W>(mut writer: W, mut rx: mpsc::UnboundedReceiver<Outbound>) -> anyhow::Result<()>
where
	W: AsyncWrite + Unpin,
{
	while let Some(message) = rx.recv().await {
		let mut line = serde_json::to_vec(&message)?;
		line.push(b'\n');
		writer.write_all(&line).await?;
		writer.flush().await?;
	}
	Ok(())
}
