//! Code-model backend binary.
//!
//! Speaks newline-delimited JSON on stdin/stdout with one editor front end.
//! Logs go to stderr, or to a file when `CODEMODEL_LOG_DIR` is set.

mod transport;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use codemodel_backend::{Backend, BackendConfig};
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Backend command line arguments.
#[derive(Parser, Debug)]
#[command(name = "codemodel-backend")]
#[command(about = "Out-of-process code-model backend")]
struct Args {
	/// Config file [default: <config dir>/codemodel/backend.toml]
	#[arg(short, long, value_name = "PATH")]
	config: Option<PathBuf>,

	/// Upper bound of jobs running at once
	#[arg(long, value_name = "N")]
	max_jobs: Option<usize>,

	/// Heartbeat period in milliseconds, 0 disables it
	#[arg(long, value_name = "MS")]
	alive_interval_ms: Option<u64>,

	/// Verbose logging
	#[arg(short, long)]
	verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	setup_tracing(args.verbose);

	let mut config = BackendConfig::load_or_default(args.config.as_deref()).context("failed to load backend config")?;
	if let Some(max_jobs) = args.max_jobs {
		config.max_concurrent_jobs = max_jobs;
	}
	if let Some(alive_interval_ms) = args.alive_interval_ms {
		config.alive_interval_ms = alive_interval_ms;
	}
	info!(?config, "starting codemodel-backend");

	let mut backend = Backend::new(config);
	let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
	backend.add_client(outbound_tx);
	let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

	let shutdown = CancellationToken::new();
	tokio::spawn({
		let shutdown = shutdown.clone();
		async move {
			if tokio::signal::ctrl_c().await.is_ok() {
				info!("interrupted");
				shutdown.cancel();
			}
		}
	});

	let reader = tokio::spawn(transport::read_messages(BufReader::new(tokio::io::stdin()), inbound_tx));
	let writer = tokio::spawn(transport::write_messages(tokio::io::stdout(), outbound_rx));

	backend.run(inbound_rx, shutdown).await;

	writer.await.context("stdout writer task failed")??;
	reader.abort();
	info!("codemodel-backend stopped");
	Ok(())
}

fn setup_tracing(verbose: bool) {
	use std::fs::OpenOptions;

	use tracing_subscriber::EnvFilter;
	use tracing_subscriber::prelude::*;

	let filter = || {
		EnvFilter::try_from_default_env().unwrap_or_else(|_| {
			if verbose {
				EnvFilter::new("codemodel_backend=trace,codemodel_workers=trace,debug")
			} else {
				EnvFilter::new("codemodel_backend=debug,info")
			}
		})
	};

	if let Some(log_dir) = std::env::var("CODEMODEL_LOG_DIR").ok().map(PathBuf::from)
		&& std::fs::create_dir_all(&log_dir).is_ok()
	{
		let log_path = log_dir.join(format!("codemodel-backend.{}.log", std::process::id()));

		if let Ok(file) = OpenOptions::new().create(true).append(true).open(&log_path) {
			let file_layer = tracing_subscriber::fmt::layer()
				.with_writer(file)
				.with_ansi(false)
				.with_target(true);

			tracing_subscriber::registry().with(filter()).with(file_layer).init();

			tracing::info!(path = ?log_path, "backend tracing initialized");
			return;
		}
	}

	// stdout carries the transport
	tracing_subscriber::fmt()
		.with_env_filter(filter())
		.with_writer(std::io::stderr)
		.init();
}
