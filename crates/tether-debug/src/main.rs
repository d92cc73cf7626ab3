use std::io::{self, BufReader};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use parking_lot::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tether_debug::config::CONFIG_FILE;
use tether_debug::host::{serve, LineEventWriter};
use tether_debug::locator::ProjectLocator;
use tether_debug::{
    DebugConfig, DebuggerRegistry, EventDispatcher, RemoteDebuggerFactory, SessionManager,
};

#[derive(Debug, Parser)]
#[command(
    name = "tether-debug",
    version,
    about = "Debug session host speaking JSON lines on stdio"
)]
struct Args {
    /// Configuration file.
    #[arg(long, value_name = "FILE", default_value = CONFIG_FILE)]
    config: PathBuf,
    /// Log filter, overriding RUST_LOG and the config file.
    #[arg(long, value_name = "FILTER")]
    log: Option<String>,
}

const SHUTDOWN_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = DebugConfig::load(&args.config)?;

    let filter = match &args.log {
        Some(directives) => EnvFilter::try_new(directives).context("invalid --log filter")?,
        None => EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.log_filter))
            .context("invalid log filter")?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut registry = DebuggerRegistry::new();
    registry.register(Arc::new(RemoteDebuggerFactory::new(Arc::new(
        ProjectLocator::new(config.projects.clone()),
    ))));

    let output = Arc::new(Mutex::new(io::stdout()));
    let dispatcher = EventDispatcher::new().context("failed to start event dispatcher")?;
    dispatcher.add_listener(Arc::new(LineEventWriter::new(Arc::clone(&output))));

    info!("tether-debug ready; debugger kinds: {:?}", registry.kinds());
    let manager = SessionManager::new(registry, dispatcher.clone(), config.connect_options());
    serve(&manager, BufReader::new(io::stdin()), &*output)?;
    for session in manager.sessions() {
        if let Err(err) = manager.disconnect(&session.id) {
            warn!("failed to disconnect session {}: {err}", session.id);
        }
    }
    if !dispatcher.flush(SHUTDOWN_FLUSH_TIMEOUT) {
        warn!("exiting with undelivered session events");
    }
    Ok(())
}
