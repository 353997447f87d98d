//! global-shortcuts-daemon: reports configured key combinations system-wide
//!
//! Installs the global keyboard hook, registers one tracker per configured
//! shortcut and writes every shortcut event to stdout as one JSON object
//! per line. Logs go to stderr.

use std::io::Write;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use global_shortcuts::config::Config;
use global_shortcuts::events::{fired_notifier, ShortcutEvent};
use global_shortcuts::lifecycle::ShutdownSignal;
use global_shortcuts::{CombinationTracker, InputHookService, TrackerOptions};

fn emit(event: &ShortcutEvent) {
    match serde_json::to_string(event) {
        Ok(line) => {
            let mut stdout = std::io::stdout().lock();
            if let Err(e) = writeln!(stdout, "{line}").and_then(|()| stdout.flush()) {
                warn!(?e, "failed to write event to stdout");
            }
        }
        Err(e) => error!(?e, %event, "failed to serialize event"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "global-shortcuts-daemon starting"
    );

    let config = Config::load()?;
    info!(
        path = ?config.shortcuts_path,
        shortcuts = config.shortcuts.len(),
        "configuration loaded"
    );

    let mut shutdown =
        ShutdownSignal::new().context("failed to register shutdown signal handlers")?;

    // Without the hook nothing can be detected
    let service = InputHookService::global().context("failed to install global keyboard hook")?;
    if let Some(hook) = service.hook() {
        emit(&ShortcutEvent::HookInstalled {
            backend: hook.backend().to_string(),
        });
    }

    // Hook thread -> main loop
    let (event_tx, mut event_rx) = mpsc::channel::<ShortcutEvent>(64);

    let mut trackers = Vec::with_capacity(config.shortcuts.len());
    for (shortcut, keys) in config.shortcuts {
        let options = TrackerOptions {
            suppress_on_fire: shortcut.suppress,
        };
        let tracker = CombinationTracker::with_options(
            &service,
            keys.clone(),
            options,
            fired_notifier(event_tx.clone(), shortcut.name.clone()),
        )
        .with_context(|| format!("failed to register shortcut {:?}", shortcut.name))?;

        emit(&ShortcutEvent::ShortcutRegistered {
            name: shortcut.name.clone(),
            keys,
        });
        trackers.push((shortcut.name, tracker));
    }
    drop(event_tx);

    info!("daemon initialized, entering main loop");

    tokio::select! {
        _ = async {
            while let Some(event) = event_rx.recv().await {
                info!(%event, "shortcut event");
                emit(&event);
            }
        } => {
            info!("event channel closed");
        }

        _ = shutdown.wait() => {
            info!("shutdown signal received");
        }
    }

    info!("shutting down...");

    for (name, tracker) in trackers {
        tracker.dispose();
        emit(&ShortcutEvent::ShortcutDisposed { name });
    }

    info!("global-shortcuts-daemon stopped");

    Ok(())
}
