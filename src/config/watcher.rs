//! Configuration file watcher for live verbosity changes.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::{apply_env_overrides, load_config};
use crate::config::schema::{InstanceConfig, ProxyConfig, VerbosityHandle};

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<ProxyConfig>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<ProxyConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file in a background thread.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Config file change detected, reloading...");
                        match load_config(&path) {
                            Ok(mut new_config) => {
                                apply_env_overrides(&mut new_config.verbosity);
                                let _ = tx.send(new_config);
                            }
                            Err(e) => {
                                tracing::error!(
                                    "Failed to reload config: {}. Keeping current configuration.",
                                    e
                                );
                            }
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

/// Apply reloaded configs to the live verbosity snapshot until the channel closes.
///
/// Only verbosity is live; instance table edits are reported and ignored.
pub async fn apply_updates(
    mut updates: mpsc::UnboundedReceiver<ProxyConfig>,
    verbosity: VerbosityHandle,
    instances: Vec<InstanceConfig>,
) {
    while let Some(config) = updates.recv().await {
        if config.instances != instances {
            tracing::warn!("Instance table changed on disk; restart to apply");
        }
        tracing::info!(verbosity = ?config.verbosity, "Verbosity updated");
        verbosity.store(Arc::new(config.verbosity));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_apply_updates_swaps_verbosity() {
        let config = ProxyConfig::default();
        let handle = config.verbosity_handle();
        let (tx, rx) = mpsc::unbounded_channel();

        let mut updated = config.clone();
        updated.verbosity.verbose = true;
        updated.verbosity.show_body = true;
        tx.send(updated).unwrap();
        drop(tx);

        apply_updates(rx, handle.clone(), config.instances.clone()).await;

        let snapshot = handle.load();
        assert!(snapshot.verbose);
        assert!(snapshot.show_body);
        assert!(!snapshot.format_json);
    }
}
