use crate::config::AppConfig;
use crate::config_loader::ConfigLoader;
use anyhow::Result;
use notify::{Event, RecursiveMode, Watcher};
use std::path::PathBuf;
use tokio::sync::watch;

/// Republishes the configuration each time its file changes.
///
/// A reload that fails to parse or validate is logged and dropped; the
/// last good configuration stays current.
pub struct ConfigWatcher {
    tx: watch::Sender<AppConfig>,
    path: PathBuf,
}

impl ConfigWatcher {
    #[must_use]
    pub fn new(
        initial_config: AppConfig,
        path: impl Into<PathBuf>,
    ) -> (Self, watch::Receiver<AppConfig>) {
        let (tx, rx) = watch::channel(initial_config);
        (
            Self {
                tx,
                path: path.into(),
            },
            rx,
        )
    }

    /// Reloads the file once and publishes the result if it is valid.
    ///
    /// Returns whether a new configuration was published.
    pub fn reload(&self) -> bool {
        match ConfigLoader::load_from(&self.path) {
            Ok(new_config) => {
                self.tx.send_replace(new_config);
                tracing::info!(path = %self.path.display(), "Config reloaded");
                true
            }
            Err(e) => {
                tracing::error!(
                    path = %self.path.display(),
                    "Failed to reload config, keeping previous: {e:#}"
                );
                false
            }
        }
    }

    /// Blocks a worker thread watching the file until the watcher closes.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be watched or the worker task fails.
    pub async fn watch(self) -> Result<()> {
        tokio::task::spawn_blocking(move || {
            let (notify_tx, notify_rx) = std::sync::mpsc::channel();

            let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
                if let Ok(event) = res {
                    let _ = notify_tx.send(event);
                }
            })?;

            watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

            for event in notify_rx {
                if event.kind.is_modify() {
                    tracing::info!("Config file changed, reloading...");
                    self.reload();
                }
            }

            Ok::<_, anyhow::Error>(())
        })
        .await??;

        Ok(())
    }
}
