//! Opening the database and swapping in updated files.
//!
//! A separate builder produces complete replacement databases offline. It
//! communicates through three well-known sibling paths: the live file, an
//! `updated-` prefixed replacement, and a lock file whose presence means a
//! build is still in progress. Adopting an update is a rename over the
//! primary path followed by a fresh mapping; the swap publishes the new
//! view before the old one is released, so readers that started on the old
//! mapping finish on it undisturbed.

use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::db::OfflineDatabase;
use crate::error::{Error, Result};
use crate::view::{ByteView, MmapView};

/// How long to wait between checks for the primary database while an
/// offline build holds the lock file at startup.
const STARTUP_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Default interval between checks for an updated database file.
pub const DEFAULT_RELOAD_INTERVAL: Duration = Duration::from_secs(3600);

/// The well-known sibling paths of a database file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabasePaths {
    /// The live database, opened read-only.
    pub database: PathBuf,
    /// A complete replacement dropped off by the builder; its presence
    /// triggers a swap.
    pub updated: PathBuf,
    /// The builder's exclusive marker; its presence suppresses swaps.
    pub lock: PathBuf,
}

impl DatabasePaths {
    /// Derives the updated and lock paths next to `database`:
    /// `pwned-passwords.bin` pairs with `updated-pwned-passwords.bin` and
    /// `pwned-passwords.lock`.
    pub fn derive(database: impl Into<PathBuf>) -> Self {
        let database = database.into();

        let mut updated_name = OsString::from("updated-");
        if let Some(name) = database.file_name() {
            updated_name.push(name);
        }
        let updated = database.with_file_name(updated_name);
        let lock = database.with_extension("lock");

        Self { database, updated, lock }
    }
}

impl OfflineDatabase {
    /// Opens the database at `path` and maps it.
    ///
    /// Honors the builder's filesystem protocol first: while the lock file
    /// exists and the primary file does not, an offline build is still
    /// writing it, so wait; and if a finished update is already present
    /// with no build in progress, adopt it before opening.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let paths = DatabasePaths::derive(path);

        while paths.lock.exists() && !paths.database.exists() {
            warn!(
                lock = %paths.lock.display(),
                "lock file exists but database file does not; waiting for the build to finish"
            );
            time::sleep(STARTUP_POLL_INTERVAL).await;
        }

        if paths.updated.exists() && !paths.lock.exists() {
            info!(
                from = %paths.updated.display(),
                to = %paths.database.display(),
                "adopting updated database"
            );
            std::fs::rename(&paths.updated, &paths.database)
                .map_err(|source| Error::UpdateRename { path: paths.updated.clone(), source })?;
        }

        let view = MmapView::open(&paths.database)?;
        info!(path = %paths.database.display(), bytes = view.len(), "database opened");
        Ok(Self::from_parts(Arc::new(view), Some(paths)))
    }

    /// Adopts an updated database file if one is present, swapping the
    /// current view for a mapping of the new file.
    ///
    /// Returns `Ok(true)` when a swap happened. No-ops when there is no
    /// updated file, when the builder still holds the lock file, or when
    /// this database has no backing file at all. On error the previous
    /// view stays published and queries continue against it.
    pub fn reload(&self) -> Result<bool> {
        let Some(paths) = self.paths() else {
            return Ok(false);
        };

        if !paths.updated.exists() {
            return Ok(false);
        }
        if paths.lock.exists() {
            debug!(
                lock = %paths.lock.display(),
                "updated database present but lock file held; skipping swap"
            );
            return Ok(false);
        }

        info!(
            from = %paths.updated.display(),
            to = %paths.database.display(),
            "updating database"
        );
        std::fs::rename(&paths.updated, &paths.database)
            .map_err(|source| Error::UpdateRename { path: paths.updated.clone(), source })?;

        let view = MmapView::open(&paths.database)
            .map_err(|source| Error::UpdateOpen { path: paths.database.clone(), source })?;
        let bytes = view.len();
        self.publish(Arc::new(view));
        info!(path = %paths.database.display(), bytes, "database updated");
        Ok(true)
    }

    /// Spawns a background task that calls [`reload`] on a fixed interval
    /// (hourly by default, see [`DEFAULT_RELOAD_INTERVAL`]).
    ///
    /// A failed reload is logged and the task keeps going with the current
    /// view. Stop the task with [`ReloadTask::shutdown`].
    ///
    /// [`reload`]: OfflineDatabase::reload
    pub fn start_reload_task(&self, interval: Duration) -> ReloadTask {
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let db = self.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately; consume it so the
            // first update check happens one full interval after startup.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(error) = db.reload() {
                            error!(%error, "database update failed; continuing with the current view");
                        }
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
        });

        ReloadTask { shutdown, handle }
    }
}

/// Handle to the periodic update checker.
///
/// Dropping the handle leaves the task running for the life of the
/// process; call [`ReloadTask::shutdown`] to stop it cleanly.
pub struct ReloadTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl ReloadTask {
    /// Stops the task and waits for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }
}
