//! File-based subscription store.

use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use fs4::fs_std::FileExt;
use serde::{Deserialize, Serialize};

use super::{
    AlertType, ChannelId, GuildId, RegistryError, Subscription, SubscriptionStore, insert_unique,
    remove_channel,
};
use crate::time::{Clock, SystemClock, unix_seconds};

/// Current registry file format version.
const REGISTRY_FILE_VERSION: u32 = 1;

/// On-disk registry format.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    version: u32,
    subscriptions: Vec<Subscription>,
}

fn load_blocking(path: &Path) -> Result<Vec<Subscription>, RegistryError> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(RegistryError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let file: RegistryFile =
        serde_json::from_str(&content).map_err(|e| RegistryError::Corrupted {
            path: path.to_path_buf(),
            reason: format!("Invalid JSON: {e}"),
        })?;

    if file.version != REGISTRY_FILE_VERSION {
        return Err(RegistryError::Corrupted {
            path: path.to_path_buf(),
            reason: format!(
                "Incompatible version: expected {REGISTRY_FILE_VERSION}, got {}",
                file.version
            ),
        });
    }

    Ok(file.subscriptions)
}

/// Takes the exclusive advisory lock on `{path}.lock`, creating it if needed.
///
/// The lock is held until the returned file is dropped. It guards the whole
/// read-modify-write, so separate processes sharing a registry never lose
/// each other's updates.
fn lock_blocking(path: &Path) -> Result<File, RegistryError> {
    let lock_path = PathBuf::from(format!("{}.lock", path.display()));
    let lock_err = |source| RegistryError::Lock {
        path: lock_path.clone(),
        source,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(lock_err)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)
        .map_err(lock_err)?;
    file.lock_exclusive().map_err(lock_err)?;
    Ok(file)
}

fn save_blocking(path: &Path, subscriptions: Vec<Subscription>) -> Result<(), RegistryError> {
    let file = RegistryFile {
        version: REGISTRY_FILE_VERSION,
        subscriptions,
    };
    let content = serde_json::to_string_pretty(&file).map_err(RegistryError::Serialize)?;
    let write_err = |source| RegistryError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }

    // state.json -> state.json.tmp, not state.tmp
    let temp_path = PathBuf::from(format!("{}.tmp", path.display()));
    std::fs::write(&temp_path, content).map_err(write_err)?;
    std::fs::rename(&temp_path, path).map_err(write_err)?;
    Ok(())
}

/// JSON-file implementation of [`SubscriptionStore`].
///
/// Every operation re-reads the file, so edits made by a separate
/// `basewatch subscribe` invocation are seen by a running engine on its next
/// dispatch. Writes use the temp-file-then-rename pattern:
/// 1. Write to `{path}.tmp`
/// 2. Rename `{path}.tmp` to `{path}`
///
/// Every add or remove holds an exclusive lock on `{path}.lock` from load to
/// rename, across processes as well as tasks. Reads take no lock; the rename
/// means they see either the old or the new file.
///
/// A missing file is an empty registry. A corrupted file is reported and
/// never overwritten.
#[derive(Debug)]
pub struct FileSubscriptionStore<C = SystemClock> {
    path: PathBuf,
    clock: C,
    write_lock: tokio::sync::Mutex<()>,
}

impl FileSubscriptionStore<SystemClock> {
    /// Creates a store at the given path using the system clock.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_clock(path, SystemClock)
    }
}

impl<C: Clock> FileSubscriptionStore<C> {
    /// Creates a store with a custom clock for `created_at`.
    #[must_use]
    pub fn with_clock(path: impl Into<PathBuf>, clock: C) -> Self {
        Self {
            path: path.into(),
            clock,
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Returns the path to the registry file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads, applies `mutate`, and saves only when `mutate` reports a change.
    async fn modify<T, F>(&self, mutate: F) -> Result<T, RegistryError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Vec<Subscription>) -> (T, bool) + Send + 'static,
    {
        let _guard = self.write_lock.lock().await;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let _file_lock = lock_blocking(&path)?;
            let mut subscriptions = load_blocking(&path)?;
            let (result, changed) = mutate(&mut subscriptions);
            if changed {
                save_blocking(&path, subscriptions)?;
            }
            Ok(result)
        })
        .await
        .map_err(RegistryError::Task)?
    }
}

impl<C: Clock> SubscriptionStore for FileSubscriptionStore<C> {
    async fn add_with_type(
        &self,
        guild: GuildId,
        channel: ChannelId,
        alert_type: AlertType,
    ) -> Result<bool, RegistryError> {
        let candidate = Subscription {
            guild_id: guild,
            channel_id: channel,
            alert_type,
            created_at: unix_seconds(self.clock.now()),
        };
        self.modify(move |subscriptions| {
            let added = insert_unique(subscriptions, candidate);
            (added, added)
        })
        .await
    }

    async fn remove(&self, channel: ChannelId) -> Result<(), RegistryError> {
        self.modify(move |subscriptions| ((), remove_channel(subscriptions, channel)))
            .await
    }

    async fn subscriptions(&self) -> Result<Vec<Subscription>, RegistryError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || load_blocking(&path))
            .await
            .map_err(RegistryError::Task)?
    }
}
