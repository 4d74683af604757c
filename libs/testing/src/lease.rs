//! Exclusive lease around compose operations.
//!
//! Two layers: a process-wide async mutex serialises callers inside one test
//! binary, and a lock file created with `create_new` serialises test binaries
//! running concurrently on the same host. The lock file holds the owner's PID
//! so a timeout can say who is holding it.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;
use tracing::debug;

/// File name of the default lock, placed under [`std::env::temp_dir`].
pub const DEFAULT_LOCK_FILE: &str = "storefront-test.compose.lock";

/// Default bound on how long [`Lease::acquire`] waits for the lock file.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default delay between lock file attempts.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(300);

static PROCESS_LOCK: Mutex<()> = Mutex::const_new(());

#[derive(Debug, Error)]
pub enum LeaseError {
    #[error("timeout acquiring {} (owner pid: {owner})", .path.display())]
    Timeout { path: PathBuf, owner: String },

    #[error("lock file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct Lease {
    path: PathBuf,
    timeout: Duration,
    poll_interval: Duration,
}

impl Default for Lease {
    fn default() -> Self {
        Self::new(std::env::temp_dir().join(DEFAULT_LOCK_FILE))
    }
}

impl Lease {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait for the in-process mutex, then for the lock file.
    ///
    /// The deadline only covers the lock file; another task in this process
    /// holding the lease is waited on without bound.
    pub async fn acquire(&self) -> Result<LeaseGuard, LeaseError> {
        let local = PROCESS_LOCK.lock().await;
        let deadline = Instant::now() + self.timeout;

        loop {
            match self.try_create() {
                Ok(()) => {
                    debug!(path = %self.path.display(), "Lease acquired");
                    return Ok(LeaseGuard {
                        path: self.path.clone(),
                        _local: local,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                Err(source) => {
                    return Err(LeaseError::Io {
                        path: self.path.clone(),
                        source,
                    })
                }
            }

            if Instant::now() >= deadline {
                let owner = fs::read_to_string(&self.path)
                    .map(|pid| pid.trim().to_string())
                    .unwrap_or_default();
                return Err(LeaseError::Timeout {
                    path: self.path.clone(),
                    owner,
                });
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    fn try_create(&self) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)?;

        if let Err(e) = writeln!(file, "{}", std::process::id()) {
            drop(file);
            let _ = fs::remove_file(&self.path);
            return Err(e);
        }
        Ok(())
    }
}

/// Held lease. Dropping it removes the lock file and releases the mutex.
#[derive(Debug)]
pub struct LeaseGuard {
    path: PathBuf,
    _local: MutexGuard<'static, ()>,
}

impl LeaseGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            debug!(path = %self.path.display(), error = %e, "Failed to remove lock file");
        }
    }
}
