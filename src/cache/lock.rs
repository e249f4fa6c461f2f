//! Process-safe file locking for cache mutations, polling for an exclusive
//! or shared advisory lock on a sibling `.{name}.lock` file up to a timeout.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::error::CacheError;

const DEFAULT_TIMEOUT_SECS: f64 = 30.0;
const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn lock_path(cache_path: &Path) -> PathBuf {
    let name = cache_path
        .file_name()
        .map(|n| format!(".{}.lock", n.to_string_lossy()))
        .unwrap_or_else(|| ".cache.lock".to_string());
    cache_path
        .parent()
        .map(|p| p.join(&name))
        .unwrap_or_else(|| PathBuf::from(&name))
}

fn open_lock_file(path: &Path) -> Result<File, CacheError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| CacheError::Io {
            path: parent.display().to_string(),
            source: e,
        })?;
    }
    OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .open(path)
        .map_err(|e| CacheError::Io {
            path: path.display().to_string(),
            source: e,
        })
}

/// Holds an exclusive lock on the file backing `cache_path` for the guard's
/// lifetime; releases and best-effort removes the lock file on drop.
pub struct ExclusiveLock {
    lock_path: PathBuf,
    file: Option<File>,
}

impl ExclusiveLock {
    pub fn acquire(cache_path: &Path) -> Result<Self, CacheError> {
        Self::acquire_with_timeout(cache_path, DEFAULT_TIMEOUT_SECS)
    }

    pub fn acquire_with_timeout(cache_path: &Path, timeout_secs: f64) -> Result<Self, CacheError> {
        let lock_path = lock_path(cache_path);
        let start = Instant::now();
        loop {
            let file = open_lock_file(&lock_path)?;
            match file.try_lock_exclusive() {
                Ok(()) => {
                    return Ok(Self {
                        lock_path,
                        file: Some(file),
                    });
                }
                Err(_) => {
                    if start.elapsed().as_secs_f64() >= timeout_secs {
                        return Err(CacheError::LockTimeout {
                            path: lock_path,
                            seconds: timeout_secs,
                        });
                    }
                    thread::sleep(POLL_INTERVAL);
                }
            }
        }
    }
}

impl Drop for ExclusiveLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = FileExt::unlock(&file);
        }
        let _ = std::fs::remove_file(&self.lock_path);
    }
}

/// Holds a shared (read) lock; many readers may hold one at once, but an
/// [`ExclusiveLock`] waits for all of them to release first.
pub struct SharedLock {
    lock_path: PathBuf,
    file: Option<File>,
}

impl SharedLock {
    pub fn acquire(cache_path: &Path) -> Result<Self, CacheError> {
        Self::acquire_with_timeout(cache_path, DEFAULT_TIMEOUT_SECS)
    }

    pub fn acquire_with_timeout(cache_path: &Path, timeout_secs: f64) -> Result<Self, CacheError> {
        let lock_path = lock_path(cache_path);
        let start = Instant::now();
        loop {
            let file = open_lock_file(&lock_path)?;
            match file.try_lock_shared() {
                Ok(()) => {
                    return Ok(Self {
                        lock_path,
                        file: Some(file),
                    });
                }
                Err(_) => {
                    if start.elapsed().as_secs_f64() >= timeout_secs {
                        return Err(CacheError::LockTimeout {
                            path: lock_path,
                            seconds: timeout_secs,
                        });
                    }
                    thread::sleep(POLL_INTERVAL);
                }
            }
        }
    }
}

impl Drop for SharedLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = FileExt::unlock(&file);
        }
        let _ = std::fs::remove_file(&self.lock_path);
    }
}
