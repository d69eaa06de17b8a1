//! Writer mutual exclusion over a named lock resource.
//!
//! [`FileLock`] takes an OS advisory lock on a sentinel file next to the data
//! file, so writers in different processes serialize. Every lock also passes
//! through a per-resource in-process gate, which keeps same-process ordering
//! even when the OS primitive is missing and the file lock degrades.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, OnceLock, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{Effect, Transience};

const LOCK_SUFFIX: &str = ".lock";
const RETRY_INTERVAL: Duration = Duration::from_millis(5);

/// How writers exclude each other.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockMode {
    /// OS file lock on `<data file>.lock`; cross-process.
    #[default]
    File,
    /// In-process gate only.
    Process,
    /// No exclusion. Concurrent writers can lose updates.
    None,
}

impl LockMode {
    pub fn as_str(self) -> &'static str {
        match self {
            LockMode::File => "file",
            LockMode::Process => "process",
            LockMode::None => "none",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "file" => Some(LockMode::File),
            "process" => Some(LockMode::Process),
            "none" | "off" => Some(LockMode::None),
            _ => None,
        }
    }
}

/// Strength of the exclusion a lock currently provides.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockStatus {
    /// Cross-process exclusion through an OS file lock.
    Exclusive,
    /// The OS primitive was unavailable; same-process ordering only.
    Degraded,
    /// Configured for same-process ordering only.
    ProcessOnly,
    /// No exclusion at all.
    Disabled,
}

#[derive(Debug, Error)]
pub enum LockError {
    #[error("failed to open lock file {resource:?}: {source}")]
    Open {
        resource: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to lock {resource:?}: {source}")]
    Acquire {
        resource: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("timed out after {waited_ms}ms waiting for lock {resource:?}")]
    Timeout { resource: PathBuf, waited_ms: u64 },
}

impl LockError {
    pub fn transience(&self) -> Transience {
        match self {
            LockError::Open { source, .. } => match source.kind() {
                io::ErrorKind::PermissionDenied | io::ErrorKind::NotFound => {
                    Transience::Permanent
                }
                _ => Transience::Retryable,
            },
            LockError::Acquire { .. } => Transience::Unknown,
            LockError::Timeout { .. } => Transience::Retryable,
        }
    }

    pub fn effect(&self) -> Effect {
        Effect::None
    }
}

/// Acquire/release capability over one named resource.
pub trait StoreLock: fmt::Debug + Send + Sync {
    /// The lock resource, if this lock has one.
    fn resource(&self) -> Option<&Path>;

    fn status(&self) -> LockStatus;

    /// Block until the lock is held. Dropping the guard releases it.
    fn acquire(&self) -> Result<LockGuard, LockError>;
}

/// Held lock. Released on drop, including during unwinding.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard {
    file: Option<File>,
    local: Option<LocalTicket>,
}

impl LockGuard {
    fn unlocked() -> Self {
        Self {
            file: None,
            local: None,
        }
    }

    pub fn release(self) {
        drop(self);
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // OS lock first, then the gate, so a waiting thread never finds the
        // gate open while the file is still locked by us.
        if let Some(file) = self.file.take() {
            let _ = FileExt::unlock(&file);
        }
        self.local.take();
    }
}

impl fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockGuard")
            .field("file", &self.file.is_some())
            .field("local", &self.local.is_some())
            .finish()
    }
}

/// Run `critical` while holding `lock`.
pub fn with_lock<T>(lock: &dyn StoreLock, critical: impl FnOnce() -> T) -> Result<T, LockError> {
    let guard = lock.acquire()?;
    let out = critical();
    guard.release();
    Ok(out)
}

/// Lock resource for a data file: the same path with `.lock` appended.
pub fn lock_path_for(data_path: &Path) -> PathBuf {
    let mut raw: OsString = data_path.as_os_str().to_owned();
    raw.push(LOCK_SUFFIX);
    PathBuf::from(raw)
}

/// Build the lock a store should use for `resource`.
pub fn lock_for(mode: LockMode, resource: &Path, timeout: Option<Duration>) -> Arc<dyn StoreLock> {
    match mode {
        LockMode::File => Arc::new(FileLock::new(resource).with_timeout(timeout)),
        LockMode::Process => Arc::new(ProcessLock::new(resource).with_timeout(timeout)),
        LockMode::None => Arc::new(NoopLock),
    }
}

// =============================================================================
// Implementations
// =============================================================================

#[derive(Debug)]
pub struct FileLock {
    resource: PathBuf,
    gate: Arc<LocalGate>,
    timeout: Option<Duration>,
    degraded: AtomicBool,
}

impl FileLock {
    pub fn new(resource: impl Into<PathBuf>) -> Self {
        let resource = resource.into();
        Self {
            gate: local_gate(&resource),
            resource,
            timeout: None,
            degraded: AtomicBool::new(false),
        }
    }

    /// Give up after `timeout` instead of blocking until the holder releases.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Behave as if the platform had no file locking.
    #[doc(hidden)]
    pub fn force_degraded(&self) {
        self.degraded.store(true, Ordering::Release);
    }

    fn degrade(&self, err: &io::Error) {
        if !self.degraded.swap(true, Ordering::AcqRel) {
            tracing::warn!(
                resource = %self.resource.display(),
                error = %err,
                "file locking unavailable; writers in other processes are not excluded"
            );
        }
    }

    fn lock_file(&self, file: &File, deadline: Option<Instant>) -> Result<(), FileLockFailure> {
        let Some(deadline) = deadline else {
            return FileExt::lock_exclusive(file).map_err(FileLockFailure::classify);
        };
        loop {
            match FileExt::try_lock_exclusive(file) {
                Ok(()) => return Ok(()),
                Err(err) if is_contended(&err) => {
                    if Instant::now() >= deadline {
                        return Err(FileLockFailure::TimedOut);
                    }
                    thread::sleep(RETRY_INTERVAL);
                }
                Err(err) => return Err(FileLockFailure::classify(err)),
            }
        }
    }
}

impl StoreLock for FileLock {
    fn resource(&self) -> Option<&Path> {
        Some(&self.resource)
    }

    fn status(&self) -> LockStatus {
        if self.degraded.load(Ordering::Acquire) {
            LockStatus::Degraded
        } else {
            LockStatus::Exclusive
        }
    }

    fn acquire(&self) -> Result<LockGuard, LockError> {
        let started = Instant::now();
        let deadline = self.timeout.map(|timeout| started + timeout);
        let local = self
            .gate
            .enter(deadline)
            .ok_or_else(|| timeout_error(&self.resource, started))?;

        if self.degraded.load(Ordering::Acquire) {
            return Ok(LockGuard {
                file: None,
                local: Some(local),
            });
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.resource)
            .map_err(|source| LockError::Open {
                resource: self.resource.clone(),
                source,
            })?;

        match self.lock_file(&file, deadline) {
            Ok(()) => Ok(LockGuard {
                file: Some(file),
                local: Some(local),
            }),
            Err(FileLockFailure::Unsupported(err)) => {
                self.degrade(&err);
                Ok(LockGuard {
                    file: None,
                    local: Some(local),
                })
            }
            Err(FileLockFailure::TimedOut) => Err(timeout_error(&self.resource, started)),
            Err(FileLockFailure::Io(source)) => Err(LockError::Acquire {
                resource: self.resource.clone(),
                source,
            }),
        }
    }
}

/// Same-process ordering without touching the filesystem.
#[derive(Debug)]
pub struct ProcessLock {
    resource: PathBuf,
    gate: Arc<LocalGate>,
    timeout: Option<Duration>,
}

impl ProcessLock {
    pub fn new(resource: impl Into<PathBuf>) -> Self {
        let resource = resource.into();
        Self {
            gate: local_gate(&resource),
            resource,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl StoreLock for ProcessLock {
    fn resource(&self) -> Option<&Path> {
        Some(&self.resource)
    }

    fn status(&self) -> LockStatus {
        LockStatus::ProcessOnly
    }

    fn acquire(&self) -> Result<LockGuard, LockError> {
        let started = Instant::now();
        let deadline = self.timeout.map(|timeout| started + timeout);
        let local = self
            .gate
            .enter(deadline)
            .ok_or_else(|| timeout_error(&self.resource, started))?;
        Ok(LockGuard {
            file: None,
            local: Some(local),
        })
    }
}

/// Explicit no-op lock: every acquire succeeds immediately.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopLock;

impl StoreLock for NoopLock {
    fn resource(&self) -> Option<&Path> {
        None
    }

    fn status(&self) -> LockStatus {
        LockStatus::Disabled
    }

    fn acquire(&self) -> Result<LockGuard, LockError> {
        Ok(LockGuard::unlocked())
    }
}

enum FileLockFailure {
    Unsupported(io::Error),
    TimedOut,
    Io(io::Error),
}

impl FileLockFailure {
    fn classify(err: io::Error) -> Self {
        if primitive_unavailable(&err) {
            FileLockFailure::Unsupported(err)
        } else {
            FileLockFailure::Io(err)
        }
    }
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

fn primitive_unavailable(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::Unsupported {
        return true;
    }
    #[cfg(unix)]
    {
        matches!(
            err.raw_os_error(),
            Some(code) if code == libc::ENOLCK || code == libc::ENOSYS || code == libc::EOPNOTSUPP
        )
    }
    #[cfg(not(unix))]
    {
        false
    }
}

fn timeout_error(resource: &Path, started: Instant) -> LockError {
    LockError::Timeout {
        resource: resource.to_path_buf(),
        waited_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    }
}

// =============================================================================
// In-process gate
// =============================================================================

#[derive(Debug, Default)]
struct LocalGate {
    held: Mutex<bool>,
    released: Condvar,
}

impl LocalGate {
    fn enter(self: &Arc<Self>, deadline: Option<Instant>) -> Option<LocalTicket> {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        while *held {
            held = match deadline {
                None => self
                    .released
                    .wait(held)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return None;
                    }
                    self.released
                        .wait_timeout(held, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
        *held = true;
        Some(LocalTicket {
            gate: Arc::clone(self),
        })
    }

    fn leave(&self) {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        *held = false;
        self.released.notify_one();
    }
}

struct LocalTicket {
    gate: Arc<LocalGate>,
}

impl Drop for LocalTicket {
    fn drop(&mut self) {
        self.gate.leave();
    }
}

/// One gate per lock resource, shared by every lock in this process.
fn local_gate(resource: &Path) -> Arc<LocalGate> {
    static GATES: OnceLock<Mutex<HashMap<PathBuf, Arc<LocalGate>>>> = OnceLock::new();
    let key = std::path::absolute(resource).unwrap_or_else(|_| resource.to_path_buf());
    let mut gates = GATES
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    Arc::clone(gates.entry(key).or_default())
}
