//! Atomic snapshot replacement.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::error::{Effect, Transience};

/// Step of the write protocol, used in errors and for fault injection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteStage {
    CreateTemp,
    Write,
    Sync,
    Rename,
}

impl WriteStage {
    pub fn as_str(self) -> &'static str {
        match self {
            WriteStage::CreateTemp => "create_temp",
            WriteStage::Write => "write",
            WriteStage::Sync => "sync",
            WriteStage::Rename => "rename",
        }
    }
}

#[derive(Debug, Error)]
pub enum AtomicWriteError {
    #[error("atomic write target {path:?} has no file name")]
    InvalidTarget { path: PathBuf },
    #[error("atomic write of {path:?} failed at {}: {source}", .stage.as_str())]
    Io {
        path: PathBuf,
        stage: WriteStage,
        #[source]
        source: io::Error,
    },
}

impl AtomicWriteError {
    pub fn stage(&self) -> Option<WriteStage> {
        match self {
            AtomicWriteError::InvalidTarget { .. } => None,
            AtomicWriteError::Io { stage, .. } => Some(*stage),
        }
    }

    pub fn transience(&self) -> Transience {
        match self {
            AtomicWriteError::InvalidTarget { .. } => Transience::Permanent,
            AtomicWriteError::Io { source, .. } => match source.kind() {
                io::ErrorKind::PermissionDenied | io::ErrorKind::NotFound => {
                    Transience::Permanent
                }
                _ => Transience::Retryable,
            },
        }
    }

    /// The target is only touched by the final rename, so a failed write
    /// never changes it.
    pub fn effect(&self) -> Effect {
        Effect::None
    }
}

/// Writes a full snapshot to a sibling temp file, fsyncs it, then renames it
/// over the target. The temp file is removed on every failure path.
#[derive(Clone, Debug, Default)]
pub struct AtomicWriter {
    fail_at: Option<WriteStage>,
}

impl AtomicWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writer that fails with an injected I/O error at `stage`.
    #[doc(hidden)]
    pub fn failing_at(stage: WriteStage) -> Self {
        Self {
            fail_at: Some(stage),
        }
    }

    pub fn write(&self, path: &Path, data: &[u8]) -> Result<(), AtomicWriteError> {
        if path.file_name().is_none() {
            return Err(AtomicWriteError::InvalidTarget {
                path: path.to_path_buf(),
            });
        }
        let dir = parent_dir(path);
        let io_err = |stage: WriteStage| {
            move |source: io::Error| AtomicWriteError::Io {
                path: path.to_path_buf(),
                stage,
                source,
            }
        };

        self.inject(WriteStage::CreateTemp)
            .map_err(io_err(WriteStage::CreateTemp))?;
        let mut temp = tempfile::Builder::new()
            .prefix(".tally-")
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(io_err(WriteStage::CreateTemp))?;

        self.inject(WriteStage::Write)
            .and_then(|()| temp.write_all(data))
            .map_err(io_err(WriteStage::Write))?;

        self.inject(WriteStage::Sync)
            .and_then(|()| temp.as_file().sync_all())
            .map_err(io_err(WriteStage::Sync))?;

        self.inject(WriteStage::Rename)
            .map_err(io_err(WriteStage::Rename))?;
        // PersistError hands the temp file back; dropping it unlinks it.
        temp.persist(path)
            .map_err(|err| io_err(WriteStage::Rename)(err.error))?;

        sync_dir(dir);
        Ok(())
    }

    fn inject(&self, stage: WriteStage) -> io::Result<()> {
        if self.fail_at == Some(stage) {
            return Err(io::Error::other(format!(
                "injected failure at {}",
                stage.as_str()
            )));
        }
        Ok(())
    }
}

/// Replace `path` with `data` atomically.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<(), AtomicWriteError> {
    AtomicWriter::new().write(path, data)
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

// Best effort: makes the rename itself durable on filesystems that need it.
#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Ok(handle) = fs::File::open(dir) {
        let _ = handle.sync_all();
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}

/// Leftover temp files in `dir`, for tests and diagnostics.
#[doc(hidden)]
pub fn stray_temp_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_temp = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(".tally-") && name.ends_with(".tmp"));
        if is_temp {
            found.push(path);
        }
    }
    Ok(found)
}
