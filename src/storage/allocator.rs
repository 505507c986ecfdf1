//! Unique directory allocation for cloned pages

use crate::storage::traits::{StorageError, StorageResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const MAX_ATTEMPTS: usize = 8;

/// Source of fresh, collision-free page directories
pub trait PathAllocator: Send + Sync {
    /// Returns a new directory that no other caller in this run has received
    fn allocate(&self) -> StorageResult<PathBuf>;
}

/// Allocates `<root>/<uuid>` directories
///
/// The directory is created before it is handed out; `create_dir` failing with
/// `AlreadyExists` means another caller won the name, so a new one is drawn.
#[derive(Debug, Clone)]
pub struct UniquePathAllocator {
    root: PathBuf,
}

impl UniquePathAllocator {
    pub fn new(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl PathAllocator for UniquePathAllocator {
    fn allocate(&self) -> StorageResult<PathBuf> {
        for _ in 0..MAX_ATTEMPTS {
            let candidate = self.root.join(Uuid::new_v4().simple().to_string());
            match std::fs::create_dir(&candidate) {
                Ok(()) => return Ok(candidate),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(StorageError::Allocation(format!(
            "no free directory under {} after {} attempts",
            self.root.display(),
            MAX_ATTEMPTS
        )))
    }
}
