use std::collections::HashMap;
use std::path::PathBuf;

use tokio::fs::{self, File};

use crate::error::FsError;

/// Access mode recorded at OPEN time, §3 "FileHandle".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessMode {
    pub read: bool,
    pub write: bool,
}

pub struct FileHandle {
    pub file: File,
    pub path: PathBuf,
    pub mode: AccessMode,
}

pub struct DirHandle {
    pub path: PathBuf,
    pub entries: Vec<fs::DirEntry>,
    pub yielded: bool,
}

/// Two disjoint tables keyed by the same monotonically allocated handle
/// space, plus the per-directory-handle "yielded" flag folded into
/// `DirHandle` directly (§4.3). A subsystem owns exactly one of these and
/// drives it from a single task (§5), so no interior locking is needed here,
/// every method takes `&mut self`.
pub struct HandleTable {
    next_id: u32,
    files: HashMap<u32, FileHandle>,
    dirs: HashMap<u32, DirHandle>,
}

impl Default for HandleTable {
    fn default() -> Self {
        HandleTable::new()
    }
}

impl HandleTable {
    pub fn new() -> Self {
        HandleTable {
            next_id: 1,
            files: HashMap::new(),
            dirs: HashMap::new(),
        }
    }

    fn alloc(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn insert_file(&mut self, handle: FileHandle) -> u32 {
        let id = self.alloc();
        self.files.insert(id, handle);
        id
    }

    pub fn insert_dir(&mut self, handle: DirHandle) -> u32 {
        let id = self.alloc();
        self.dirs.insert(id, handle);
        id
    }

    pub fn file_mut(&mut self, id: u32) -> Result<&mut FileHandle, FsError> {
        self.files.get_mut(&id).ok_or(FsError::InvalidHandle)
    }

    pub fn dir_mut(&mut self, id: u32) -> Result<&mut DirHandle, FsError> {
        self.dirs.get_mut(&id).ok_or(FsError::InvalidHandle)
    }

    pub fn file_path(&self, id: u32) -> Result<PathBuf, FsError> {
        self.files.get(&id).map(|h| h.path.clone()).ok_or(FsError::InvalidHandle)
    }

    /// Remove the handle from whichever table it belongs to (§4.3). Dropping
    /// the `FileHandle` closes the underlying `tokio::fs::File`.
    pub fn close(&mut self, id: u32) -> Result<(), FsError> {
        if self.files.remove(&id).is_some() {
            return Ok(());
        }
        if self.dirs.remove(&id).is_some() {
            return Ok(());
        }
        Err(FsError::InvalidHandle)
    }

    /// Subsystem teardown: drop every handle (§4.3, §5 "every termination
    /// path releases every open file and directory handle").
    pub fn clear(&mut self) {
        self.files.clear();
        self.dirs.clear();
    }
}
