use std::io::SeekFrom;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, warn};

use sftp_protocol::{
    Attrs, Decode, HandleAttrsRequest, HandleRequest, NameEntry, OpenRequest, PathAttrsRequest,
    PathRequest, ReadRequest, RenameRequest, Request, Response, StatusCode, SymlinkRequest,
    WriteRequest,
};

use crate::audit::AuditSink;
use crate::error::FsError;
use crate::handles::{AccessMode, DirHandle, FileHandle, HandleTable};
use crate::jail::Jail;
use crate::metadata::{attrs_for, long_name};
use crate::user::UserAccount;

/// The largest chunk a single READ hands back (draft-02 doesn't bound this;
/// the cap only keeps one request from forcing an unbounded allocation),
/// matching the `std::cmp::min(len, 65536)` clamp of the StellarStack
/// reference handler.
const MAX_READ_CHUNK: u32 = 64 * 1024;

const OPCODE_RANGE: std::ops::RangeInclusive<u8> = 3..=20;
const OPCODE_INIT: u8 = 1;

fn parse_handle(handle: &Bytes) -> Result<u32, FsError> {
    std::str::from_utf8(handle)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(FsError::InvalidHandle)
}

fn encode_handle(id: u32) -> Bytes {
    Bytes::from(id.to_string().into_bytes())
}

/// `Instant` itself has no portable integer representation, so the idle
/// clock is tracked as milliseconds elapsed since one process-wide reference
/// point instead, cheap to stash in an `AtomicU64` and read from a task
/// that outlives any single `&Subsystem` borrow (the idle-timeout watcher in
/// `session.rs`).
fn process_start() -> Instant {
    static START: OnceLock<Instant> = OnceLock::new();
    *START.get_or_init(Instant::now)
}

fn millis_since_start(instant: Instant) -> u64 {
    instant.saturating_duration_since(process_start()).as_millis() as u64
}

/// A read-only, `Send + Sync` handle onto a [`Subsystem`]'s idle clock,
/// cloned out so a background watcher task can poll `§4.4`'s "Idle state
/// machine" without needing `&Subsystem` (and so without contending with
/// the single-writer packet-processing discipline of §5).
#[derive(Clone)]
pub struct IdleProbe {
    last_activity_millis: Arc<AtomicU64>,
    idle_timeout: Option<Duration>,
}

impl IdleProbe {
    pub fn is_expired(&self) -> bool {
        match self.idle_timeout {
            Some(timeout) => {
                let last = self.last_activity_millis.load(Ordering::Relaxed);
                millis_since_start(Instant::now()).saturating_sub(last) >= timeout.as_millis() as u64
            }
            None => false,
        }
    }
}

async fn set_times(path: PathBuf, atime: u32, mtime: u32) -> std::io::Result<()> {
    tokio::task::spawn_blocking(move || {
        filetime::set_file_times(
            &path,
            filetime::FileTime::from_unix_time(atime as i64, 0),
            filetime::FileTime::from_unix_time(mtime as i64, 0),
        )
    })
    .await
    .unwrap_or_else(|join_err| Err(std::io::Error::new(std::io::ErrorKind::Other, join_err)))
}

/// One SFTP v3 protocol engine bound to one SSH channel (§4.4, §5). Owns the
/// byte accumulator, the handle table, and the idle clock; every method that
/// touches the filesystem or the handle table takes `&mut self` because a
/// subsystem is driven by exactly one task at a time (§5 "single-writer
/// discipline").
pub struct Subsystem {
    jail: Jail,
    user: UserAccount,
    handles: HandleTable,
    session_id: String,
    max_upload_bytes: u64,
    idle_timeout: Option<Duration>,
    last_activity_millis: Arc<AtomicU64>,
    audit: Arc<AuditSink>,
    buffer: BytesMut,
}

impl Subsystem {
    /// Construct a subsystem jailed to `root`, creating it if absent (§6
    /// `rootDirectory`).
    pub async fn new(
        root: PathBuf,
        user: UserAccount,
        session_id: String,
        max_upload_bytes: u64,
        idle_timeout: Option<Duration>,
        audit: Arc<AuditSink>,
    ) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(&root).await?;
        Ok(Subsystem {
            jail: Jail::new(root),
            user,
            handles: HandleTable::new(),
            session_id,
            max_upload_bytes,
            idle_timeout,
            last_activity_millis: Arc::new(AtomicU64::new(millis_since_start(Instant::now()))),
            audit,
            buffer: BytesMut::new(),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn username(&self) -> &str {
        &self.user.username
    }

    pub fn touch(&mut self) {
        self.last_activity_millis
            .store(millis_since_start(Instant::now()), Ordering::Relaxed);
    }

    /// §4.4 "Idle state machine": `Expired` once the window has elapsed
    /// since the last inbound byte. `idle_timeout = None` means no timeout.
    pub fn is_expired(&self, now: Instant) -> bool {
        match self.idle_timeout {
            Some(timeout) => {
                let last = self.last_activity_millis.load(Ordering::Relaxed);
                millis_since_start(now).saturating_sub(last) >= timeout.as_millis() as u64
            }
            None => false,
        }
    }

    /// A cloneable, `Send`-able probe of this subsystem's idle clock for a
    /// background watcher task that outlives any single handler call (§4.4,
    /// §5 "idle-timeout expiry" as a termination path).
    pub fn idle_probe(&self) -> IdleProbe {
        IdleProbe {
            last_activity_millis: self.last_activity_millis.clone(),
            idle_timeout: self.idle_timeout,
        }
    }

    /// Every termination path releases every open handle (§5).
    pub fn teardown(&mut self) {
        self.handles.clear();
    }

    /// Feed one inbound chunk through the framing accumulator and dispatch
    /// every packet it completes, in order (§4.4 "Framing").
    pub async fn on_data(&mut self, chunk: &[u8]) -> Vec<Bytes> {
        self.touch();
        self.buffer.extend_from_slice(chunk);

        let mut responses = Vec::new();
        while let Some(packet) = self.take_packet() {
            if let Some(response) = self.dispatch(packet).await {
                responses.push(response);
            }
        }
        responses
    }

    fn take_packet(&mut self) -> Option<Bytes> {
        if self.buffer.len() < 4 {
            return None;
        }
        let len = u32::from_be_bytes(self.buffer[0..4].try_into().expect("4 bytes")) as usize;
        if self.buffer.len() < 4 + len {
            return None;
        }
        self.buffer.advance(4);
        Some(self.buffer.split_to(len).freeze())
    }

    /// Decode and route one complete packet. Returns `None` only when no
    /// response should be sent at all (an opcode-less unparseable packet),
    /// per §4.4 "Unknown opcodes".
    async fn dispatch(&mut self, packet: Bytes) -> Option<Bytes> {
        if packet.is_empty() {
            return None;
        }
        let opcode = packet[0];
        let mut payload: &[u8] = &packet[1..];

        if opcode == OPCODE_INIT {
            // §4.4 INIT: always agree to version 3, regardless of the
            // client-advertised version; draft-02 gives INIT/VERSION no
            // request id at all.
            return Some(Response::Version(3).encode());
        }

        let mut peek = payload;
        let id = match u32::decode(&mut peek) {
            Ok(id) => id,
            Err(_) => {
                warn!(opcode, "dropping request with no parseable id");
                return None;
            }
        };

        if !OPCODE_RANGE.contains(&opcode) {
            return Some(
                Response::status(id, StatusCode::OpUnsupported.to_status("Unsupported operation"))
                    .encode(),
            );
        }

        let request = match Request::decode(opcode, &mut payload) {
            Ok((_, request)) => request,
            Err(_) => {
                return Some(
                    Response::status(id, StatusCode::BadMessage.to_status("Malformed request"))
                        .encode(),
                )
            }
        };

        debug!(opcode, id, "dispatching sftp request");
        Some(self.handle_request(id, request).await.encode())
    }

    fn status_response(&self, id: u32, opcode: &str, err: FsError) -> Response {
        let (code, message) = err.to_status_parts();
        self.audit.error(&self.session_id, self.username(), opcode, &message);
        Response::status(id, code.to_status(message))
    }

    /// Like `status_response`, but for capability gates checked before any
    /// filesystem call is attempted. Still audited via `ERROR` (§7 "All
    /// request-level errors are additionally recorded via the audit sink's
    /// `ERROR` method").
    fn permission_denied(&self, id: u32, opcode: &str, message: &str) -> Response {
        self.audit.error(&self.session_id, self.username(), opcode, message);
        Response::status(id, StatusCode::PermissionDenied.to_status(message))
    }

    fn virtual_path(bytes: &Bytes) -> String {
        String::from_utf8_lossy(bytes).into_owned()
    }

    async fn handle_request(&mut self, id: u32, request: Request) -> Response {
        match request {
            Request::Init { .. } => unreachable!("INIT is handled before dispatch"),
            Request::Open(OpenRequest { path, pflags, attrs }) => {
                self.op_open(id, path, pflags, attrs).await
            }
            Request::Close(HandleRequest { handle }) => self.op_close(id, handle),
            Request::Read(ReadRequest { handle, offset, length }) => {
                self.op_read(id, handle, offset, length).await
            }
            Request::Write(WriteRequest { handle, offset, data }) => {
                self.op_write(id, handle, offset, data).await
            }
            Request::LStat(PathRequest { path }) | Request::Stat(PathRequest { path }) => {
                self.op_stat(id, path).await
            }
            Request::FStat(HandleRequest { handle }) => self.op_fstat(id, handle).await,
            Request::SetStat(PathAttrsRequest { path, attrs }) => {
                self.op_setstat(id, path, attrs).await
            }
            Request::FSetStat(HandleAttrsRequest { handle, attrs }) => {
                self.op_fsetstat(id, handle, attrs).await
            }
            Request::OpenDir(PathRequest { path }) => self.op_opendir(id, path).await,
            Request::ReadDir(HandleRequest { handle }) => self.op_readdir(id, handle).await,
            Request::Remove(PathRequest { path }) => self.op_remove(id, path).await,
            Request::MkDir(PathAttrsRequest { path, .. }) => self.op_mkdir(id, path).await,
            Request::RmDir(PathRequest { path }) => self.op_rmdir(id, path).await,
            Request::RealPath(PathRequest { path }) => self.op_realpath(id, path),
            Request::Rename(RenameRequest { old_path, new_path }) => {
                self.op_rename(id, old_path, new_path).await
            }
            Request::ReadLink(PathRequest { path }) => self.op_readlink(id, path).await,
            Request::Symlink(SymlinkRequest { link_path, target_path }) => {
                self.op_symlink(id, link_path, target_path).await
            }
        }
    }

    async fn op_open(&mut self, id: u32, path: Bytes, pflags: u32, _attrs: Attrs) -> Response {
        let read = pflags & 0x01 != 0;
        let write = pflags & (0x02 | 0x08 | 0x10 | 0x20) != 0;

        if write && !self.user.can_upload {
            return self.permission_denied(id, "OPEN", "Permission denied: Upload not allowed");
        }
        if read && !self.user.can_download {
            return self.permission_denied(id, "OPEN", "Permission denied: Download not allowed");
        }

        let virtual_path = Self::virtual_path(&path);
        let physical = self.jail.resolve(&virtual_path);

        let mut options = tokio::fs::OpenOptions::new();
        options.read(read);
        if write {
            options.write(true);
            // Disposition priority, §4.4 OPEN: truncate > create > append > open-existing.
            if pflags & 0x20 != 0 {
                options.create(true).truncate(true);
            } else if pflags & 0x10 != 0 {
                options.create(true);
            } else if pflags & 0x08 != 0 {
                options.append(true);
            }
        }

        match options.open(&physical).await {
            Ok(file) => {
                let mode = AccessMode { read, write };
                let handle_id = self.handles.insert_file(FileHandle { file, path: physical, mode });
                Response::Handle { id, handle: encode_handle(handle_id) }
            }
            Err(err) => self.status_response(id, "OPEN", FsError::Io(err)),
        }
    }

    fn op_close(&mut self, id: u32, handle: Bytes) -> Response {
        match parse_handle(&handle).and_then(|handle_id| self.handles.close(handle_id)) {
            Ok(()) => Response::ok(id),
            Err(err) => self.status_response(id, "CLOSE", err),
        }
    }

    async fn op_read(&mut self, id: u32, handle: Bytes, offset: u64, length: u32) -> Response {
        let handle_id = match parse_handle(&handle) {
            Ok(handle_id) => handle_id,
            Err(err) => return self.status_response(id, "READ", err),
        };
        let virtual_path = match self.handles.file_path(handle_id) {
            Ok(path) => self.jail.to_virtual(&path),
            Err(err) => return self.status_response(id, "READ", err),
        };

        let file = match self.handles.file_mut(handle_id) {
            Ok(file) => file,
            Err(err) => return self.status_response(id, "READ", err),
        };

        if let Err(err) = file.file.seek(SeekFrom::Start(offset)).await {
            return self.status_response(id, "READ", FsError::Io(err));
        }

        let mut buffer = vec![0u8; length.min(MAX_READ_CHUNK) as usize];
        match file.file.read(&mut buffer).await {
            Ok(0) => Response::eof(id),
            Ok(n) => {
                buffer.truncate(n);
                self.audit.file_read(&self.session_id, self.username(), &virtual_path);
                Response::Data { id, data: Bytes::from(buffer) }
            }
            Err(err) => self.status_response(id, "READ", FsError::Io(err)),
        }
    }

    async fn op_write(&mut self, id: u32, handle: Bytes, offset: u64, data: Bytes) -> Response {
        let handle_id = match parse_handle(&handle) {
            Ok(handle_id) => handle_id,
            Err(err) => return self.status_response(id, "WRITE", err),
        };
        let virtual_path = match self.handles.file_path(handle_id) {
            Ok(path) => self.jail.to_virtual(&path),
            Err(err) => return self.status_response(id, "WRITE", err),
        };

        let file = match self.handles.file_mut(handle_id) {
            Ok(file) => file,
            Err(err) => return self.status_response(id, "WRITE", err),
        };

        let current_len = match file.file.metadata().await {
            Ok(metadata) => metadata.len(),
            Err(err) => return self.status_response(id, "WRITE", FsError::Io(err)),
        };

        // §3 invariant 4 / §4.4 WRITE: projected size is the larger of
        // where this write ends and the file's current size.
        let target = (offset + data.len() as u64).max(current_len);
        let ceiling = self.user.effective_upload_ceiling(self.max_upload_bytes);
        if ceiling != 0 && target > ceiling {
            return self.status_response(id, "WRITE", FsError::UploadCeilingExceeded);
        }

        if let Err(err) = file.file.seek(SeekFrom::Start(offset)).await {
            return self.status_response(id, "WRITE", FsError::Io(err));
        }
        if let Err(err) = file.file.write_all(&data).await {
            return self.status_response(id, "WRITE", FsError::Io(err));
        }

        self.audit.file_write(&self.session_id, self.username(), &virtual_path);
        Response::ok(id)
    }

    async fn op_stat(&mut self, id: u32, path: Bytes) -> Response {
        let virtual_path = Self::virtual_path(&path);
        let physical = self.jail.resolve(&virtual_path);
        match tokio::fs::metadata(&physical).await {
            Ok(metadata) => Response::Attrs { id, attrs: attrs_for(&metadata) },
            Err(err) => self.status_response(id, "STAT", FsError::Io(err)),
        }
    }

    async fn op_fstat(&mut self, id: u32, handle: Bytes) -> Response {
        let handle_id = match parse_handle(&handle) {
            Ok(handle_id) => handle_id,
            Err(err) => return self.status_response(id, "FSTAT", err),
        };
        let file = match self.handles.file_mut(handle_id) {
            Ok(file) => file,
            Err(err) => return self.status_response(id, "FSTAT", err),
        };
        match file.file.metadata().await {
            Ok(metadata) => Response::Attrs { id, attrs: attrs_for(&metadata) },
            Err(err) => self.status_response(id, "FSTAT", FsError::Io(err)),
        }
    }

    async fn op_setstat(&mut self, id: u32, path: Bytes, attrs: Attrs) -> Response {
        if !self.user.can_upload {
            return self.permission_denied(id, "SETSTAT", "Permission denied: Upload not allowed");
        }
        let virtual_path = Self::virtual_path(&path);
        let physical = self.jail.resolve(&virtual_path);

        if tokio::fs::metadata(&physical).await.is_err() {
            return self.status_response(
                id,
                "SETSTAT",
                FsError::Io(std::io::ErrorKind::NotFound.into()),
            );
        }

        // §9 open question 3: only acmodtime is ever applied; size/uid/gid/
        // permissions are decoded by the codec but intentionally ignored here.
        if let Some(time) = attrs.time {
            if let Err(err) = set_times(physical, time.atime, time.mtime).await {
                return self.status_response(id, "SETSTAT", FsError::Io(err));
            }
        }
        Response::ok(id)
    }

    async fn op_fsetstat(&mut self, id: u32, handle: Bytes, attrs: Attrs) -> Response {
        if !self.user.can_upload {
            return self.permission_denied(id, "FSETSTAT", "Permission denied: Upload not allowed");
        }
        let handle_id = match parse_handle(&handle) {
            Ok(handle_id) => handle_id,
            Err(err) => return self.status_response(id, "FSETSTAT", err),
        };
        let physical = match self.handles.file_path(handle_id) {
            Ok(path) => path,
            Err(err) => return self.status_response(id, "FSETSTAT", err),
        };

        if tokio::fs::metadata(&physical).await.is_err() {
            return self.status_response(
                id,
                "FSETSTAT",
                FsError::Io(std::io::ErrorKind::NotFound.into()),
            );
        }

        if let Some(time) = attrs.time {
            if let Err(err) = set_times(physical, time.atime, time.mtime).await {
                return self.status_response(id, "FSETSTAT", FsError::Io(err));
            }
        }
        Response::ok(id)
    }

    async fn op_opendir(&mut self, id: u32, path: Bytes) -> Response {
        let virtual_path = Self::virtual_path(&path);
        let physical = self.jail.resolve(&virtual_path);

        let metadata = match tokio::fs::metadata(&physical).await {
            Ok(metadata) => metadata,
            Err(err) => return self.status_response(id, "OPENDIR", FsError::Io(err)),
        };
        if !metadata.is_dir() {
            return self.status_response(
                id,
                "OPENDIR",
                FsError::Io(std::io::ErrorKind::NotFound.into()),
            );
        }

        let mut read_dir = match tokio::fs::read_dir(&physical).await {
            Ok(read_dir) => read_dir,
            Err(err) => return self.status_response(id, "OPENDIR", FsError::Io(err)),
        };

        let mut entries = Vec::new();
        loop {
            match read_dir.next_entry().await {
                Ok(Some(entry)) => entries.push(entry),
                Ok(None) => break,
                Err(err) => return self.status_response(id, "OPENDIR", FsError::Io(err)),
            }
        }

        let handle_id = self.handles.insert_dir(DirHandle { path: physical, entries, yielded: false });
        self.audit.dir_list(&self.session_id, self.username(), &virtual_path);
        Response::Handle { id, handle: encode_handle(handle_id) }
    }

    async fn op_readdir(&mut self, id: u32, handle: Bytes) -> Response {
        let handle_id = match parse_handle(&handle) {
            Ok(handle_id) => handle_id,
            Err(err) => return self.status_response(id, "READDIR", err),
        };

        let mut owned_entries = {
            let dir = match self.handles.dir_mut(handle_id) {
                Ok(dir) => dir,
                Err(err) => return self.status_response(id, "READDIR", err),
            };
            if dir.yielded {
                return Response::eof(id);
            }
            dir.yielded = true;
            std::mem::take(&mut dir.entries)
        };

        let mut name_entries = Vec::with_capacity(owned_entries.len());
        for entry in owned_entries.drain(..) {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                Err(_) => continue,
            };
            name_entries.push(NameEntry {
                long_name: long_name(&file_name, &metadata),
                filename: file_name,
                attrs: attrs_for(&metadata),
            });
        }

        Response::Name { id, entries: name_entries }
    }

    async fn op_remove(&mut self, id: u32, path: Bytes) -> Response {
        if !self.user.can_delete {
            return self.permission_denied(id, "REMOVE", "Permission denied: Delete not allowed");
        }
        let virtual_path = Self::virtual_path(&path);
        let physical = self.jail.resolve(&virtual_path);
        match tokio::fs::remove_file(&physical).await {
            Ok(()) => {
                self.audit.file_delete(&self.session_id, self.username(), &virtual_path);
                Response::ok(id)
            }
            Err(err) => self.status_response(id, "REMOVE", FsError::Io(err)),
        }
    }

    async fn op_mkdir(&mut self, id: u32, path: Bytes) -> Response {
        if !self.user.can_create_directory {
            return self.permission_denied(id, "MKDIR", "Permission denied: Directory creation not allowed");
        }
        let virtual_path = Self::virtual_path(&path);
        let physical = self.jail.resolve(&virtual_path);
        // Requested permissions/uid/gid bits are decoded but never applied,
        // matching SETSTAT's ignored-bits behavior (the thrussh reference
        // carries the same `// TODO attrs` gap on its own mkdir handler).
        match tokio::fs::create_dir_all(&physical).await {
            Ok(()) => {
                self.audit.dir_create(&self.session_id, self.username(), &virtual_path);
                Response::ok(id)
            }
            Err(err) => self.status_response(id, "MKDIR", FsError::Io(err)),
        }
    }

    async fn op_rmdir(&mut self, id: u32, path: Bytes) -> Response {
        if !self.user.can_delete {
            return self.permission_denied(id, "RMDIR", "Permission denied: Delete not allowed");
        }
        let virtual_path = Self::virtual_path(&path);
        let physical = self.jail.resolve(&virtual_path);
        match tokio::fs::remove_dir(&physical).await {
            Ok(()) => {
                self.audit.dir_delete(&self.session_id, self.username(), &virtual_path);
                Response::ok(id)
            }
            Err(err) => self.status_response(id, "RMDIR", FsError::Io(err)),
        }
    }

    fn op_realpath(&mut self, id: u32, path: Bytes) -> Response {
        let virtual_path = Self::virtual_path(&path);
        let physical = self.jail.resolve(&virtual_path);
        let resolved = self.jail.to_virtual(&physical);
        Response::Name {
            id,
            entries: vec![NameEntry {
                filename: resolved.clone(),
                long_name: resolved,
                attrs: Attrs::dummy(),
            }],
        }
    }

    async fn op_rename(&mut self, id: u32, old_path: Bytes, new_path: Bytes) -> Response {
        if !(self.user.can_upload && self.user.can_delete) {
            return self.permission_denied(id, "RENAME", "Permission denied: Rename not allowed");
        }
        let old_virtual = Self::virtual_path(&old_path);
        let new_virtual = Self::virtual_path(&new_path);
        let old_physical = self.jail.resolve(&old_virtual);
        let new_physical = self.jail.resolve(&new_virtual);

        if tokio::fs::symlink_metadata(&old_physical).await.is_err() {
            return self.status_response(id, "RENAME", FsError::Io(std::io::ErrorKind::NotFound.into()));
        }

        match tokio::fs::rename(&old_physical, &new_physical).await {
            Ok(()) => {
                self.audit.rename(&self.session_id, self.username(), &old_virtual, &new_virtual);
                Response::ok(id)
            }
            Err(err) => self.status_response(id, "RENAME", FsError::Io(err)),
        }
    }

    async fn op_readlink(&mut self, id: u32, path: Bytes) -> Response {
        let virtual_path = Self::virtual_path(&path);
        let physical = self.jail.resolve(&virtual_path);

        let metadata = match tokio::fs::symlink_metadata(&physical).await {
            Ok(metadata) => metadata,
            Err(err) => return self.status_response(id, "READLINK", FsError::Io(err)),
        };
        if !metadata.file_type().is_symlink() {
            return self.status_response(id, "READLINK", FsError::NotASymlink);
        }

        match tokio::fs::read_link(&physical).await {
            Ok(target) => {
                let target_virtual = self.jail.to_virtual(&target);
                Response::Name {
                    id,
                    entries: vec![NameEntry {
                        filename: target_virtual.clone(),
                        long_name: target_virtual,
                        attrs: Attrs::dummy(),
                    }],
                }
            }
            Err(err) => self.status_response(id, "READLINK", FsError::Io(err)),
        }
    }

    async fn op_symlink(&mut self, id: u32, link_path: Bytes, target_path: Bytes) -> Response {
        if !self.user.can_upload {
            return self.permission_denied(id, "SYMLINK", "Permission denied: Upload not allowed");
        }
        let link_physical = self.jail.resolve(&Self::virtual_path(&link_path));
        let target_physical = self.jail.resolve(&Self::virtual_path(&target_path));

        match tokio::fs::symlink(&target_physical, &link_physical).await {
            Ok(()) => Response::ok(id),
            Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => self.status_response(
                id,
                "SYMLINK",
                FsError::PermissionDenied(
                    "Symbolic links require administrator privileges".to_string(),
                ),
            ),
            Err(err) => self.status_response(id, "SYMLINK", FsError::Io(err)),
        }
    }
}
