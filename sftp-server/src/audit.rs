use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

const TIMESTAMP_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]");

/// §6 "Fire-and-forget methods". One entry per audit record line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Connected,
    ConnectionFailed,
    Disconnected,
    AuthSuccess,
    AuthFailed,
    FileRead,
    FileWrite,
    FileDelete,
    DirCreate,
    DirDelete,
    DirList,
    Rename,
    Error,
}

impl AuditAction {
    fn as_str(self) -> &'static str {
        match self {
            AuditAction::Connected => "CONNECTED",
            AuditAction::ConnectionFailed => "CONNECTION_FAILED",
            AuditAction::Disconnected => "DISCONNECTED",
            AuditAction::AuthSuccess => "AUTH_SUCCESS",
            AuditAction::AuthFailed => "AUTH_FAILED",
            AuditAction::FileRead => "FILE_READ",
            AuditAction::FileWrite => "FILE_WRITE",
            AuditAction::FileDelete => "FILE_DELETE",
            AuditAction::DirCreate => "DIR_CREATE",
            AuditAction::DirDelete => "DIR_DELETE",
            AuditAction::DirList => "DIR_LIST",
            AuditAction::Rename => "RENAME",
            AuditAction::Error => "ERROR",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub timestamp: OffsetDateTime,
    pub session_id: String,
    pub username: String,
    pub action: AuditAction,
    pub target: Option<String>,
    pub details: Option<String>,
}

impl AuditEvent {
    /// The on-disk line format, §6: `TIMESTAMP|session|user|ACTION|target|details`,
    /// missing fields written as `-`.
    pub fn to_line(&self) -> String {
        let timestamp = self
            .timestamp
            .format(TIMESTAMP_FORMAT)
            .unwrap_or_else(|_| "-".to_string());
        format!(
            "{}|{}|{}|{}|{}|{}\n",
            timestamp,
            self.session_id,
            self.username,
            self.action.as_str(),
            self.target.as_deref().unwrap_or("-"),
            self.details.as_deref().unwrap_or("-"),
        )
    }
}

/// The bounded producer/consumer audit queue of §5: many subsystems enqueue,
/// one task drains and appends to the sink, and the queue drops events on
/// overflow rather than ever block a subsystem's single-writer serialization.
pub struct AuditSink {
    tx: mpsc::Sender<AuditEvent>,
}

/// Queue capacity fixed at 1000 events, §5.
pub const AUDIT_QUEUE_CAPACITY: usize = 1000;

impl AuditSink {
    /// Spawn the writer task and return a handle plus its join handle (the
    /// caller decides whether/how to await orderly shutdown).
    pub fn spawn<W>(mut writer: W) -> (Self, JoinHandle<()>)
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, mut rx) = mpsc::channel(AUDIT_QUEUE_CAPACITY);

        let join = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let line = event.to_line();
                if let Err(err) = writer.write_all(line.as_bytes()).await {
                    warn!(error = %err, "audit sink write failed");
                }
            }
            let _ = writer.flush().await;
        });

        (AuditSink { tx }, join)
    }

    fn emit(&self, event: AuditEvent) {
        if self.tx.try_send(event).is_err() {
            warn!("audit queue full or closed, dropping event");
        }
    }

    fn now(session_id: &str, username: &str, action: AuditAction) -> AuditEvent {
        AuditEvent {
            timestamp: OffsetDateTime::now_utc(),
            session_id: session_id.to_string(),
            username: username.to_string(),
            action,
            target: None,
            details: None,
        }
    }

    pub fn connected(&self, session_id: &str, username: &str) {
        self.emit(Self::now(session_id, username, AuditAction::Connected));
    }

    pub fn connection_failed(&self, session_id: &str, details: &str) {
        let mut event = Self::now(session_id, "-", AuditAction::ConnectionFailed);
        event.details = Some(details.to_string());
        self.emit(event);
    }

    pub fn disconnected(&self, session_id: &str, username: &str) {
        self.emit(Self::now(session_id, username, AuditAction::Disconnected));
    }

    pub fn auth_success(&self, session_id: &str, username: &str) {
        self.emit(Self::now(session_id, username, AuditAction::AuthSuccess));
    }

    pub fn auth_failed(&self, session_id: &str, username: &str) {
        self.emit(Self::now(session_id, username, AuditAction::AuthFailed));
    }

    pub fn file_read(&self, session_id: &str, username: &str, target: &str) {
        let mut event = Self::now(session_id, username, AuditAction::FileRead);
        event.target = Some(target.to_string());
        self.emit(event);
    }

    pub fn file_write(&self, session_id: &str, username: &str, target: &str) {
        let mut event = Self::now(session_id, username, AuditAction::FileWrite);
        event.target = Some(target.to_string());
        self.emit(event);
    }

    pub fn file_delete(&self, session_id: &str, username: &str, target: &str) {
        let mut event = Self::now(session_id, username, AuditAction::FileDelete);
        event.target = Some(target.to_string());
        self.emit(event);
    }

    pub fn dir_create(&self, session_id: &str, username: &str, target: &str) {
        let mut event = Self::now(session_id, username, AuditAction::DirCreate);
        event.target = Some(target.to_string());
        self.emit(event);
    }

    pub fn dir_delete(&self, session_id: &str, username: &str, target: &str) {
        let mut event = Self::now(session_id, username, AuditAction::DirDelete);
        event.target = Some(target.to_string());
        self.emit(event);
    }

    pub fn dir_list(&self, session_id: &str, username: &str, target: &str) {
        let mut event = Self::now(session_id, username, AuditAction::DirList);
        event.target = Some(target.to_string());
        self.emit(event);
    }

    pub fn rename(&self, session_id: &str, username: &str, from: &str, to: &str) {
        let mut event = Self::now(session_id, username, AuditAction::Rename);
        event.target = Some(from.to_string());
        event.details = Some(to.to_string());
        self.emit(event);
    }

    pub fn error(&self, session_id: &str, username: &str, opcode: &str, message: &str) {
        let mut event = Self::now(session_id, username, AuditAction::Error);
        event.target = Some(opcode.to_string());
        event.details = Some(message.to_string());
        self.emit(event);
    }
}
