//! Per-user jailed SFTP v3 subsystem and session orchestration, built on top
//! of [`sftp_protocol`]'s wire codec. This crate owns everything that needs a
//! filesystem, a handle table, and an SSH channel: path containment, upload
//! ceilings, the audit trail, and the session that wires a `russh` channel to
//! one [`Subsystem`] instance per `sftp` subsystem request.

mod audit;
mod error;
mod handles;
mod jail;
mod metadata;
mod session;
mod subsystem;
mod user;

pub use audit::{AuditAction, AuditEvent, AuditSink, AUDIT_QUEUE_CAPACITY};
pub use error::FsError;
pub use handles::{AccessMode, DirHandle, FileHandle, HandleTable};
pub use jail::Jail;
pub use session::{run, ServerConfig, SftpServer};
pub use subsystem::{IdleProbe, Subsystem};
pub use user::{UserAccount, UserStore};
