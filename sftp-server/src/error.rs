use sftp_protocol::StatusCode;

/// Domain-specific failure shape a per-opcode handler reasons about, before
/// it gets narrowed down to a single SSH_FX status code (§7). Handlers match
/// on this rather than re-deriving intent from `std::io::ErrorKind` strings
/// at every call site.
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid handle")]
    InvalidHandle,

    #[error("{0}")]
    PermissionDenied(String),

    #[error("Upload size limit exceeded")]
    UploadCeilingExceeded,

    #[error("Not a symbolic link")]
    NotASymlink,
}

impl FsError {
    /// The SSH_FX code this failure maps to, and the message text carried in
    /// the STATUS response (§7).
    pub fn to_status_parts(&self) -> (StatusCode, String) {
        match self {
            FsError::Io(err) => match err.kind() {
                std::io::ErrorKind::NotFound => (StatusCode::NoSuchFile, err.to_string()),
                std::io::ErrorKind::PermissionDenied => {
                    (StatusCode::PermissionDenied, err.to_string())
                }
                _ => (StatusCode::Failure, err.to_string()),
            },
            FsError::InvalidHandle => (StatusCode::Failure, self.to_string()),
            FsError::PermissionDenied(_) => (StatusCode::PermissionDenied, self.to_string()),
            FsError::UploadCeilingExceeded => (StatusCode::Failure, self.to_string()),
            FsError::NotASymlink => (StatusCode::NoSuchFile, self.to_string()),
        }
    }
}
