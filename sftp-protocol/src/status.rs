use std::fmt;

/// SSH_FX_* status codes, draft-ietf-secsh-filexfer-02 section 7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum StatusCode {
    Ok = 0,
    Eof = 1,
    NoSuchFile = 2,
    PermissionDenied = 3,
    Failure = 4,
    BadMessage = 5,
    NoConnection = 6,
    ConnectionLost = 7,
    OpUnsupported = 8,
}

impl StatusCode {
    pub fn to_status(self, message: impl Into<String>) -> Status {
        Status {
            code: self,
            message: message.into(),
        }
    }
}

impl TryFrom<u32> for StatusCode {
    type Error = ();

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => StatusCode::Ok,
            1 => StatusCode::Eof,
            2 => StatusCode::NoSuchFile,
            3 => StatusCode::PermissionDenied,
            4 => StatusCode::Failure,
            5 => StatusCode::BadMessage,
            6 => StatusCode::NoConnection,
            7 => StatusCode::ConnectionLost,
            8 => StatusCode::OpUnsupported,
            _ => return Err(()),
        })
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatusCode::Ok => "OK",
            StatusCode::Eof => "EOF",
            StatusCode::NoSuchFile => "NO_SUCH_FILE",
            StatusCode::PermissionDenied => "PERMISSION_DENIED",
            StatusCode::Failure => "FAILURE",
            StatusCode::BadMessage => "BAD_MESSAGE",
            StatusCode::NoConnection => "NO_CONNECTION",
            StatusCode::ConnectionLost => "CONNECTION_LOST",
            StatusCode::OpUnsupported => "OP_UNSUPPORTED",
        };
        f.write_str(name)
    }
}

/// A `(code, message)` pair carried by a STATUS response. The wire's trailing
/// language-tag string is always empty (§4.4) and isn't modeled here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub code: StatusCode,
    pub message: String,
}

impl Status {
    pub fn ok() -> Self {
        StatusCode::Ok.to_status("")
    }

    pub fn is_ok(&self) -> bool {
        self.code == StatusCode::Ok
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for Status {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_code_roundtrips_through_u32() {
        for code in [
            StatusCode::Ok,
            StatusCode::Eof,
            StatusCode::NoSuchFile,
            StatusCode::PermissionDenied,
            StatusCode::Failure,
            StatusCode::BadMessage,
            StatusCode::NoConnection,
            StatusCode::ConnectionLost,
            StatusCode::OpUnsupported,
        ] {
            assert_eq!(StatusCode::try_from(code as u32), Ok(code));
        }
    }

    #[test]
    fn unknown_code_rejected() {
        assert!(StatusCode::try_from(999).is_err());
    }
}
