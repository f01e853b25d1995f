//! Wire codec and message types for the SFTP v3 protocol
//! (draft-ietf-secsh-filexfer-02). This crate has no filesystem or async
//! runtime dependency: it only turns bytes into typed requests and typed
//! responses back into bytes.

mod attrs;
mod codec;
mod error;
mod request;
mod response;
mod status;

pub use attrs::{Attrs, Owner, Time, DEFAULT_DIR_PERMISSIONS, DEFAULT_FILE_PERMISSIONS};
pub use codec::{Decode, Encode};
pub use error::Error;
pub use request::{
    HandleAttrsRequest, HandleRequest, OpenRequest, PathAttrsRequest, PathRequest, ReadRequest,
    RenameRequest, Request, SymlinkRequest, WriteRequest,
};
pub use response::{NameEntry, Response};
pub use status::{Status, StatusCode};
