use bytes::{Buf, Bytes};

use crate::attrs::Attrs;
use crate::codec::Decode;
use crate::Error;

pub const OP_INIT: u8 = 1;
pub const OP_OPEN: u8 = 3;
pub const OP_CLOSE: u8 = 4;
pub const OP_READ: u8 = 5;
pub const OP_WRITE: u8 = 6;
pub const OP_LSTAT: u8 = 7;
pub const OP_FSTAT: u8 = 8;
pub const OP_SETSTAT: u8 = 9;
pub const OP_FSETSTAT: u8 = 10;
pub const OP_OPENDIR: u8 = 11;
pub const OP_READDIR: u8 = 12;
pub const OP_REMOVE: u8 = 13;
pub const OP_MKDIR: u8 = 14;
pub const OP_RMDIR: u8 = 15;
pub const OP_REALPATH: u8 = 16;
pub const OP_STAT: u8 = 17;
pub const OP_RENAME: u8 = 18;
pub const OP_READLINK: u8 = 19;
pub const OP_SYMLINK: u8 = 20;

#[derive(Debug, Clone)]
pub struct OpenRequest {
    pub path: Bytes,
    pub pflags: u32,
    pub attrs: Attrs,
}

#[derive(Debug, Clone)]
pub struct HandleRequest {
    pub handle: Bytes,
}

#[derive(Debug, Clone)]
pub struct ReadRequest {
    pub handle: Bytes,
    pub offset: u64,
    pub length: u32,
}

#[derive(Debug, Clone)]
pub struct WriteRequest {
    pub handle: Bytes,
    pub offset: u64,
    pub data: Bytes,
}

#[derive(Debug, Clone)]
pub struct PathRequest {
    pub path: Bytes,
}

#[derive(Debug, Clone)]
pub struct PathAttrsRequest {
    pub path: Bytes,
    pub attrs: Attrs,
}

#[derive(Debug, Clone)]
pub struct HandleAttrsRequest {
    pub handle: Bytes,
    pub attrs: Attrs,
}

#[derive(Debug, Clone)]
pub struct RenameRequest {
    pub old_path: Bytes,
    pub new_path: Bytes,
}

#[derive(Debug, Clone)]
pub struct SymlinkRequest {
    pub link_path: Bytes,
    pub target_path: Bytes,
}

/// Every opcode the subsystem dispatches, §4.4. `Init` carries no request id
/// on the wire (draft-02 treats INIT/VERSION as the one id-less pair).
#[derive(Debug, Clone)]
pub enum Request {
    Init { version: u32 },
    Open(OpenRequest),
    Close(HandleRequest),
    Read(ReadRequest),
    Write(WriteRequest),
    LStat(PathRequest),
    FStat(HandleRequest),
    SetStat(PathAttrsRequest),
    FSetStat(HandleAttrsRequest),
    OpenDir(PathRequest),
    ReadDir(HandleRequest),
    Remove(PathRequest),
    MkDir(PathAttrsRequest),
    RmDir(PathRequest),
    RealPath(PathRequest),
    Stat(PathRequest),
    Rename(RenameRequest),
    ReadLink(PathRequest),
    Symlink(SymlinkRequest),
}

impl Request {
    /// Decode the payload that follows the opcode byte. For every opcode but
    /// `INIT` this starts with the `u32` request id (§3 invariant 3); the
    /// returned id is `0` for `INIT`, which has none.
    pub fn decode(opcode: u8, buf: &mut dyn Buf) -> Result<(u32, Request), Error> {
        if opcode == OP_INIT {
            let version = u32::decode(buf)?;
            return Ok((0, Request::Init { version }));
        }

        let id = u32::decode(buf)?;
        let request = match opcode {
            OP_OPEN => {
                let path = Bytes::decode(buf)?;
                let pflags = u32::decode(buf)?;
                let attrs = Attrs::decode(buf)?;
                Request::Open(OpenRequest { path, pflags, attrs })
            }
            OP_CLOSE => Request::Close(HandleRequest {
                handle: Bytes::decode(buf)?,
            }),
            OP_READ => {
                let handle = Bytes::decode(buf)?;
                let offset = u64::decode(buf)?;
                let length = u32::decode(buf)?;
                Request::Read(ReadRequest {
                    handle,
                    offset,
                    length,
                })
            }
            OP_WRITE => {
                let handle = Bytes::decode(buf)?;
                let offset = u64::decode(buf)?;
                let data = Bytes::decode(buf)?;
                Request::Write(WriteRequest {
                    handle,
                    offset,
                    data,
                })
            }
            OP_LSTAT => Request::LStat(PathRequest {
                path: Bytes::decode(buf)?,
            }),
            OP_FSTAT => Request::FStat(HandleRequest {
                handle: Bytes::decode(buf)?,
            }),
            OP_SETSTAT => {
                let path = Bytes::decode(buf)?;
                let attrs = Attrs::decode(buf)?;
                Request::SetStat(PathAttrsRequest { path, attrs })
            }
            OP_FSETSTAT => {
                let handle = Bytes::decode(buf)?;
                let attrs = Attrs::decode(buf)?;
                Request::FSetStat(HandleAttrsRequest { handle, attrs })
            }
            OP_OPENDIR => Request::OpenDir(PathRequest {
                path: Bytes::decode(buf)?,
            }),
            OP_READDIR => Request::ReadDir(HandleRequest {
                handle: Bytes::decode(buf)?,
            }),
            OP_REMOVE => Request::Remove(PathRequest {
                path: Bytes::decode(buf)?,
            }),
            OP_MKDIR => {
                let path = Bytes::decode(buf)?;
                let attrs = Attrs::decode(buf)?;
                Request::MkDir(PathAttrsRequest { path, attrs })
            }
            OP_RMDIR => Request::RmDir(PathRequest {
                path: Bytes::decode(buf)?,
            }),
            OP_REALPATH => Request::RealPath(PathRequest {
                path: Bytes::decode(buf)?,
            }),
            OP_STAT => Request::Stat(PathRequest {
                path: Bytes::decode(buf)?,
            }),
            OP_RENAME => {
                let old_path = Bytes::decode(buf)?;
                let new_path = Bytes::decode(buf)?;
                Request::Rename(RenameRequest { old_path, new_path })
            }
            OP_READLINK => Request::ReadLink(PathRequest {
                path: Bytes::decode(buf)?,
            }),
            OP_SYMLINK => {
                let link_path = Bytes::decode(buf)?;
                let target_path = Bytes::decode(buf)?;
                Request::Symlink(SymlinkRequest {
                    link_path,
                    target_path,
                })
            }
            _ => return Err(Error),
        };
        Ok((id, request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Encode;

    #[test]
    fn decodes_init() {
        let mut buf = Vec::new();
        3u32.encode(&mut buf).unwrap();
        let mut cursor = &buf[..];
        let (id, request) = Request::decode(OP_INIT, &mut cursor).unwrap();
        assert_eq!(id, 0);
        matches!(request, Request::Init { version: 3 });
    }

    #[test]
    fn decodes_open_with_attrs() {
        let mut buf = Vec::new();
        7u32.encode(&mut buf).unwrap();
        Bytes::from_static(b"/a").encode(&mut buf).unwrap();
        0x1Au32.encode(&mut buf).unwrap();
        Attrs::default().encode(&mut buf).unwrap();
        let mut cursor = &buf[..];
        let (id, request) = Request::decode(OP_OPEN, &mut cursor).unwrap();
        assert_eq!(id, 7);
        match request {
            Request::Open(open) => {
                assert_eq!(open.path, Bytes::from_static(b"/a"));
                assert_eq!(open.pflags, 0x1A);
            }
            _ => panic!("expected Open"),
        }
    }

    #[test]
    fn unknown_opcode_still_reads_id_when_present() {
        let mut buf = Vec::new();
        99u32.encode(&mut buf).unwrap();
        let mut cursor = &buf[..];
        // Request::decode itself rejects unknown opcodes; the subsystem is
        // responsible for the "try to recover an id anyway" fallback (§4.4).
        assert!(Request::decode(250, &mut cursor).is_err());
    }
}
