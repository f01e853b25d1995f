use bytes::{Buf, BufMut};

use crate::codec::{Decode, Encode};
use crate::Error;

pub const ATTR_SIZE: u32 = 0x0000_0001;
pub const ATTR_UIDGID: u32 = 0x0000_0002;
pub const ATTR_PERMISSIONS: u32 = 0x0000_0004;
pub const ATTR_ACMODTIME: u32 = 0x0000_0008;

/// Default `permissions` value handed out for directory listings and STAT
/// responses: `S_IFDIR | 0775`.
pub const DEFAULT_DIR_PERMISSIONS: u32 = 0x41FD;
/// Default `permissions` value handed out for regular files: `S_IFREG | 0644`.
pub const DEFAULT_FILE_PERMISSIONS: u32 = 0x81A4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Owner {
    pub uid: u32,
    pub gid: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Time {
    pub atime: u32,
    pub mtime: u32,
}

/// The bitset-gated `(flags, size?, uid?, gid?, permissions?, atime?, mtime?)`
/// tuple from draft-ietf-secsh-filexfer-02 section 5. Each optional field is
/// present on the wire iff its bit is set in `flags`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Attrs {
    pub size: Option<u64>,
    pub owner: Option<Owner>,
    pub permissions: Option<u32>,
    pub time: Option<Time>,
}

impl Attrs {
    pub fn for_file(size: u64) -> Self {
        Attrs {
            size: Some(size),
            owner: Some(Owner::default()),
            permissions: Some(DEFAULT_FILE_PERMISSIONS),
            time: Some(Time::default()),
        }
    }

    pub fn for_file_with_times(size: u64, atime: u32, mtime: u32) -> Self {
        Attrs {
            size: Some(size),
            owner: Some(Owner::default()),
            permissions: Some(DEFAULT_FILE_PERMISSIONS),
            time: Some(Time { atime, mtime }),
        }
    }

    pub fn for_dir_with_times(atime: u32, mtime: u32) -> Self {
        Attrs {
            size: Some(0),
            owner: Some(Owner::default()),
            permissions: Some(DEFAULT_DIR_PERMISSIONS),
            time: Some(Time { atime, mtime }),
        }
    }

    /// The "dummy" attrs block REALPATH/READLINK responses are allowed to
    /// carry: zero times permitted, no size/ownership claims.
    pub fn dummy() -> Self {
        Attrs::default()
    }
}

impl Decode for Attrs {
    fn decode(buf: &mut dyn Buf) -> Result<Self, Error> {
        let flags = u32::decode(buf)?;

        let size = if flags & ATTR_SIZE != 0 {
            Some(u64::decode(buf)?)
        } else {
            None
        };

        let owner = if flags & ATTR_UIDGID != 0 {
            let uid = u32::decode(buf)?;
            let gid = u32::decode(buf)?;
            Some(Owner { uid, gid })
        } else {
            None
        };

        let permissions = if flags & ATTR_PERMISSIONS != 0 {
            Some(u32::decode(buf)?)
        } else {
            None
        };

        let time = if flags & ATTR_ACMODTIME != 0 {
            let atime = u32::decode(buf)?;
            let mtime = u32::decode(buf)?;
            Some(Time { atime, mtime })
        } else {
            None
        };

        Ok(Attrs {
            size,
            owner,
            permissions,
            time,
        })
    }
}

impl Encode for Attrs {
    fn encode(&self, buf: &mut dyn BufMut) -> Result<(), Error> {
        let mut flags = 0u32;
        if self.size.is_some() {
            flags |= ATTR_SIZE;
        }
        if self.owner.is_some() {
            flags |= ATTR_UIDGID;
        }
        if self.permissions.is_some() {
            flags |= ATTR_PERMISSIONS;
        }
        if self.time.is_some() {
            flags |= ATTR_ACMODTIME;
        }

        flags.encode(buf)?;
        if let Some(size) = self.size {
            size.encode(buf)?;
        }
        if let Some(owner) = self.owner {
            owner.uid.encode(buf)?;
            owner.gid.encode(buf)?;
        }
        if let Some(permissions) = self.permissions {
            permissions.encode(buf)?;
        }
        if let Some(time) = self.time {
            time.atime.encode(buf)?;
            time.mtime.encode(buf)?;
        }
        Ok(())
    }
}
