use bytes::{Buf, BufMut, Bytes};

use crate::Error;

/// Decode a value from the front of a byte cursor, consuming exactly as many
/// bytes as the value occupies on the wire.
pub trait Decode: Sized {
    fn decode(buf: &mut dyn Buf) -> Result<Self, Error>;
}

/// Encode a value onto the back of a growing byte buffer.
pub trait Encode {
    fn encode(&self, buf: &mut dyn BufMut) -> Result<(), Error>;
}

impl Decode for u8 {
    fn decode(buf: &mut dyn Buf) -> Result<Self, Error> {
        if buf.remaining() >= 1 {
            Ok(buf.get_u8())
        } else {
            Err(Error)
        }
    }
}

impl Encode for u8 {
    fn encode(&self, buf: &mut dyn BufMut) -> Result<(), Error> {
        if buf.remaining_mut() >= 1 {
            buf.put_u8(*self);
            Ok(())
        } else {
            Err(Error)
        }
    }
}

impl Decode for u32 {
    fn decode(buf: &mut dyn Buf) -> Result<Self, Error> {
        if buf.remaining() >= 4 {
            Ok(buf.get_u32())
        } else {
            Err(Error)
        }
    }
}

impl Encode for u32 {
    fn encode(&self, buf: &mut dyn BufMut) -> Result<(), Error> {
        if buf.remaining_mut() >= 4 {
            buf.put_u32(*self);
            Ok(())
        } else {
            Err(Error)
        }
    }
}

impl Decode for u64 {
    fn decode(buf: &mut dyn Buf) -> Result<Self, Error> {
        if buf.remaining() >= 8 {
            Ok(buf.get_u64())
        } else {
            Err(Error)
        }
    }
}

impl Encode for u64 {
    fn encode(&self, buf: &mut dyn BufMut) -> Result<(), Error> {
        if buf.remaining_mut() >= 8 {
            buf.put_u64(*self);
            Ok(())
        } else {
            Err(Error)
        }
    }
}

/// A `uint32 length || bytes` field. SFTP calls this a "string", but the
/// payload is opaque bytes on the wire (filenames aren't guaranteed UTF-8);
/// callers that need text convert at the point of use.
impl Decode for Bytes {
    fn decode(buf: &mut dyn Buf) -> Result<Self, Error> {
        let len = u32::decode(buf)? as usize;
        if buf.remaining() >= len {
            Ok(buf.copy_to_bytes(len))
        } else {
            Err(Error)
        }
    }
}

impl Encode for Bytes {
    fn encode(&self, buf: &mut dyn BufMut) -> Result<(), Error> {
        if buf.remaining_mut() < 4 + self.len() {
            return Err(Error);
        }
        (self.len() as u32).encode(buf)?;
        buf.put_slice(self);
        Ok(())
    }
}

impl Encode for &str {
    fn encode(&self, buf: &mut dyn BufMut) -> Result<(), Error> {
        let bytes = self.as_bytes();
        if buf.remaining_mut() < 4 + bytes.len() {
            return Err(Error);
        }
        (bytes.len() as u32).encode(buf)?;
        buf.put_slice(bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_u32() {
        let mut buf = Vec::new();
        42u32.encode(&mut buf).unwrap();
        let mut cursor = &buf[..];
        assert_eq!(u32::decode(&mut cursor).unwrap(), 42);
    }

    #[test]
    fn bytes_length_prefix() {
        let mut buf = Vec::new();
        Bytes::from_static(b"abc").encode(&mut buf).unwrap();
        assert_eq!(buf, [0, 0, 0, 3, b'a', b'b', b'c']);
        let mut cursor = &buf[..];
        assert_eq!(Bytes::decode(&mut cursor).unwrap(), Bytes::from_static(b"abc"));
    }

    #[test]
    fn truncated_u32_errors() {
        let mut cursor = &[0u8, 1, 2][..];
        assert!(u32::decode(&mut cursor).is_err());
    }

    #[test]
    fn truncated_string_errors() {
        // length prefix claims 10 bytes but only 2 are present
        let mut cursor = &[0u8, 0, 0, 10, b'h', b'i'][..];
        assert!(Bytes::decode(&mut cursor).is_err());
    }
}
