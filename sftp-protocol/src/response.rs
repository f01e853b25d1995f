use bytes::{BufMut, Bytes, BytesMut};

use crate::attrs::Attrs;
use crate::codec::Encode;
use crate::status::{Status, StatusCode};

pub const RESP_VERSION: u8 = 2;
pub const RESP_STATUS: u8 = 101;
pub const RESP_HANDLE: u8 = 102;
pub const RESP_DATA: u8 = 103;
pub const RESP_NAME: u8 = 104;
pub const RESP_ATTRS: u8 = 105;

/// One directory entry as carried in a NAME response, §4.4.
#[derive(Debug, Clone)]
pub struct NameEntry {
    pub filename: String,
    pub long_name: String,
    pub attrs: Attrs,
}

/// Every response the subsystem can send back, §4.4 "Response encodings".
/// `Version` has no request id, matching `Request::Init`.
#[derive(Debug, Clone)]
pub enum Response {
    Version(u32),
    Status { id: u32, status: Status },
    Handle { id: u32, handle: Bytes },
    Data { id: u32, data: Bytes },
    Name { id: u32, entries: Vec<NameEntry> },
    Attrs { id: u32, attrs: Attrs },
}

impl Response {
    pub fn status(id: u32, status: Status) -> Self {
        Response::Status { id, status }
    }

    pub fn ok(id: u32) -> Self {
        Response::Status {
            id,
            status: Status::ok(),
        }
    }

    pub fn eof(id: u32) -> Self {
        Response::Status {
            id,
            status: StatusCode::Eof.to_status(""),
        }
    }

    /// Serialize into one framed packet: 4-byte big-endian length prefix
    /// followed by the opcode and payload (§3).
    pub fn encode(&self) -> Bytes {
        let mut body = BytesMut::new();
        match self {
            Response::Version(version) => {
                body.put_u8(RESP_VERSION);
                version.encode(&mut body).expect("growable buffer");
            }
            Response::Status { id, status } => {
                body.put_u8(RESP_STATUS);
                id.encode(&mut body).expect("growable buffer");
                (status.code as u32)
                    .encode(&mut body)
                    .expect("growable buffer");
                status.message.as_str().encode(&mut body).expect("growable buffer");
                "".encode(&mut body).expect("growable buffer");
            }
            Response::Handle { id, handle } => {
                body.put_u8(RESP_HANDLE);
                id.encode(&mut body).expect("growable buffer");
                handle.encode(&mut body).expect("growable buffer");
            }
            Response::Data { id, data } => {
                body.put_u8(RESP_DATA);
                id.encode(&mut body).expect("growable buffer");
                data.encode(&mut body).expect("growable buffer");
            }
            Response::Name { id, entries } => {
                body.put_u8(RESP_NAME);
                id.encode(&mut body).expect("growable buffer");
                (entries.len() as u32)
                    .encode(&mut body)
                    .expect("growable buffer");
                for entry in entries {
                    entry
                        .filename
                        .as_str()
                        .encode(&mut body)
                        .expect("growable buffer");
                    entry
                        .long_name
                        .as_str()
                        .encode(&mut body)
                        .expect("growable buffer");
                    entry.attrs.encode(&mut body).expect("growable buffer");
                }
            }
            Response::Attrs { id, attrs } => {
                body.put_u8(RESP_ATTRS);
                id.encode(&mut body).expect("growable buffer");
                attrs.encode(&mut body).expect("growable buffer");
            }
        }

        let mut framed = BytesMut::with_capacity(4 + body.len());
        framed.put_u32(body.len() as u32);
        framed.put_slice(&body);
        framed.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_frame_matches_scenario_1() {
        let frame = Response::Version(3).encode();
        assert_eq!(
            frame.as_ref(),
            [0x00, 0x00, 0x00, 0x05, 0x02, 0x00, 0x00, 0x00, 0x03]
        );
    }

    #[test]
    fn status_frame_carries_id_and_code() {
        let frame = Response::status(4, StatusCode::Ok.to_status("")).encode();
        // len(4) + opcode(1) + id(4) + code(4) + empty message(4) + empty lang(4) = 4 + 17
        assert_eq!(frame.len(), 4 + 17);
        assert_eq!(&frame[4..5], [RESP_STATUS]);
        assert_eq!(&frame[5..9], 4u32.to_be_bytes());
        assert_eq!(&frame[9..13], 0u32.to_be_bytes());
    }

    #[test]
    fn handle_frame_encodes_decimal_ascii() {
        let frame = Response::Handle {
            id: 1,
            handle: Bytes::from_static(b"1"),
        }
        .encode();
        assert_eq!(&frame[4..5], [RESP_HANDLE]);
        assert_eq!(&frame[13..14], b"1");
    }
}
