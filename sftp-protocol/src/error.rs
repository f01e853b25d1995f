/// Wire-level decode/encode failure: not enough bytes remained in the buffer
/// for the primitive being read, or not enough capacity remained for the one
/// being written. Framing errors above the primitive level (a packet whose
/// declared length doesn't match what's on the wire) are handled by the
/// subsystem's accumulator, not here.
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("malformed SFTP packet")]
pub struct Error;
