//! Error taxonomy shared by the client and server codecs.
//!
//! Every codec operation returns one of these kinds as its final, terminal
//! result -- the codec itself never retries at this level. Only byte-level
//! partial I/O on a recoverable network error loops internally, inside
//! `rpc-proto::frame`.

use std::io;

use rpc_proto::{FrameError, HeaderError};
use thiserror::Error;

/// Error returned by a client or server codec operation.
#[derive(Debug, Error)]
pub enum RpcError {
    /// A header advertised a compression tag that is not registered.
    #[error("unknown compressor: tag {tag}")]
    UnknownCompressor {
        /// The unrecognized tag.
        tag: u16,
    },

    /// Header bytes were too short or malformed.
    #[error("unmarshal error: {0}")]
    Unmarshal(#[source] HeaderError),

    /// The declared checksum was non-zero and disagreed with the received body.
    #[error("unexpected checksum: declared {declared:#010x}, computed {computed:#010x}")]
    UnexpectedChecksum {
        /// Checksum carried in the header.
        declared: u32,
        /// CRC32-IEEE actually computed over the received body.
        computed: u32,
    },

    /// The response's compression tag differs from the client's configured tag.
    #[error("compressor type mismatch: configured {configured}, response advertised {advertised}")]
    CompressorTypeMismatch {
        /// Tag the client was constructed with.
        configured: u16,
        /// Tag the response actually carried.
        advertised: u16,
    },

    /// Server-side `write_response` for a sequence not in the pending map.
    #[error("invalid sequence: {seq} has no pending request")]
    InvalidSequence {
        /// The unrecognized local sequence number.
        seq: u64,
    },

    /// Propagated from the pluggable serializer.
    #[error("serializer error: {0}")]
    Serializer(String),

    /// Propagated from the underlying stream. Fatal: the dispatcher should
    /// close the connection.
    #[error("io error: {0}")]
    Io(#[source] io::Error),
}

impl From<io::Error> for RpcError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<FrameError> for RpcError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Eof => Self::Io(io::Error::new(io::ErrorKind::UnexpectedEof, "stream closed before frame")),
            FrameError::Io(e) => Self::Io(e),
            FrameError::Varint(e) => Self::Io(io::Error::new(io::ErrorKind::InvalidData, e.to_string())),
        }
    }
}

impl From<HeaderError> for RpcError {
    fn from(err: HeaderError) -> Self {
        Self::Unmarshal(err)
    }
}

impl RpcError {
    /// True for errors the host dispatcher should treat as fatal to the
    /// whole connection rather than scoped to a single in-flight call.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_are_fatal() {
        let err = RpcError::from(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
        assert!(err.is_fatal());
    }

    #[test]
    fn call_scoped_errors_are_not_fatal() {
        assert!(!RpcError::UnknownCompressor { tag: 99 }.is_fatal());
        assert!(!RpcError::InvalidSequence { seq: 1 }.is_fatal());
    }

    #[test]
    fn frame_eof_becomes_io() {
        let err = RpcError::from(FrameError::Eof);
        assert!(matches!(err, RpcError::Io(_)));
    }
}
