//! Error types for framing and header (de)serialization.

use std::io;

use thiserror::Error;

use crate::varint::VarintError;

/// Failure reading or writing a length-delimited frame.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The stream was closed cleanly before any bytes of a new frame
    /// arrived. Distinguished from [`FrameError::Io`] so a caller mid-stream
    /// (e.g. a server's request loop) can treat it as "peer hung up" rather
    /// than a corrupted frame.
    #[error("stream closed before next frame")]
    Eof,

    /// The stream failed, or closed partway through a frame.
    #[error("frame io error: {0}")]
    Io(#[source] io::Error),

    /// The size prefix itself was malformed.
    #[error("frame length prefix invalid: {0}")]
    Varint(#[source] VarintError),
}

impl From<io::Error> for FrameError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<VarintError> for FrameError {
    fn from(err: VarintError) -> Self {
        Self::Varint(err)
    }
}

/// Failure marshaling or unmarshaling a [`crate::header::RequestHeader`] or
/// [`crate::header::ResponseHeader`].
///
/// Corresponds to the single "unmarshal error" kind in the wire contract;
/// the variants here exist for diagnostics only, callers that just need the
/// taxonomy kind should match on `HeaderError` as one failure class.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HeaderError {
    /// Buffer ended before a fixed-width or length-prefixed field was fully
    /// read.
    #[error("header buffer truncated at field `{field}`")]
    Truncated {
        /// Name of the field being read when the buffer ran out.
        field: &'static str,
    },

    /// A length-prefixed string field was not valid UTF-8.
    #[error("header field `{field}` is not valid utf-8")]
    InvalidUtf8 {
        /// Name of the offending field.
        field: &'static str,
    },

    /// A varint field (id, length, string length) overflowed or was
    /// malformed.
    #[error("header field `{field}` has an invalid varint: {source}")]
    InvalidVarint {
        /// Name of the offending field.
        field: &'static str,
        /// Underlying varint decode failure.
        #[source]
        source: VarintError,
    },
}
