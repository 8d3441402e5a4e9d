//! Unsigned LEB128 varint encoding.
//!
//! Used for frame length prefixes and the length-prefixed strings embedded
//! in request/response headers. Each byte carries 7 bits of payload; the
//! high bit marks continuation.

use thiserror::Error;

/// Worst-case encoded length of a `u64` varint (`ceil(64 / 7)`).
pub const MAX_LEN: usize = 10;

/// Failure decoding a varint from a byte buffer.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum VarintError {
    /// Buffer ended before a terminating byte (high bit clear) was seen.
    #[error("varint truncated before terminating byte")]
    Truncated,
    /// Encoded value does not fit in a `u64`.
    #[error("varint overflows u64")]
    Overflow,
}

/// Append the varint encoding of `value` to `out`.
pub fn encode(mut value: u64, out: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Decode a varint from the start of `buf`.
///
/// Returns the decoded value and the number of bytes consumed.
pub fn decode(buf: &[u8]) -> Result<(u64, usize), VarintError> {
    let mut result: u64 = 0;
    let mut shift: u32 = 0;

    for (i, &byte) in buf.iter().enumerate() {
        if shift >= 64 {
            return Err(VarintError::Overflow);
        }
        result |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Ok((result, i + 1));
        }
        shift += 7;
    }

    Err(VarintError::Truncated)
}
