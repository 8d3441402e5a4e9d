//! Length-delimited frame I/O.
//!
//! A frame is `uvarint(len) ++ len raw bytes`. Header and body frames share
//! this exact format; one primitive pair covers both, as described in the
//! protocol's framing rationale.
//!
//! Transient I/O errors (`ErrorKind::Interrupted`) are retried in place.
//! Every other I/O failure, including a clean close mid-frame, is surfaced
//! to the caller rather than swallowed.

use std::io;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::errors::FrameError;
use crate::varint;

/// Write one frame: the varint length of `bytes` followed by `bytes`
/// itself. Does not flush; callers that write a header frame followed by a
/// body frame should flush once after both.
pub async fn write_frame<W>(writer: &mut W, bytes: &[u8]) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    let mut len_prefix = Vec::with_capacity(varint::MAX_LEN);
    varint::encode(bytes.len() as u64, &mut len_prefix);

    write_all_retrying(writer, &len_prefix).await?;
    if !bytes.is_empty() {
        write_all_retrying(writer, bytes).await?;
    }

    trace!(len = bytes.len(), "wrote frame");
    Ok(())
}

/// Read one frame. Returns an empty payload for a zero-length frame without
/// performing a body read.
pub async fn read_frame<R>(reader: &mut R) -> Result<Bytes, FrameError>
where
    R: AsyncRead + Unpin,
{
    let size = read_uvarint_retrying(reader).await?;

    if size == 0 {
        trace!("read zero-length frame");
        return Ok(Bytes::new());
    }

    let mut buf = vec![0u8; size as usize];
    read_exact_retrying(reader, &mut buf).await?;

    trace!(len = buf.len(), "read frame");
    Ok(Bytes::from(buf))
}

async fn write_all_retrying<W>(writer: &mut W, mut buf: &[u8]) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    while !buf.is_empty() {
        match writer.write(buf).await {
            Ok(0) => {
                return Err(FrameError::Io(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "write returned zero bytes",
                )));
            },
            Ok(n) => buf = &buf[n..],
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(FrameError::Io(e)),
        }
    }
    Ok(())
}

async fn read_exact_retrying<R>(reader: &mut R, mut buf: &mut [u8]) -> Result<(), FrameError>
where
    R: AsyncRead + Unpin,
{
    while !buf.is_empty() {
        match reader.read(buf).await {
            Ok(0) => {
                return Err(FrameError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed mid-frame",
                )));
            },
            Ok(n) => {
                let tmp = buf;
                buf = &mut tmp[n..];
            },
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(FrameError::Io(e)),
        }
    }
    Ok(())
}

/// Read a single varint byte-by-byte, retrying on transient errors and
/// surfacing a clean close before any byte arrived as [`FrameError::Eof`]
/// rather than a truncation error.
async fn read_uvarint_retrying<R>(reader: &mut R) -> Result<u64, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut result: u64 = 0;
    let mut shift: u32 = 0;

    loop {
        let mut byte = [0u8; 1];
        match reader.read(&mut byte).await {
            Ok(0) if shift == 0 => return Err(FrameError::Eof),
            Ok(0) => {
                return Err(FrameError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed mid-varint",
                )));
            },
            Ok(_) => {
                if shift >= 64 {
                    return Err(FrameError::from(varint::VarintError::Overflow));
                }
                result |= u64::from(byte[0] & 0x7f) << shift;
                if byte[0] & 0x80 == 0 {
                    return Ok(result);
                }
                shift += 7;
            },
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(FrameError::Io(e)),
        }
    }
}
