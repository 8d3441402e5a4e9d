//! Client-side codec: writes outbound requests, correlates and reads
//! responses.
//!
//! Safe to share behind an `Arc` across many writer tasks calling
//! [`ClientCodec::write_request`] concurrently, while exactly one dedicated
//! reader task calls [`ClientCodec::read_response_header`] then
//! [`ClientCodec::read_response_body`] in sequence. The read and write
//! halves are locked independently so neither direction blocks the other.

use std::collections::HashMap;

use parking_lot::Mutex as SyncMutex;
use rpc_core::{CompressionTag, CompressorRegistry, RpcError, Serializer};
use rpc_proto::{read_frame, write_frame, HeaderPool, RequestHeader, ResponseHeader};
use serde::{de::DeserializeOwned, Serialize};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex as AsyncMutex;
use tracing::trace;

use crate::config::ClientCodecConfig;

/// The caller-facing result of [`ClientCodec::read_response_header`].
///
/// Carries everything [`ClientCodec::read_response_body`] needs, so the
/// two calls don't share hidden mutable state between them.
#[derive(Debug, Clone)]
pub struct ResponseEnvelope {
    /// Echoes the caller's request ID (the pending-map key).
    pub seq: u64,
    /// The method this response answers, looked up from the pending map.
    /// `None` if no matching entry was found (a stray or duplicate response).
    pub service_method: Option<String>,
    /// Empty string means success.
    pub error: String,
    compress_type: u16,
    response_len: u64,
    checksum: u32,
}

impl ResponseEnvelope {
    /// Length of the compressed body frame that follows.
    pub fn response_len(&self) -> u64 {
        self.response_len
    }
}

/// Client-side RPC codec.
pub struct ClientCodec<R, W, S: Serializer = rpc_core::CborSerializer> {
    reader: AsyncMutex<R>,
    writer: AsyncMutex<W>,
    compression: CompressionTag,
    serializer: S,
    registry: CompressorRegistry,
    pending: SyncMutex<HashMap<u64, String>>,
    header_pool: HeaderPool<RequestHeader>,
}

impl<R, W, S> ClientCodec<R, W, S>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    S: Serializer,
{
    /// Build a codec over an already-split reader/writer pair.
    pub fn new(reader: R, writer: W, config: ClientCodecConfig<S>) -> Self {
        Self {
            reader: AsyncMutex::new(reader),
            writer: AsyncMutex::new(writer),
            compression: config.compression,
            serializer: config.serializer,
            registry: config.registry,
            pending: SyncMutex::new(HashMap::new()),
            header_pool: HeaderPool::new(),
        }
    }

    /// Number of in-flight requests awaiting a response.
    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Serialize, compress, and send one request. Safe to call from many
    /// tasks concurrently; each call is atomic with respect to the wire
    /// (the header and body frames of one request are never interleaved
    /// with another's).
    pub async fn write_request<T: Serialize>(&self, seq: u64, method: &str, args: &T) -> Result<(), RpcError> {
        // Insert before any I/O so a reader that observes the response
        // before this call returns can still correlate it.
        self.pending.lock().insert(seq, method.to_string());

        let compressor = self.registry.get(self.compression.as_u16())?;
        let body = self.serializer.marshal(args)?;
        let zbody = compressor.compress(&body)?;
        let checksum = crc32fast::hash(&zbody);

        let header = self.header_pool.acquire();
        header.populate(self.compression.as_u16(), method, seq, zbody.len() as u64, checksum);
        let header_bytes = header.marshal();

        let result = async {
            let mut writer = self.writer.lock().await;
            write_frame(&mut *writer, &header_bytes).await?;
            write_frame(&mut *writer, &zbody).await?;
            writer.flush().await.map_err(RpcError::from)
        }
        .await;

        self.header_pool.release(header, RequestHeader::reset);
        trace!(seq, method, "wrote request");
        result
    }

    /// Read and parse the next response header, correlating it against the
    /// pending map. A missing pending entry is not fatal here; the caller
    /// is expected to detect and discard a stray response.
    pub async fn read_response_header(&self) -> Result<ResponseEnvelope, RpcError> {
        let frame = {
            let mut reader = self.reader.lock().await;
            read_frame(&mut *reader).await?
        };

        let header = ResponseHeader::default();
        header.unmarshal(&frame)?;
        let seq = header.id();
        let service_method = self.pending.lock().remove(&seq);

        Ok(ResponseEnvelope {
            seq,
            service_method,
            error: header.error(),
            compress_type: header.compress_type(),
            response_len: header.response_len(),
            checksum: header.checksum(),
        })
    }

    /// Read the response body frame following `envelope`. Pass `None` for
    /// `out` to drain and discard the body (e.g. after an error response).
    pub async fn read_response_body<T: DeserializeOwned>(
        &self,
        envelope: &ResponseEnvelope,
        out: Option<&mut T>,
    ) -> Result<(), RpcError> {
        let body = {
            let mut reader = self.reader.lock().await;
            read_frame(&mut *reader).await?
        };

        let Some(out) = out else {
            return Ok(());
        };

        if envelope.checksum != 0 {
            let computed = crc32fast::hash(&body);
            if computed != envelope.checksum {
                return Err(RpcError::UnexpectedChecksum { declared: envelope.checksum, computed });
            }
        }

        if envelope.compress_type != self.compression.as_u16() {
            return Err(RpcError::CompressorTypeMismatch {
                configured: self.compression.as_u16(),
                advertised: envelope.compress_type,
            });
        }

        let compressor = self.registry.get(envelope.compress_type)?;
        let raw = compressor.decompress(&body)?;
        *out = self.serializer.unmarshal(&raw)?;
        Ok(())
    }

    /// Close the underlying writer half. Idempotent; subsequent in-flight
    /// reads or writes fail with an I/O error, which the host dispatcher
    /// observes and uses to fail outstanding calls.
    pub async fn close(&self) -> Result<(), RpcError> {
        self.writer.lock().await.shutdown().await.map_err(RpcError::from)
    }
}
