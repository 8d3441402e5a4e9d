//! Server-side codec: consumes inbound requests, rewrites the caller's
//! request identifier to a locally-generated sequence for the host
//! dispatcher, and stitches the original identifier plus the negotiated
//! compression back onto the response.
//!
//! One dedicated reader task calls [`ServerCodec::read_request_header`]
//! then [`ServerCodec::read_request_body`] in sequence; many writer tasks
//! may call [`ServerCodec::write_response`] concurrently as dispatcher
//! workers finish.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex as SyncMutex;
use rpc_core::{CompressorRegistry, RpcError, Serializer};
use rpc_proto::{read_frame, write_frame, HeaderPool, RequestHeader, ResponseHeader};
use serde::{de::DeserializeOwned, Serialize};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex as AsyncMutex;
use tracing::trace;

use crate::config::ServerCodecConfig;

/// Per-call bookkeeping carried from the read path to the write path,
/// keyed by the server's locally-generated sequence number.
struct PendingCall {
    original_id: u64,
    compression_tag: u16,
}

/// The caller-facing result of [`ServerCodec::read_request_header`].
#[derive(Debug, Clone)]
pub struct RequestEnvelope {
    /// Locally-generated, strictly monotonic sequence number for this call.
    pub seq: u64,
    /// Fully-qualified method name the dispatcher should invoke.
    pub service_method: String,
    compress_type: u16,
    request_len: u64,
    checksum: u32,
}

impl RequestEnvelope {
    /// Length of the compressed body frame that follows.
    pub fn request_len(&self) -> u64 {
        self.request_len
    }
}

/// What [`ServerCodec::write_response`] sends back to the caller.
#[derive(Debug, Clone)]
pub struct ResponseDescriptor {
    /// The local sequence number from the matching [`RequestEnvelope`].
    pub seq: u64,
    /// Empty string means success. If non-empty, the body is forced empty
    /// regardless of what's passed to `write_response`.
    pub error: String,
}

/// Server-side RPC codec.
pub struct ServerCodec<R, W, S: Serializer = rpc_core::CborSerializer> {
    reader: AsyncMutex<R>,
    writer: AsyncMutex<W>,
    serializer: S,
    registry: CompressorRegistry,
    seq: AtomicU64,
    pending: SyncMutex<HashMap<u64, PendingCall>>,
    request_header: RequestHeader,
    response_pool: HeaderPool<ResponseHeader>,
}

impl<R, W, S> ServerCodec<R, W, S>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    S: Serializer,
{
    /// Build a codec over an already-split reader/writer pair.
    pub fn new(reader: R, writer: W, config: ServerCodecConfig<S>) -> Self {
        Self {
            reader: AsyncMutex::new(reader),
            writer: AsyncMutex::new(writer),
            serializer: config.serializer,
            registry: config.registry,
            seq: AtomicU64::new(0),
            pending: SyncMutex::new(HashMap::new()),
            request_header: RequestHeader::default(),
            response_pool: HeaderPool::new(),
        }
    }

    /// Number of in-flight calls awaiting a response.
    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Read and parse the next request header, assigning it a fresh local
    /// sequence number.
    ///
    /// A frame-read failure -- including a clean close -- is always
    /// surfaced here rather than swallowed, so the host dispatcher can
    /// close the session instead of busy-looping on a dead connection.
    pub async fn read_request_header(&self) -> Result<RequestEnvelope, RpcError> {
        let frame = {
            let mut reader = self.reader.lock().await;
            read_frame(&mut *reader).await?
        };

        self.request_header.unmarshal(&frame)?;

        let local_seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let original_id = self.request_header.id();
        let compress_type = self.request_header.compress_type();

        self.pending.lock().insert(local_seq, PendingCall { original_id, compression_tag: compress_type });

        trace!(local_seq, original_id, "read request header");

        Ok(RequestEnvelope {
            seq: local_seq,
            service_method: self.request_header.method(),
            compress_type,
            request_len: self.request_header.request_len(),
            checksum: self.request_header.checksum(),
        })
    }

    /// Read the request body frame following `envelope`.
    pub async fn read_request_body<T: DeserializeOwned>(
        &self,
        envelope: &RequestEnvelope,
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

        let compressor = self.registry.get(envelope.compress_type)?;
        let raw = compressor.decompress(&body)?;
        *out = self.serializer.unmarshal(&raw)?;
        Ok(())
    }

    /// Serialize, compress, and send one response, restoring the caller's
    /// original request ID and the compression tag pinned at request time.
    pub async fn write_response<V: Serialize>(
        &self,
        resp: ResponseDescriptor,
        value: Option<&V>,
    ) -> Result<(), RpcError> {
        let ctx = self.pending.lock().remove(&resp.seq).ok_or(RpcError::InvalidSequence { seq: resp.seq })?;

        // Errored calls always carry an empty body, regardless of what the
        // caller passed.
        let value = if resp.error.is_empty() { value } else { None };

        let compressor = self.registry.get(ctx.compression_tag)?;
        let body = match value {
            Some(v) => self.serializer.marshal(v)?,
            None => Vec::new(),
        };
        let zbody = compressor.compress(&body)?;
        let checksum = crc32fast::hash(&zbody);

        let header = self.response_pool.acquire();
        header.populate(ctx.compression_tag, ctx.original_id, resp.error.as_str(), zbody.len() as u64, checksum);
        let header_bytes = header.marshal();

        let result = async {
            let mut writer = self.writer.lock().await;
            write_frame(&mut *writer, &header_bytes).await?;
            write_frame(&mut *writer, &zbody).await?;
            writer.flush().await.map_err(RpcError::from)
        }
        .await;

        self.response_pool.release(header, ResponseHeader::reset);
        trace!(seq = resp.seq, original_id = ctx.original_id, "wrote response");
        result
    }

    /// Close the underlying writer half. Idempotent.
    pub async fn close(&self) -> Result<(), RpcError> {
        self.writer.lock().await.shutdown().await.map_err(RpcError::from)
    }
}
