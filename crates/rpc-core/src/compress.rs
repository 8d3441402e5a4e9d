//! Pluggable body compression.
//!
//! A [`CompressorRegistry`] maps a 16-bit wire tag to a `(compress,
//! decompress)` pair. The registry is populated once at construction and
//! is read-only thereafter; lookups on an unregistered tag return
//! [`crate::error::RpcError::UnknownCompressor`].

use std::collections::HashMap;
use std::io::{self, Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;

use crate::error::RpcError;

/// Wire tag naming a registered compress/decompress pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CompressionTag {
    /// Pass-through, identity on both directions.
    Raw = 0,
    /// DEFLATE with gzip framing.
    Gzip = 1,
    /// Snappy block format.
    Snappy = 2,
    /// DEFLATE with zlib framing.
    Zlib = 3,
}

impl CompressionTag {
    /// Decode a tag carried on the wire, if registered as one of the
    /// built-in kinds.
    pub fn from_u16(tag: u16) -> Option<Self> {
        match tag {
            0 => Some(Self::Raw),
            1 => Some(Self::Gzip),
            2 => Some(Self::Snappy),
            3 => Some(Self::Zlib),
            _ => None,
        }
    }

    /// The wire value for this tag.
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

/// A body compressor/decompressor pair, registered under a wire tag.
pub trait Compressor: Send + Sync {
    /// Compress `input`, producing the bytes written to the body frame.
    fn compress(&self, input: &[u8]) -> Result<Vec<u8>, RpcError>;

    /// Reverse [`Compressor::compress`].
    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>, RpcError>;
}

struct RawCompressor;

impl Compressor for RawCompressor {
    fn compress(&self, input: &[u8]) -> Result<Vec<u8>, RpcError> {
        Ok(input.to_vec())
    }

    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>, RpcError> {
        Ok(input.to_vec())
    }
}

struct GzipCompressor;

impl Compressor for GzipCompressor {
    fn compress(&self, input: &[u8]) -> Result<Vec<u8>, RpcError> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(input).map_err(RpcError::from)?;
        encoder.finish().map_err(RpcError::from)
    }

    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>, RpcError> {
        let mut decoder = flate2::read::MultiGzDecoder::new(input);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).map_err(RpcError::from)?;
        Ok(out)
    }
}

struct ZlibCompressor;

impl Compressor for ZlibCompressor {
    fn compress(&self, input: &[u8]) -> Result<Vec<u8>, RpcError> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(input).map_err(RpcError::from)?;
        encoder.finish().map_err(RpcError::from)
    }

    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>, RpcError> {
        let mut decoder = ZlibDecoder::new(input);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).map_err(RpcError::from)?;
        Ok(out)
    }
}

struct SnappyCompressor;

impl Compressor for SnappyCompressor {
    fn compress(&self, input: &[u8]) -> Result<Vec<u8>, RpcError> {
        let mut encoder = snap::write::FrameEncoder::new(Vec::new());
        encoder.write_all(input).map_err(RpcError::from)?;
        encoder
            .into_inner()
            .map_err(|e| RpcError::from(io::Error::new(io::ErrorKind::Other, e.to_string())))
    }

    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>, RpcError> {
        let mut decoder = snap::read::FrameDecoder::new(input);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).map_err(RpcError::from)?;
        Ok(out)
    }
}

/// Read-only, constructed-once mapping from wire tag to [`Compressor`].
///
/// Prefer an instance passed explicitly into client/server codec
/// constructors over a process-wide global; [`CompressorRegistry::with_defaults`]
/// exists only as a convenience for callers who don't need to customize it.
pub struct CompressorRegistry {
    compressors: HashMap<u16, Box<dyn Compressor>>,
}

impl CompressorRegistry {
    /// Build an empty registry with no compressors registered.
    pub fn empty() -> Self {
        Self { compressors: HashMap::new() }
    }

    /// Build a registry with Raw, Gzip, Snappy, and Zlib registered under
    /// their standard tags.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(CompressionTag::Raw.as_u16(), Box::new(RawCompressor));
        registry.register(CompressionTag::Gzip.as_u16(), Box::new(GzipCompressor));
        registry.register(CompressionTag::Snappy.as_u16(), Box::new(SnappyCompressor));
        registry.register(CompressionTag::Zlib.as_u16(), Box::new(ZlibCompressor));
        registry
    }

    /// Register (or replace) the compressor for `tag`.
    pub fn register(&mut self, tag: u16, compressor: Box<dyn Compressor>) {
        self.compressors.insert(tag, compressor);
    }

    /// Look up the compressor for `tag`.
    pub fn get(&self, tag: u16) -> Result<&dyn Compressor, RpcError> {
        self.compressors.get(&tag).map(AsRef::as_ref).ok_or(RpcError::UnknownCompressor { tag })
    }
}

impl Default for CompressorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
