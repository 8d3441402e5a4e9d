//! Server codec construction-time configuration.

use rpc_core::{CborSerializer, CompressorRegistry, Serializer};

/// Configuration surface for a [`crate::ServerCodec`]. Compression is not
/// configured here: it's dictated per call by the client's request header
/// and echoed back pinned to that request.
pub struct ServerCodecConfig<S: Serializer = CborSerializer> {
    /// Serializer used for request arguments and response values.
    pub serializer: S,
    /// Available compressors, keyed by wire tag.
    pub registry: CompressorRegistry,
}

impl Default for ServerCodecConfig<CborSerializer> {
    fn default() -> Self {
        Self { serializer: CborSerializer, registry: CompressorRegistry::with_defaults() }
    }
}

impl<S: Serializer> ServerCodecConfig<S> {
    /// Build a configuration with an explicit serializer and the default
    /// compressor registry.
    pub fn with_serializer(serializer: S) -> Self {
        Self { serializer, registry: CompressorRegistry::with_defaults() }
    }
}
