//! Client codec construction-time configuration.

use rpc_core::{CborSerializer, CompressionTag, CompressorRegistry, Serializer};

/// Configuration surface for a [`crate::ClientCodec`]: the compression tag
/// attached to every outbound request, the serializer used to marshal
/// arguments and unmarshal replies, and the registry of available
/// compressors. Defaults to `Raw` compression and a schema-typed CBOR
/// serializer.
pub struct ClientCodecConfig<S: Serializer = CborSerializer> {
    /// Compression tag attached to every request this client sends.
    pub compression: CompressionTag,
    /// Serializer used for request arguments and response values.
    pub serializer: S,
    /// Available compressors, keyed by wire tag.
    pub registry: CompressorRegistry,
}

impl Default for ClientCodecConfig<CborSerializer> {
    fn default() -> Self {
        Self { compression: CompressionTag::Raw, serializer: CborSerializer, registry: CompressorRegistry::with_defaults() }
    }
}

impl<S: Serializer> ClientCodecConfig<S> {
    /// Build a configuration with an explicit serializer, `Raw` compression,
    /// and the default compressor registry.
    pub fn with_serializer(serializer: S) -> Self {
        Self { compression: CompressionTag::Raw, serializer, registry: CompressorRegistry::with_defaults() }
    }

    /// Override the compression tag attached to outbound requests.
    pub fn with_compression(mut self, tag: CompressionTag) -> Self {
        self.compression = tag;
        self
    }
}
