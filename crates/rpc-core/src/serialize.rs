//! Pluggable message serialization.
//!
//! The codec calls only [`Serializer::marshal`] / [`Serializer::unmarshal`];
//! it never inspects the encoded bytes. Two reference implementations are
//! provided: a schema-typed CBOR serializer and a schema-less JSON
//! serializer, matching the two reference serializers called out as living
//! outside the core codec.

use serde::{de::DeserializeOwned, Serialize};

use crate::error::RpcError;

/// Marshals a typed value to bytes and back, independent of framing,
/// compression, or header bookkeeping.
pub trait Serializer: Send + Sync {
    /// Encode `value` to bytes for the body frame.
    fn marshal<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, RpcError>;

    /// Decode bytes produced by [`Serializer::marshal`] into `T`.
    fn unmarshal<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, RpcError>;
}

/// Schema-typed serializer backed by CBOR. The default for both client and
/// server codecs.
#[derive(Debug, Default, Clone, Copy)]
pub struct CborSerializer;

impl Serializer for CborSerializer {
    fn marshal<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, RpcError> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf).map_err(|e| RpcError::Serializer(e.to_string()))?;
        Ok(buf)
    }

    fn unmarshal<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, RpcError> {
        ciborium::from_reader(bytes).map_err(|e| RpcError::Serializer(e.to_string()))
    }
}

/// Schema-less serializer backed by JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn marshal<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, RpcError> {
        serde_json::to_vec(value).map_err(|e| RpcError::Serializer(e.to_string()))
    }

    fn unmarshal<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, RpcError> {
        serde_json::from_slice(bytes).map_err(|e| RpcError::Serializer(e.to_string()))
    }
}
