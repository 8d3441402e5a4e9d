//! Compression registry, serializer interface, error taxonomy, and the
//! host dispatcher seam shared by `rpc-client` and `rpc-server`.

mod compress;
mod dispatch;
mod error;
mod serialize;

pub use compress::{CompressionTag, Compressor, CompressorRegistry};
pub use dispatch::{DispatchError, MethodHandler, MethodTable};
pub use error::RpcError;
pub use serialize::{CborSerializer, JsonSerializer, Serializer};
