//! Server-side RPC codec: reads inbound request frames, translates the
//! caller's request identifier to a locally-generated sequence for the
//! host dispatcher, and stitches the original identifier plus negotiated
//! compression back onto each response.

mod codec;
mod config;

pub use codec::{RequestEnvelope, ResponseDescriptor, ServerCodec};
pub use config::ServerCodecConfig;
