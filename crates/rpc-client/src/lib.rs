//! Client-side RPC codec: builds outbound request frames, correlates
//! responses against a caller-sequence pending map, and delivers decoded
//! bodies back to the host dispatcher.

mod codec;
mod config;

pub use codec::{ClientCodec, ResponseEnvelope};
pub use config::ClientCodecConfig;
