//! Wire framing and header codec for the compact RPC protocol.
//!
//! This crate owns the on-the-wire binary contract only: length-delimited
//! frames, varint encoding, and the `RequestHeader`/`ResponseHeader`
//! records. It knows nothing about compression, serialization, or
//! sequence-number bookkeeping -- those live in `rpc-core`, `rpc-client`,
//! and `rpc-server`.

mod errors;
mod frame;
mod header;
mod pool;
mod varint;

pub use errors::{FrameError, HeaderError};
pub use frame::{read_frame, write_frame};
pub use header::{RequestHeader, ResponseHeader, FIXED_OVERHEAD};
pub use pool::HeaderPool;
pub use varint::{decode as decode_varint, encode as encode_varint, VarintError, MAX_LEN as MAX_VARINT_LEN};
