//! Reference arithmetic service and test helpers exercising the RPC codec
//! end to end, outside the codec's own crates.

pub mod arith;
