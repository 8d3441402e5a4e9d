//! Minimal host dispatcher interface.
//!
//! The codec assumes a host RPC dispatcher exists that pairs outbound
//! requests with responses by sequence number and invokes server-side
//! methods; the reflective method registry, argument decoding, and
//! invocation themselves are a host concern and out of scope here. This
//! module gives that host a typed `(decode, invoke, encode)` seam instead
//! of runtime reflection, per the design note that the codec stay
//! schema-agnostic: a method handler operates on raw marshaled bytes, and
//! whatever encodes/decodes them is the handler's own business.

use std::collections::HashMap;

use thiserror::Error;

/// A registered server-side method: takes marshaled request bytes,
/// returns marshaled response bytes or an application-level error string.
pub trait MethodHandler: Send + Sync {
    /// Invoke the method against already-marshaled argument bytes.
    fn invoke(&self, args: &[u8]) -> Result<Vec<u8>, String>;
}

impl<F> MethodHandler for F
where
    F: Fn(&[u8]) -> Result<Vec<u8>, String> + Send + Sync,
{
    fn invoke(&self, args: &[u8]) -> Result<Vec<u8>, String> {
        self(args)
    }
}

/// Failure looking up a method by name. Distinct from [`crate::error::RpcError`]
/// because method registration and lookup are a dispatcher concern, not a
/// wire-codec one.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// No handler is registered under this name.
    #[error("method not found: {0}")]
    NotFound(String),
}

/// A name -> handler registry, built once at startup and read thereafter.
#[derive(Default)]
pub struct MethodTable {
    handlers: HashMap<String, Box<dyn MethodHandler>>,
}

impl MethodTable {
    /// Build an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`, replacing any existing registration.
    pub fn register(&mut self, name: impl Into<String>, handler: impl MethodHandler + 'static) {
        self.handlers.insert(name.into(), Box::new(handler));
    }

    /// Invoke the handler registered under `method`.
    ///
    /// The outer `Result` is the dispatch concern (method found or not);
    /// the inner `Result` is the application-level outcome the server
    /// codec carries back in the response header's `Error` field (e.g. a
    /// divide-by-zero message), not a codec error.
    pub fn invoke(&self, method: &str, args: &[u8]) -> Result<Result<Vec<u8>, String>, DispatchError> {
        let handler = self.handlers.get(method).ok_or_else(|| DispatchError::NotFound(method.to_string()))?;
        Ok(handler.invoke(args))
    }
}
