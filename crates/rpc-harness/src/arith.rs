//! Reference arithmetic service used to exercise the codec end to end.
//!
//! Not part of the codec itself -- a minimal stand-in for "a host RPC
//! dispatcher paired with a registered service", scoped down to exactly
//! the two methods the testable-property scenarios need.

use rpc_client::{ClientCodec, ClientCodecConfig, ResponseEnvelope};
use rpc_core::{RpcError, Serializer};
use rpc_server::{RequestEnvelope, ResponseDescriptor, ServerCodec};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};

/// Arguments for `ArithService.Add` and `ArithService.Div`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
pub struct ArithArgs {
    pub a: i64,
    pub b: i64,
}

/// Reply for both arithmetic methods.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
pub struct ArithReply {
    pub c: i64,
}

/// Read one request, run the matching arithmetic method, and write the
/// response. Returns the envelope so callers can assert on the assigned
/// local sequence number.
pub async fn serve_one<R, W, S>(codec: &ServerCodec<R, W, S>) -> Result<RequestEnvelope, RpcError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    S: Serializer,
{
    let envelope = codec.read_request_header().await?;
    let mut args = ArithArgs { a: 0, b: 0 };
    codec.read_request_body(&envelope, Some(&mut args)).await?;

    let outcome: Result<ArithReply, String> = match envelope.service_method.as_str() {
        "ArithService.Add" => Ok(ArithReply { c: args.a + args.b }),
        "ArithService.Div" if args.b == 0 => Err("divided is zero".to_string()),
        "ArithService.Div" => Ok(ArithReply { c: args.a / args.b }),
        other => Err(format!("method not found: {other}")),
    };

    match outcome {
        Ok(reply) => {
            codec
                .write_response(ResponseDescriptor { seq: envelope.seq, error: String::new() }, Some(&reply))
                .await?;
        },
        Err(message) => {
            codec
                .write_response::<ArithReply>(ResponseDescriptor { seq: envelope.seq, error: message }, None)
                .await?;
        },
    }

    Ok(envelope)
}

/// Issue one `ArithService.Add` or `ArithService.Div` call and wait for
/// the reply. Helper for integration tests driving a real client codec
/// against a concurrently-running [`serve_one`] loop.
pub async fn call<R, W, S>(
    codec: &ClientCodec<R, W, S>,
    seq: u64,
    method: &str,
    args: ArithArgs,
) -> Result<(ResponseEnvelope, ArithReply), RpcError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    S: Serializer,
{
    codec.write_request(seq, method, &args).await?;
    let envelope = codec.read_response_header().await?;

    let mut reply = ArithReply::default();
    if envelope.error.is_empty() {
        codec.read_response_body(&envelope, Some(&mut reply)).await?;
    } else {
        codec.read_response_body::<ArithReply>(&envelope, None).await?;
    }

    Ok((envelope, reply))
}
