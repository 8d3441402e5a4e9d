//! End-to-end scenarios exercising the client and server codecs together
//! over an in-memory duplex stream.

#![allow(clippy::unwrap_used)]

use rpc_client::{ClientCodec, ClientCodecConfig};
use rpc_core::{CborSerializer, CompressionTag, CompressorRegistry, RpcError};
use rpc_harness::arith::{call, serve_one, ArithArgs};
use rpc_proto::{RequestHeader, ResponseHeader};
use rpc_server::{ServerCodec, ServerCodecConfig};
use tokio::io::{duplex, split};

type Client = ClientCodec<tokio::io::ReadHalf<tokio::io::DuplexStream>, tokio::io::WriteHalf<tokio::io::DuplexStream>>;
type Server = ServerCodec<tokio::io::ReadHalf<tokio::io::DuplexStream>, tokio::io::WriteHalf<tokio::io::DuplexStream>>;

fn connected_pair() -> (Client, Server) {
    let (client_side, server_side) = duplex(16 * 1024);
    let (cr, cw) = split(client_side);
    let (sr, sw) = split(server_side);
    let client = ClientCodec::new(cr, cw, ClientCodecConfig::<CborSerializer>::default());
    let server = ServerCodec::new(sr, sw, ServerCodecConfig::<CborSerializer>::default());
    (client, server)
}

#[tokio::test]
async fn scenario_1_add_round_trip_raw() {
    let (client, server) = connected_pair();

    let server_task = tokio::spawn(async move { serve_one(&server).await });
    let (envelope, reply) = call(&client, 1, "ArithService.Add", ArithArgs { a: 20, b: 5 }).await.unwrap();
    server_task.await.unwrap().unwrap();

    assert_eq!(envelope.error, "");
    assert_eq!(reply.c, 25);
}

#[tokio::test]
async fn scenario_2_divide_by_zero_error_propagation() {
    let (client, server) = connected_pair();

    let server_task = tokio::spawn(async move { serve_one(&server).await });
    let (envelope, _reply) = call(&client, 1, "ArithService.Div", ArithArgs { a: 20, b: 0 }).await.unwrap();
    server_task.await.unwrap().unwrap();

    assert_eq!(envelope.error, "divided is zero");
}

#[tokio::test]
async fn scenario_3_compressor_mismatch() {
    // No real server: craft a response advertising Gzip while the client
    // is configured Raw.
    let (client_side, mut server_side) = duplex(4096);
    let (cr, cw) = split(client_side);
    let client: Client = ClientCodec::new(cr, cw, ClientCodecConfig::<CborSerializer>::default());

    client.write_request(1, "ArithService.Add", &ArithArgs { a: 1, b: 1 }).await.unwrap();

    let header = ResponseHeader::new(CompressionTag::Gzip.as_u16(), 1, "", 0, 0);
    rpc_proto::write_frame(&mut server_side, &header.marshal()).await.unwrap();
    rpc_proto::write_frame(&mut server_side, &[]).await.unwrap();

    let envelope = client.read_response_header().await.unwrap();
    let mut reply = rpc_harness::arith::ArithReply::default();
    let err = client.read_response_body(&envelope, Some(&mut reply)).await.unwrap_err();
    assert!(matches!(err, RpcError::CompressorTypeMismatch { .. }));
}

#[tokio::test]
async fn scenario_4_corrupted_body_fails_checksum() {
    let (client_side, mut server_side) = duplex(4096);
    let (cr, cw) = split(client_side);
    let client: Client = ClientCodec::new(cr, cw, ClientCodecConfig::<CborSerializer>::default());

    client.write_request(1, "ArithService.Add", &ArithArgs { a: 1, b: 1 }).await.unwrap();

    let serializer = CborSerializer;
    let body = {
        use rpc_core::Serializer as _;
        serializer.marshal(&rpc_harness::arith::ArithReply { c: 2 }).unwrap()
    };
    let checksum = crc32fast::hash(&body);
    let header = ResponseHeader::new(CompressionTag::Raw.as_u16(), 1, "", body.len() as u64, checksum);
    rpc_proto::write_frame(&mut server_side, &header.marshal()).await.unwrap();

    let mut corrupted = body;
    corrupted[0] ^= 0x01;
    rpc_proto::write_frame(&mut server_side, &corrupted).await.unwrap();

    let envelope = client.read_response_header().await.unwrap();
    let mut reply = rpc_harness::arith::ArithReply::default();
    let err = client.read_response_body(&envelope, Some(&mut reply)).await.unwrap_err();
    assert!(matches!(err, RpcError::UnexpectedChecksum { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn scenario_5_one_thousand_concurrent_calls_across_compressors() {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex as StdMutex};

    use rpc_harness::arith::ArithReply;
    use tokio::sync::oneshot;

    let tags = [CompressionTag::Raw, CompressionTag::Gzip, CompressionTag::Snappy, CompressionTag::Zlib];

    // One client per compression tag, sharing nothing; each writes through
    // its own half of a dedicated duplex pair so compression negotiation
    // stays per-connection, matching "response always uses the request's
    // pinned tag".
    //
    // `ClientCodec` is built for many concurrent writers plus exactly one
    // dedicated reader task -- `read_response_header`/`read_response_body`
    // each take the reader lock separately, so two tasks racing `call()`
    // on the same client can interleave one response's header with
    // another's body. Drive each client through a single reader/dispatch
    // task instead, keyed by seq via oneshot channels, and let the many
    // call tasks only write requests and await their own reply.
    let mut server_tasks = Vec::new();
    let mut dispatch_tasks = Vec::new();
    let mut clients = Vec::new();
    let mut waiter_maps = Vec::new();
    for &tag in &tags {
        let (c_side, s_side) = duplex(1024 * 1024);
        let (cr, cw) = split(c_side);
        let (sr, sw) = split(s_side);
        let config = ClientCodecConfig::<CborSerializer>::default().with_compression(tag);
        let client = Arc::new(ClientCodec::new(cr, cw, config));
        let server = Arc::new(ServerCodec::new(sr, sw, ServerCodecConfig::<CborSerializer>::default()));

        let server_for_task = Arc::clone(&server);
        server_tasks.push(tokio::spawn(async move {
            for _ in 0..250 {
                serve_one(&server_for_task).await.unwrap();
            }
        }));

        let waiters: Arc<StdMutex<HashMap<u64, oneshot::Sender<(bool, ArithReply)>>>> =
            Arc::new(StdMutex::new(HashMap::new()));
        let client_for_dispatch = Arc::clone(&client);
        let waiters_for_dispatch = Arc::clone(&waiters);
        dispatch_tasks.push(tokio::spawn(async move {
            for _ in 0..250 {
                let envelope = client_for_dispatch.read_response_header().await.unwrap();
                let mut reply = ArithReply::default();
                let ok = envelope.error.is_empty();
                if ok {
                    client_for_dispatch.read_response_body(&envelope, Some(&mut reply)).await.unwrap();
                } else {
                    client_for_dispatch.read_response_body::<ArithReply>(&envelope, None).await.unwrap();
                }
                if let Some(tx) = waiters_for_dispatch.lock().unwrap().remove(&envelope.seq) {
                    let _ = tx.send((ok, reply));
                }
            }
        }));

        clients.push(client);
        waiter_maps.push(waiters);
    }

    let mut call_tasks = Vec::new();
    for (i, client) in clients.iter().enumerate() {
        let waiters = Arc::clone(&waiter_maps[i]);
        for n in 0..250u64 {
            let client = Arc::clone(client);
            let waiters = Arc::clone(&waiters);
            let seq = (i as u64) * 250 + n;
            call_tasks.push(tokio::spawn(async move {
                let a = seq as i64;
                let b = (seq % 7 + 1) as i64;

                let (tx, rx) = oneshot::channel();
                waiters.lock().unwrap().insert(seq, tx);
                client.write_request(seq, "ArithService.Add", &ArithArgs { a, b }).await.unwrap();
                let (ok, reply) = rx.await.unwrap();

                assert!(ok);
                assert_eq!(reply.c, a + b);
            }));
        }
    }

    for task in call_tasks {
        task.await.unwrap();
    }
    for task in dispatch_tasks {
        task.await.unwrap();
    }
    for task in server_tasks {
        task.await.unwrap();
    }

    for client in &clients {
        assert_eq!(client.pending_len(), 0);
    }
}

#[tokio::test]
async fn scenario_6_header_varint_boundary() {
    let method = "m".repeat(4096);
    let header = RequestHeader::new(0, method.clone(), (1u64 << 63) - 1, u64::from(u32::MAX), 0);
    let bytes = header.marshal();

    let out = RequestHeader::default();
    out.unmarshal(&bytes).unwrap();

    assert_eq!(out.method(), method);
    assert_eq!(out.id(), (1u64 << 63) - 1);
    assert_eq!(out.request_len(), u64::from(u32::MAX));
}

#[tokio::test]
async fn compressor_registry_is_injectable_not_global() {
    // Per the open design question, the registry is passed explicitly into
    // each codec rather than resolved from a process-wide singleton.
    let mut registry = CompressorRegistry::empty();
    registry.register(CompressionTag::Raw.as_u16(), Box::new(RawOnly));
    assert!(registry.get(CompressionTag::Gzip.as_u16()).is_err());

    struct RawOnly;
    impl rpc_core::Compressor for RawOnly {
        fn compress(&self, input: &[u8]) -> Result<Vec<u8>, RpcError> {
            Ok(input.to_vec())
        }

        fn decompress(&self, input: &[u8]) -> Result<Vec<u8>, RpcError> {
            Ok(input.to_vec())
        }
    }
}
