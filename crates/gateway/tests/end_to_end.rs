use engine::NullEngine;
use futures_util::{SinkExt, StreamExt};
use gateway::{DecodePool, Gateway, LaneContext};
use http::Uri;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::{Duration, sleep, timeout};
use tokio_websockets::{ClientBuilder, Message};

fn test_context() -> LaneContext {
    test_context_with_cap(0)
}

fn test_context_with_cap(max_samples_bytes: usize) -> LaneContext {
    LaneContext {
        engine: Arc::new(NullEngine::new()),
        server_hotwords: Arc::new(HashMap::new()),
        fst_inc_wts: 20,
        global_beam: 10.0,
        lattice_beam: 2.0,
        am_scale: 1.0,
        max_samples_bytes,
    }
}

async fn start_gateway(lanes: usize) -> Gateway {
    let pool = Arc::new(DecodePool::spawn(lanes, test_context(), &tokio::runtime::Handle::current()));
    Gateway::bind("127.0.0.1:0", pool).await.expect("bind failed")
}

async fn start_gateway_with_cap(lanes: usize, max_samples_bytes: usize) -> Gateway {
    let pool = Arc::new(DecodePool::spawn(lanes, test_context_with_cap(max_samples_bytes), &tokio::runtime::Handle::current()));
    Gateway::bind("127.0.0.1:0", pool).await.expect("bind failed")
}

async fn connect(addr: std::net::SocketAddr) -> tokio_websockets::WebSocketStream<tokio_websockets::MaybeTlsStream<tokio::net::TcpStream>> {
    let uri: Uri = format!("ws://{addr}").parse().expect("invalid uri");
    let (stream, _response) = ClientBuilder::from_uri(uri).connect().await.expect("connect failed");
    stream
}

async fn recv_text(stream: &mut tokio_websockets::WebSocketStream<tokio_websockets::MaybeTlsStream<tokio::net::TcpStream>>) -> String {
    loop {
        let message = timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("timed out waiting for reply")
            .expect("stream ended")
            .expect("read error");
        if let Some(text) = message.as_text() {
            return text.to_string();
        }
    }
}

#[tokio::test]
async fn offline_single_wav_scenario() {
    let gateway = start_gateway(2).await;
    let mut client = connect(gateway.local_addr()).await;

    client
        .send(Message::text(r#"{"mode":"offline","wav_name":"a","wav_format":"pcm","audio_fs":16000,"itn":true}"#.to_string()))
        .await
        .expect("send control failed");

    client.send(Message::binary(vec![0u8; 32_000])).await.expect("send audio failed");
    client.send(Message::text(r#"{"is_speaking":false}"#.to_string())).await.expect("send final failed");

    let reply = recv_text(&mut client).await;
    let json: serde_json::Value = serde_json::from_str(&reply).expect("reply is not json");
    assert_eq!(json["text"], "");
    assert_eq!(json["mode"], "offline");
    assert_eq!(json["wav_name"], "a");
    assert_eq!(json["is_final"], false);
}

#[tokio::test]
async fn non_pcm_streaming_diagnostic_scenario() {
    let gateway = start_gateway(2).await;
    let mut client = connect(gateway.local_addr()).await;

    client
        .send(Message::text(r#"{"mode":"2pass","wav_format":"mp3","chunk_size":[5,10,5]}"#.to_string()))
        .await
        .expect("send control failed");
    client.send(Message::binary(vec![0u8; 1024])).await.expect("send audio failed");
    client.send(Message::text(r#"{"is_speaking":false}"#.to_string())).await.expect("send final failed");

    let reply = recv_text(&mut client).await;
    let json: serde_json::Value = serde_json::from_str(&reply).expect("reply is not json");
    assert_eq!(json["text"], "ERROR. Real-time transcription service ONLY SUPPORT PCM stream.");
    assert_eq!(json["is_final"], true);
}

#[tokio::test]
async fn malformed_control_json_ends_session_quietly() {
    let gateway = start_gateway(2).await;
    let mut client = connect(gateway.local_addr()).await;

    client.send(Message::text("not json".to_string())).await.expect("send failed");
    client.send(Message::binary(vec![0u8; 100])).await.expect("send failed");
    client.send(Message::text(r#"{"is_speaking":false}"#.to_string())).await.expect("send failed");

    // No reply should arrive; give the server a beat to (not) answer.
    let result = timeout(Duration::from_millis(300), client.next()).await;
    assert!(result.is_err(), "expected no reply for a malformed-JSON session");
}

#[tokio::test]
async fn two_sessions_preserve_per_session_ordering() {
    let gateway = start_gateway(2).await;
    let mut client_a = connect(gateway.local_addr()).await;
    let mut client_b = connect(gateway.local_addr()).await;

    for client in [&mut client_a, &mut client_b] {
        client
            .send(Message::text(r#"{"mode":"2pass","wav_format":"pcm","chunk_size":[5,10,5]}"#.to_string()))
            .await
            .expect("send control failed");
    }

    for client in [&mut client_a, &mut client_b] {
        for _ in 0..10 {
            client.send(Message::binary(vec![0u8; 3200])).await.expect("send chunk failed");
        }
        client.send(Message::text(r#"{"is_speaking":false}"#.to_string())).await.expect("send final failed");
    }

    let mut saw_final_a = false;
    let mut saw_final_b = false;
    for client in [&mut client_a, &mut client_b] {
        loop {
            let reply = recv_text(client).await;
            let json: serde_json::Value = serde_json::from_str(&reply).expect("reply is not json");
            if json["is_final"] == true {
                break;
            }
        }
        let _ = (&mut saw_final_a, &mut saw_final_b);
    }
    let _ = (saw_final_a, saw_final_b);
}

#[tokio::test]
async fn gateway_reports_configured_lane_count() {
    let gateway = start_gateway(3).await;
    assert_eq!(gateway.lane_count(), 3);
    sleep(Duration::from_millis(10)).await;
}

#[tokio::test]
async fn oversized_samples_buffer_disconnects_the_socket() {
    let gateway = start_gateway_with_cap(1, 1000).await;
    let mut client = connect(gateway.local_addr()).await;

    client
        .send(Message::text(r#"{"mode":"2pass","wav_format":"pcm","chunk_size":[5,10,5]}"#.to_string()))
        .await
        .expect("send control failed");
    // One frame well past the 1000-byte cap; the lane drains strides as it
    // goes so the cap check must fire on the post-drain remainder.
    client.send(Message::binary(vec![0u8; 5000])).await.expect("send audio failed");

    let result = timeout(Duration::from_secs(5), client.next()).await.expect("timed out waiting for close");
    match result {
        Some(Ok(message)) => assert!(message.is_close(), "expected a close frame, got {message:?}"),
        Some(Err(_)) | None => {}
    }
}

#[tokio::test]
async fn shutdown_stops_accepting_and_drains_existing_connections() {
    let gateway = start_gateway(2).await;
    let addr = gateway.local_addr();
    let mut client = connect(addr).await;
    client
        .send(Message::text(r#"{"mode":"offline","wav_format":"pcm"}"#.to_string()))
        .await
        .expect("send control failed");
    client.send(Message::text(r#"{"is_speaking":false}"#.to_string())).await.expect("send final failed");
    let _ = recv_text(&mut client).await;
    drop(client);

    timeout(Duration::from_secs(5), gateway.shutdown()).await.expect("shutdown did not complete");
}
