//! Wire-level integration tests: raw MQTT 3.1.1 frames over real TCP
//! connections against an in-process broker.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use wispmq::broker::{BrokerConfig, MqttBroker, ShutdownHandle};

const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// CONNECT for client id "client123", clean session, keep-alive 60.
const CONNECT_CLIENT123: &[u8] = &[
    0x10, 0x15, 0x00, 0x04, 0x4D, 0x51, 0x54, 0x54, 0x04, 0x02, 0x00, 0x3C, 0x00, 0x09, 0x63,
    0x6C, 0x69, 0x65, 0x6E, 0x74, 0x31, 0x32, 0x33,
];

const CONNACK_ACCEPTED: &[u8] = &[0x20, 0x02, 0x00, 0x00];
const PINGREQ: &[u8] = &[0xC0, 0x00];
const PINGRESP: &[u8] = &[0xD0, 0x00];

async fn start_broker() -> (SocketAddr, ShutdownHandle) {
    let config = BrokerConfig::default().with_bind_address("127.0.0.1:0".parse().unwrap());
    let mut broker = MqttBroker::with_config(config).await.unwrap();
    let addr = broker.local_addr();
    let shutdown = broker.shutdown_handle();

    tokio::spawn(async move {
        broker.run().await.unwrap();
    });

    (addr, shutdown)
}

fn connect_frame(client_id: &str) -> Vec<u8> {
    let mut body = vec![0x00, 0x04, b'M', b'Q', b'T', b'T', 0x04, 0x02, 0x00, 0x3C];
    body.extend_from_slice(&(client_id.len() as u16).to_be_bytes());
    body.extend_from_slice(client_id.as_bytes());

    let mut frame = vec![0x10, body.len() as u8];
    frame.extend_from_slice(&body);
    frame
}

fn subscribe_frame(packet_id: u16, filters: &[&str]) -> Vec<u8> {
    let mut body = packet_id.to_be_bytes().to_vec();
    for filter in filters {
        body.extend_from_slice(&(filter.len() as u16).to_be_bytes());
        body.extend_from_slice(filter.as_bytes());
        body.push(0x00);
    }

    let mut frame = vec![0x82, body.len() as u8];
    frame.extend_from_slice(&body);
    frame
}

fn publish_frame(topic: &str, payload: &[u8]) -> Vec<u8> {
    let mut body = (topic.len() as u16).to_be_bytes().to_vec();
    body.extend_from_slice(topic.as_bytes());
    body.extend_from_slice(payload);

    let mut frame = vec![0x30, body.len() as u8];
    frame.extend_from_slice(&body);
    frame
}

/// Connects, performs the handshake and asserts the CONNACK bytes.
async fn connect_client(addr: SocketAddr, client_id: &str) -> TcpStream {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(&connect_frame(client_id)).await.unwrap();

    let mut reply = [0u8; 4];
    timeout(READ_TIMEOUT, stream.read_exact(&mut reply))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reply, CONNACK_ACCEPTED);
    stream
}

/// Subscribes and asserts the SUBACK (one granted QoS 0 per filter).
async fn subscribe(stream: &mut TcpStream, packet_id: u16, filters: &[&str]) {
    stream
        .write_all(&subscribe_frame(packet_id, filters))
        .await
        .unwrap();

    let mut expected = vec![0x90, 2 + filters.len() as u8];
    expected.extend_from_slice(&packet_id.to_be_bytes());
    expected.extend(std::iter::repeat(0x00).take(filters.len()));

    let mut reply = vec![0u8; expected.len()];
    timeout(READ_TIMEOUT, stream.read_exact(&mut reply))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reply, expected);
}

/// Reads exactly `expected.len()` bytes and asserts they match.
async fn expect_frame(stream: &mut TcpStream, expected: &[u8]) {
    let mut received = vec![0u8; expected.len()];
    timeout(READ_TIMEOUT, stream.read_exact(&mut received))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(received, expected);
}

/// Asserts the peer closed the connection without sending anything.
async fn expect_eof(stream: &mut TcpStream) {
    let mut buf = [0u8; 1];
    let n = timeout(READ_TIMEOUT, stream.read(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(n, 0, "expected EOF, got byte {:#04x}", buf[0]);
}

/// Asserts that nothing arrives within a short window.
async fn expect_silence(stream: &mut TcpStream) {
    let mut buf = [0u8; 1];
    let result = timeout(Duration::from_millis(200), stream.read(&mut buf)).await;
    assert!(result.is_err(), "expected no data, got byte {:#04x}", buf[0]);
}

#[tokio::test]
async fn test_handshake() {
    let (addr, _shutdown) = start_broker().await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(CONNECT_CLIENT123).await.unwrap();
    expect_frame(&mut stream, CONNACK_ACCEPTED).await;
}

#[tokio::test]
async fn test_ping() {
    let (addr, _shutdown) = start_broker().await;

    let mut stream = connect_client(addr, "pinger").await;
    stream.write_all(PINGREQ).await.unwrap();
    expect_frame(&mut stream, PINGRESP).await;
}

#[tokio::test]
async fn test_subscribe_suback() {
    let (addr, _shutdown) = start_broker().await;

    let mut stream = connect_client(addr, "subscriber").await;
    stream
        .write_all(&[
            0x82, 0x0A, 0x00, 0x01, 0x00, 0x05, 0x61, 0x2F, 0x62, 0x2F, 0x63, 0x00,
        ])
        .await
        .unwrap();
    expect_frame(&mut stream, &[0x90, 0x03, 0x00, 0x01, 0x00]).await;
}

#[tokio::test]
async fn test_wildcard_fanout_to_all_subscribers() {
    let (addr, _shutdown) = start_broker().await;

    let mut a = connect_client(addr, "client-a").await;
    let mut b = connect_client(addr, "client-b").await;
    subscribe(&mut a, 1, &["sensors/+"]).await;
    subscribe(&mut b, 1, &["sensors/+"]).await;

    // The publisher is also a matching subscriber and receives its own
    // message back.
    let frame = publish_frame("sensors/temp", b"25");
    a.write_all(&frame).await.unwrap();

    expect_frame(&mut a, &frame).await;
    expect_frame(&mut b, &frame).await;
}

#[tokio::test]
async fn test_exact_filter_isolation() {
    let (addr, _shutdown) = start_broker().await;

    let mut subscriber = connect_client(addr, "exact").await;
    subscribe(&mut subscriber, 1, &["a/b/c"]).await;

    let mut publisher = connect_client(addr, "pub").await;
    publisher
        .write_all(&publish_frame("a/b/d", b"no"))
        .await
        .unwrap();
    expect_silence(&mut subscriber).await;

    let frame = publish_frame("a/b/c", b"yes");
    publisher.write_all(&frame).await.unwrap();
    expect_frame(&mut subscriber, &frame).await;
}

#[tokio::test]
async fn test_multi_level_wildcard_matches_parent() {
    let (addr, _shutdown) = start_broker().await;

    let mut subscriber = connect_client(addr, "hash").await;
    subscribe(&mut subscriber, 1, &["a/#"]).await;

    let mut publisher = connect_client(addr, "pub").await;
    for topic in ["a", "a/b", "a/b/c"] {
        let frame = publish_frame(topic, b"m");
        publisher.write_all(&frame).await.unwrap();
        expect_frame(&mut subscriber, &frame).await;
    }

    publisher
        .write_all(&publish_frame("b/a", b"m"))
        .await
        .unwrap();
    expect_silence(&mut subscriber).await;
}

#[tokio::test]
async fn test_two_matching_filters_deliver_twice() {
    let (addr, _shutdown) = start_broker().await;

    let mut subscriber = connect_client(addr, "double").await;
    subscribe(&mut subscriber, 1, &["a/+", "a/b"]).await;

    let mut publisher = connect_client(addr, "pub").await;
    let frame = publish_frame("a/b", b"x");
    publisher.write_all(&frame).await.unwrap();

    expect_frame(&mut subscriber, &frame).await;
    expect_frame(&mut subscriber, &frame).await;
    expect_silence(&mut subscriber).await;
}

#[tokio::test]
async fn test_malformed_connect_closes_without_reply() {
    let (addr, _shutdown) = start_broker().await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(&[0x10, 0x00]).await.unwrap();
    expect_eof(&mut stream).await;
}

#[tokio::test]
async fn test_unsupported_packet_closes_connection() {
    let (addr, _shutdown) = start_broker().await;

    let mut stream = connect_client(addr, "bad").await;
    // PUBACK belongs to QoS 1 and is rejected at decode time.
    stream.write_all(&[0x40, 0x02, 0x00, 0x01]).await.unwrap();
    expect_eof(&mut stream).await;
}

#[tokio::test]
async fn test_duplicate_connect_closes_connection() {
    let (addr, _shutdown) = start_broker().await;

    let mut stream = connect_client(addr, "dup").await;
    stream
        .write_all(&connect_frame("dup-again"))
        .await
        .unwrap();
    expect_eof(&mut stream).await;
}

#[tokio::test]
async fn test_disconnect_closes_cleanly() {
    let (addr, _shutdown) = start_broker().await;

    let mut stream = connect_client(addr, "leaver").await;
    stream.write_all(&[0xE0, 0x00]).await.unwrap();
    expect_eof(&mut stream).await;
}

#[tokio::test]
async fn test_per_publisher_fifo() {
    let (addr, _shutdown) = start_broker().await;

    let mut subscriber = connect_client(addr, "fifo-sub").await;
    subscribe(&mut subscriber, 1, &["seq"]).await;

    let mut publisher = connect_client(addr, "fifo-pub").await;
    for i in 0..20u8 {
        publisher
            .write_all(&publish_frame("seq", &[i]))
            .await
            .unwrap();
    }

    for i in 0..20u8 {
        expect_frame(&mut subscriber, &publish_frame("seq", &[i])).await;
    }
}

#[tokio::test]
async fn test_concurrent_publishers_disjoint_topics() {
    let (addr, _shutdown) = start_broker().await;

    let mut sub1 = connect_client(addr, "sub-1").await;
    let mut sub2 = connect_client(addr, "sub-2").await;
    subscribe(&mut sub1, 1, &["t/1"]).await;
    subscribe(&mut sub2, 1, &["t/2"]).await;

    let pub1 = tokio::spawn(async move {
        let mut publisher = connect_client(addr, "pub-1").await;
        for i in 0..50u8 {
            publisher
                .write_all(&publish_frame("t/1", &[i]))
                .await
                .unwrap();
        }
    });
    let pub2 = tokio::spawn(async move {
        let mut publisher = connect_client(addr, "pub-2").await;
        for i in 0..50u8 {
            publisher
                .write_all(&publish_frame("t/2", &[i]))
                .await
                .unwrap();
        }
    });

    for i in 0..50u8 {
        expect_frame(&mut sub1, &publish_frame("t/1", &[i])).await;
    }
    for i in 0..50u8 {
        expect_frame(&mut sub2, &publish_frame("t/2", &[i])).await;
    }

    pub1.await.unwrap();
    pub2.await.unwrap();
}

#[tokio::test]
async fn test_shutdown_closes_established_connections() {
    let (addr, shutdown) = start_broker().await;

    let mut stream = connect_client(addr, "doomed").await;
    shutdown.shutdown();
    expect_eof(&mut stream).await;
}
