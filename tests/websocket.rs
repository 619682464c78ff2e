use futures::{SinkExt, StreamExt};
use live_tally::config::Config;
use live_tally::startup::{AppState, router};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const ZEROS: &str = r#"{"type":"votes","data":{"a":0,"b":0,"c":0}}"#;

async fn spawn_server() -> SocketAddr {
    let config = Config {
        port: 0,
        categories: vec!["a".into(), "b".into(), "c".into()],
        // Room for a full burst so no test client is dropped as a slow consumer.
        outbound_queue: 256,
        ..Config::default()
    };
    let app = router(AppState::new(config));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn connect(addr: SocketAddr) -> Client {
    let (client, _) = connect_async(format!("ws://{addr}/")).await.unwrap();
    client
}

async fn next_text(client: &mut Client) -> String {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .unwrap();
        if let Message::Text(text) = msg {
            return text;
        }
    }
}

async fn send(client: &mut Client, text: &str) {
    client.send(Message::Text(text.to_string())).await.unwrap();
}

#[tokio::test]
async fn vote_is_broadcast_to_everyone() {
    let addr = spawn_server().await;
    let mut x = connect(addr).await;
    assert_eq!(next_text(&mut x).await, ZEROS);
    let mut y = connect(addr).await;
    assert_eq!(next_text(&mut y).await, ZEROS);

    send(&mut x, r#"{"type":"vote","option":"b"}"#).await;

    let expected = r#"{"type":"votes","data":{"a":0,"b":1,"c":0}}"#;
    assert_eq!(next_text(&mut x).await, expected);
    assert_eq!(next_text(&mut y).await, expected);
}

#[tokio::test]
async fn invalid_input_produces_no_broadcast() {
    let addr = spawn_server().await;
    let mut x = connect(addr).await;
    assert_eq!(next_text(&mut x).await, ZEROS);

    send(&mut x, r#"{"type":"vote","option":"z"}"#).await;
    send(&mut x, "definitely not json").await;
    send(&mut x, r#"{"type":"hello"}"#).await;
    send(&mut x, r#"{"type":"vote"}"#).await;
    // Events are applied in order, so the first frame after the junk is this vote's.
    send(&mut x, r#"{"type":"vote","option":"a"}"#).await;

    assert_eq!(
        next_text(&mut x).await,
        r#"{"type":"votes","data":{"a":1,"b":0,"c":0}}"#
    );
}

#[tokio::test]
async fn binary_frames_count_as_votes() {
    let addr = spawn_server().await;
    let mut x = connect(addr).await;
    assert_eq!(next_text(&mut x).await, ZEROS);

    x.send(Message::Binary(br#"{"type":"vote","option":"c"}"#.to_vec()))
        .await
        .unwrap();

    assert_eq!(
        next_text(&mut x).await,
        r#"{"type":"votes","data":{"a":0,"b":0,"c":1}}"#
    );
}

#[tokio::test]
async fn late_joiner_receives_current_tally() {
    let addr = spawn_server().await;
    let mut x = connect(addr).await;
    next_text(&mut x).await;
    send(&mut x, r#"{"type":"vote","option":"a"}"#).await;
    send(&mut x, r#"{"type":"vote","option":"a"}"#).await;
    next_text(&mut x).await;
    next_text(&mut x).await;

    let mut late = connect(addr).await;
    assert_eq!(
        next_text(&mut late).await,
        r#"{"type":"votes","data":{"a":2,"b":0,"c":0}}"#
    );
}

#[tokio::test]
async fn disconnect_does_not_disturb_remaining_clients() {
    let addr = spawn_server().await;
    let mut x = connect(addr).await;
    let mut y = connect(addr).await;
    next_text(&mut x).await;
    next_text(&mut y).await;

    send(&mut x, r#"{"type":"vote","option":"c"}"#).await;
    next_text(&mut x).await;
    next_text(&mut y).await;
    x.close(None).await.unwrap();
    drop(x);

    send(&mut y, r#"{"type":"vote","option":"c"}"#).await;
    assert_eq!(
        next_text(&mut y).await,
        r#"{"type":"votes","data":{"a":0,"b":0,"c":2}}"#
    );
}

#[tokio::test]
async fn concurrent_clients_never_lose_votes() {
    let addr = spawn_server().await;
    let mut watcher = connect(addr).await;
    next_text(&mut watcher).await;

    let mut voters = Vec::new();
    for _ in 0..10 {
        voters.push(tokio::spawn(async move {
            let mut client = connect(addr).await;
            next_text(&mut client).await;
            for _ in 0..10 {
                send(&mut client, r#"{"type":"vote","option":"b"}"#).await;
            }
            client
        }));
    }
    let mut clients = Vec::new();
    for voter in voters {
        clients.push(voter.await.unwrap());
    }

    // The watcher sees one broadcast per vote, the last carrying the full count.
    let mut last = String::new();
    for _ in 0..100 {
        last = next_text(&mut watcher).await;
    }
    assert_eq!(last, r#"{"type":"votes","data":{"a":0,"b":100,"c":0}}"#);
}
