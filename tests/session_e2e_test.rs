use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use tetris_stream::adapter::{run_server, ServerConfig};
use tetris_stream::core::{MemoryStore, Persistence};

struct TestServer {
    addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<anyhow::Result<()>>,
}

async fn start_server(store: Arc<MemoryStore>, tick_ms: u32) -> TestServer {
    let config = ServerConfig {
        port: 0,
        tick_ms,
        ..ServerConfig::default()
    };
    let (ready_tx, ready_rx) = oneshot::channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(run_server(config, store, Some(ready_tx), shutdown_rx));

    let addr = tokio::time::timeout(Duration::from_secs(2), ready_rx)
        .await
        .expect("server did not signal ready")
        .expect("ready channel dropped");

    TestServer {
        addr,
        shutdown: shutdown_tx,
        handle,
    }
}

async fn connect(addr: SocketAddr) -> (Lines<BufReader<OwnedReadHalf>>, OwnedWriteHalf) {
    let stream = TcpStream::connect(addr).await.expect("connect failed");
    let (read_half, write_half) = stream.into_split();
    (BufReader::new(read_half).lines(), write_half)
}

async fn next_json(lines: &mut Lines<BufReader<OwnedReadHalf>>) -> serde_json::Value {
    let line = tokio::time::timeout(Duration::from_secs(2), lines.next_line())
        .await
        .expect("timed out waiting for a line")
        .expect("read failed")
        .expect("connection closed");
    serde_json::from_str(&line).expect("server sent invalid json")
}

async fn send_command(write: &mut OwnedWriteHalf, seq: u64, command: &str) {
    let line = format!(r#"{{"type":"command","seq":{seq},"command":"{command}"}}"#);
    write.write_all(line.as_bytes()).await.unwrap();
    write.write_all(b"\n").await.unwrap();
    write.flush().await.unwrap();
}

fn occupied(snapshot: &serde_json::Value) -> usize {
    snapshot["grid"]
        .as_array()
        .unwrap()
        .iter()
        .flat_map(|row| row.as_array().unwrap())
        .filter(|cell| !cell.is_null())
        .count()
}

#[tokio::test]
async fn session_streams_snapshots_and_applies_commands() {
    let store = Arc::new(MemoryStore::with_high_score(1234));
    let server = start_server(store, 10).await;
    let (mut lines, mut write) = connect(server.addr).await;

    let welcome = next_json(&mut lines).await;
    assert_eq!(welcome["type"], "welcome");
    assert_eq!(welcome["seq"], 1);
    assert_eq!(welcome["board"]["width"], 10);
    assert_eq!(welcome["board"]["height"], 20);
    assert_eq!(welcome["tick_ms"], 10);

    let first = next_json(&mut lines).await;
    assert_eq!(first["type"], "snapshot");
    assert_eq!(first["state"], "running");
    assert_eq!(first["highScore"], 1234);
    assert_eq!(first["grid"].as_array().unwrap().len(), 20);
    assert_eq!(occupied(&first), 0);
    assert!(first["holdPiece"].is_null());
    let start_x = first["currentPiece"]["x"].as_i64().unwrap();

    send_command(&mut write, 1, "moveLeft").await;
    loop {
        let snap = next_json(&mut lines).await;
        if snap["currentPiece"]["x"].as_i64() == Some(start_x - 1) {
            break;
        }
    }

    send_command(&mut write, 2, "hold").await;
    loop {
        let snap = next_json(&mut lines).await;
        if !snap["holdPiece"].is_null() {
            break;
        }
    }

    send_command(&mut write, 3, "pause").await;
    loop {
        let snap = next_json(&mut lines).await;
        if snap["state"] == "paused" {
            break;
        }
    }

    send_command(&mut write, 4, "quit").await;
    loop {
        match tokio::time::timeout(Duration::from_secs(2), lines.next_line()).await {
            Ok(Ok(Some(_))) => continue,
            Ok(Ok(None)) | Ok(Err(_)) => break,
            Err(_) => panic!("server did not close the session"),
        }
    }

    server.shutdown.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(2), server.handle)
        .await
        .expect("server did not stop")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn session_reports_invalid_lines_and_keeps_running() {
    let server = start_server(Arc::new(MemoryStore::new()), 10).await;
    let (mut lines, mut write) = connect(server.addr).await;
    assert_eq!(next_json(&mut lines).await["type"], "welcome");

    write.write_all(b"{\"type\":\"command\",\"seq\":9,\"command\":\"jump\"}\n").await.unwrap();
    write.write_all(b"this is not json\n").await.unwrap();

    let mut errors = Vec::new();
    while errors.len() < 2 {
        let msg = next_json(&mut lines).await;
        if msg["type"] == "error" {
            errors.push(msg);
        }
    }
    assert_eq!(errors[0]["code"], "invalid_message");
    assert_eq!(errors[0]["command_seq"], 9);
    assert_eq!(errors[1]["code"], "invalid_message");
    assert!(errors[1].get("command_seq").is_none());

    // Still streaming.
    loop {
        if next_json(&mut lines).await["type"] == "snapshot" {
            break;
        }
    }

    server.shutdown.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(2), server.handle)
        .await
        .expect("server did not stop")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn session_ends_with_game_over() {
    let store = Arc::new(MemoryStore::new());
    let server = start_server(store.clone(), 10).await;
    let (mut lines, mut write) = connect(server.addr).await;
    assert_eq!(next_json(&mut lines).await["type"], "welcome");

    // Stack pieces in the spawn columns one at a time until the game ends.
    let mut seq = 0;
    let mut filled = 0;
    let game_over = 'outer: loop {
        seq += 1;
        assert!(seq < 100, "game never ended");
        send_command(&mut write, seq, "hardDrop").await;
        loop {
            let msg = next_json(&mut lines).await;
            if msg["type"] != "snapshot" {
                continue;
            }
            if msg["state"] == "gameOver" {
                // The final snapshot is followed by gameOver and then EOF.
                break 'outer next_json(&mut lines).await;
            }
            if occupied(&msg) > filled {
                filled = occupied(&msg);
                break;
            }
        }
    };

    assert_eq!(game_over["type"], "gameOver");

    assert_eq!(game_over["score"], 0);
    assert_eq!(game_over["highScore"], 0);

    let closed = tokio::time::timeout(Duration::from_secs(2), lines.next_line())
        .await
        .expect("server did not close the connection");
    assert!(matches!(closed, Ok(None) | Err(_)));

    server.shutdown.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(2), server.handle)
        .await
        .expect("server did not stop")
        .unwrap()
        .unwrap();
    assert_eq!(store.load_high_score(), 0);
}

#[tokio::test]
async fn shutdown_closes_open_sessions() {
    let server = start_server(Arc::new(MemoryStore::new()), 1_000).await;
    let (mut lines, _write) = connect(server.addr).await;
    assert_eq!(next_json(&mut lines).await["type"], "welcome");

    server.shutdown.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(2), server.handle)
        .await
        .expect("server did not stop")
        .unwrap()
        .unwrap();

    loop {
        match tokio::time::timeout(Duration::from_secs(2), lines.next_line()).await {
            Ok(Ok(Some(_))) => continue,
            Ok(Ok(None)) | Ok(Err(_)) => break,
            Err(_) => panic!("session stayed open after shutdown"),
        }
    }
}
