//! Session loop - one game per connection
//!
//! Each connection owns an [`Engine`]. The loop waits on three sources and
//! handles whichever is ready first, running it to completion before polling
//! again:
//!
//! - the tick interval: gravity step, then one snapshot
//! - the next command line from the client
//! - the server shutdown signal
//!
//! The high score is flushed through [`Engine::finish`] however the loop ends.
//! Anything that reaches the persistence gateway runs on the blocking pool;
//! gravity, moves and snapshots stay on the session task.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use tetris_stream_core::{Engine, EngineError, Flow, GameSnapshot, GameState, Persistence};
use tetris_stream_types::BoardSize;

use crate::config::PROTOCOL_VERSION;
use crate::protocol::{
    create_error, create_game_over, create_welcome, extract_seq, parse_message, ErrorCode,
    ParsedMessage, SnapshotMessage,
};

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Client sent `quit`
    Quit,
    /// Client closed the connection or the read side failed
    Disconnected,
    /// The game ended; the final snapshot and `gameOver` were sent
    GameOver,
    /// The server is shutting down
    Shutdown,
}

/// Per-session settings
#[derive(Clone)]
pub struct SessionContext {
    pub id: u64,
    pub board: BoardSize,
    pub tick: Duration,
    pub seed: u32,
    pub store: Arc<dyn Persistence>,
}

impl SessionContext {
    fn tick_ms(&self) -> u32 {
        u32::try_from(self.tick.as_millis()).unwrap_or(u32::MAX)
    }
}

/// Wall-clock time between gravity ticks, in whole milliseconds
///
/// The sub-millisecond remainder carries over to the next reading, so late or
/// early ticks neither gain nor lose time.
struct TickClock {
    last: Instant,
}

impl TickClock {
    fn new(start: Instant) -> Self {
        Self { last: start }
    }

    fn elapsed_ms(&mut self, now: Instant) -> u32 {
        let ms = now.saturating_duration_since(self.last).as_millis();
        let ms = u32::try_from(ms).unwrap_or(u32::MAX);
        self.last += Duration::from_millis(u64::from(ms));
        ms
    }
}

/// Line-delimited JSON writer with the server-side sequence counter
struct Outbound<W> {
    writer: W,
    buf: Vec<u8>,
    seq: u64,
}

impl<W: AsyncWrite + Unpin> Outbound<W> {
    fn new(writer: W) -> Self {
        Self {
            writer,
            buf: Vec::with_capacity(4096),
            seq: 0,
        }
    }

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    async fn send<T: Serialize>(&mut self, msg: &T) -> anyhow::Result<()> {
        self.buf.clear();
        serde_json::to_writer(&mut self.buf, msg)?;
        self.buf.push(b'\n');
        self.writer.write_all(&self.buf).await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn send_error(
        &mut self,
        command_seq: Option<u64>,
        code: ErrorCode,
        message: &str,
    ) -> anyhow::Result<()> {
        let seq = self.next_seq();
        self.send(&create_error(seq, command_seq, code, message))
            .await
    }

    async fn send_snapshot(&mut self, snap: &GameSnapshot) -> anyhow::Result<()> {
        let seq = self.next_seq();
        self.send(&SnapshotMessage::from_snapshot(seq, snap)).await
    }
}

type SharedEngine = Arc<Mutex<Engine>>;

/// Run `f` against the engine on the blocking pool
///
/// The session task awaits the result, so the lock is never contended.
async fn blocking<T, F>(engine: &SharedEngine, f: F) -> anyhow::Result<T>
where
    F: FnOnce(&mut Engine) -> T + Send + 'static,
    T: Send + 'static,
{
    let engine = Arc::clone(engine);
    let out = tokio::task::spawn_blocking(move || f(&mut *engine.lock())).await?;
    Ok(out)
}

/// Run one game over `stream` until quit, disconnect, game over or shutdown
///
/// Returns an error only when writing to the client fails.
pub async fn run_session<S>(
    stream: S,
    ctx: SessionContext,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<SessionEnd>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (reader, writer) = tokio::io::split(stream);
    let mut out = Outbound::new(writer);

    let (board, seed, store) = (ctx.board, ctx.seed, Arc::clone(&ctx.store));
    let engine = tokio::task::spawn_blocking(move || {
        Engine::new(GameState::new(board, seed), store)
    })
    .await?;
    let engine: SharedEngine = Arc::new(Mutex::new(engine));

    let result = drive(reader, &mut out, &engine, &ctx, shutdown).await;

    match blocking(&engine, Engine::finish).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(session_id = ctx.id, error = %e, "failed to record high score"),
        Err(e) => error!(session_id = ctx.id, error = %e, "high score task failed"),
    }
    let _ = out.writer.shutdown().await;

    let score = engine.lock().state().score();
    match &result {
        Ok(end) => info!(session_id = ctx.id, end = ?end, score, "session ended"),
        Err(e) => warn!(session_id = ctx.id, error = %e, "session aborted"),
    }
    result
}

async fn drive<R, W>(
    reader: R,
    out: &mut Outbound<W>,
    engine: &SharedEngine,
    ctx: &SessionContext,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<SessionEnd>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let tick_ms = ctx.tick_ms();
    let seq = out.next_seq();
    out.send(&create_welcome(seq, PROTOCOL_VERSION, ctx.id, ctx.board, tick_ms))
        .await?;

    let mut lines = BufReader::new(reader).lines();
    let mut snap = GameSnapshot::new(ctx.board);
    let mut ticker = tokio::time::interval(ctx.tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut clock = TickClock::new(Instant::now());

    let end = loop {
        tokio::select! {
            _ = ticker.tick() => {
                let elapsed = clock.elapsed_ms(Instant::now());
                engine.lock().step(elapsed);
                settle(engine, out, ctx.id).await?;

                engine.lock().snapshot_into(&mut snap);
                out.send_snapshot(&snap).await?;
                let over = engine.lock().state().game_over();
                if over {
                    break SessionEnd::GameOver;
                }
            }
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break SessionEnd::Disconnected,
                    Err(e) => {
                        warn!(session_id = ctx.id, error = %e, "read failed");
                        break SessionEnd::Disconnected;
                    }
                };
                if let Some(end) = handle_line(&line, engine, out, ctx.id).await? {
                    break end;
                }
                let over = engine.lock().state().game_over();
                if over {
                    engine.lock().snapshot_into(&mut snap);
                    out.send_snapshot(&snap).await?;
                    break SessionEnd::GameOver;
                }
            }
            _ = shutdown.changed() => break SessionEnd::Shutdown,
        }
    };

    if end == SessionEnd::GameOver {
        let seq = out.next_seq();
        let (score, high_score) = {
            let engine = engine.lock();
            (engine.state().score(), engine.high_score())
        };
        out.send(&create_game_over(seq, score, high_score)).await?;
    }
    Ok(end)
}

/// Write the high score if the game just ended
async fn settle<W: AsyncWrite + Unpin>(
    engine: &SharedEngine,
    out: &mut Outbound<W>,
    session_id: u64,
) -> anyhow::Result<()> {
    let pending = engine.lock().settle_pending();
    if !pending {
        return Ok(());
    }
    if let Err(e) = blocking(engine, Engine::settle).await? {
        error!(session_id, error = %e, "storage failure on game over");
        out.send_error(None, ErrorCode::StorageFailure, &e.to_string())
            .await?;
    }
    Ok(())
}

/// Apply one client line; `Some` ends the session
async fn handle_line<W: AsyncWrite + Unpin>(
    line: &str,
    engine: &SharedEngine,
    out: &mut Outbound<W>,
    session_id: u64,
) -> anyhow::Result<Option<SessionEnd>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let msg = match parse_message(trimmed) {
        Ok(ParsedMessage::Command(msg)) => msg,
        Ok(ParsedMessage::Unknown(unknown)) => {
            debug!(session_id, msg_type = %unknown.msg_type, "unsupported message type");
            let message = format!("unsupported message type {:?}", unknown.msg_type);
            out.send_error(unknown.seq, ErrorCode::InvalidMessage, &message)
                .await?;
            return Ok(None);
        }
        Err(e) => {
            debug!(session_id, error = %e, "invalid message");
            out.send_error(extract_seq(trimmed), ErrorCode::InvalidMessage, &e.to_string())
                .await?;
            return Ok(None);
        }
    };

    let command = msg.command.0;
    debug!(session_id, command = command.as_str(), "command");
    let played = engine.lock().play(command);
    let outcome = match played {
        Some(flow) => Ok(flow),
        None => blocking(engine, move |engine| engine.handle(command)).await?,
    };
    match outcome {
        Ok(Flow::Quit) => return Ok(Some(SessionEnd::Quit)),
        Ok(Flow::Continue) => {}
        Err(EngineError::Load(e)) => {
            out.send_error(msg.seq, ErrorCode::LoadRejected, &e.to_string())
                .await?;
        }
        Err(EngineError::Store(e)) => {
            error!(session_id, command = command.as_str(), error = %e, "storage failure");
            out.send_error(msg.seq, ErrorCode::StorageFailure, &e.to_string())
                .await?;
        }
    }
    settle(engine, out, session_id).await?;
    Ok(None)
}
