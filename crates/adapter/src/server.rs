//! TCP server
//!
//! Accepts connections and runs one [`run_session`] task per client. Sessions
//! share only the persistence gateway. When the shutdown channel flips, the
//! server stops accepting and waits for every session to wind down.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use tetris_stream_core::Persistence;

use crate::config::ServerConfig;
use crate::session::{run_session, SessionContext};

/// Start the TCP server
///
/// `ready_tx` receives the bound address once the listener is up (useful with
/// port 0). Returns after `shutdown` becomes `true` and all sessions have ended.
pub async fn run_server(
    config: ServerConfig,
    store: Arc<dyn Persistence>,
    ready_tx: Option<oneshot::Sender<SocketAddr>>,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    let bound = listener.local_addr()?;
    info!(addr = %bound, board = ?config.board, tick_ms = config.tick_ms, "listening");
    if let Some(tx) = ready_tx {
        let _ = tx.send(bound);
    }

    let mut sessions = JoinSet::new();
    let mut next_id = 0u64;

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (socket, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "accept failed");
                        continue;
                    }
                };
                if let Err(e) = socket.set_nodelay(true) {
                    warn!(error = %e, "failed to set TCP_NODELAY");
                }

                next_id += 1;
                let ctx = SessionContext {
                    id: next_id,
                    board: config.board,
                    tick: config.tick_interval(),
                    seed: rand::random(),
                    store: Arc::clone(&store),
                };
                info!(session_id = ctx.id, peer = %peer, seed = ctx.seed, "client connected");

                let session_shutdown = shutdown.clone();
                sessions.spawn(async move {
                    let id = ctx.id;
                    if let Err(e) = run_session(socket, ctx, session_shutdown).await {
                        warn!(session_id = id, error = %e, "session error");
                    }
                });
            }
            Some(joined) = sessions.join_next(), if !sessions.is_empty() => {
                if let Err(e) = joined {
                    error!(error = %e, "session task failed");
                }
            }
            _ = shutdown.changed() => break,
        }
    }

    info!(active = sessions.len(), "shutting down, waiting for sessions");
    while let Some(joined) = sessions.join_next().await {
        if let Err(e) = joined {
            error!(error = %e, "session task failed");
        }
    }
    info!("server stopped");
    Ok(())
}
