use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::udp::UdpFramed;
use tracing::{debug, error, info, instrument, warn};

use crate::config::ServerConfig;
use crate::core::codec::ServerCodec;
use crate::core::packet::{LoginReply, LOGGED_IN_LEN, LOGIN_FAILED_LEN};
use crate::error::{LoginError, Result};
use crate::protocol::dispatcher::Dispatcher;
use crate::utils::metrics::global_metrics;

/// Bind the configured address and serve until CTRL+C.
#[instrument(skip(config, dispatcher), fields(address = %config.address))]
pub async fn start_server(config: &ServerConfig, dispatcher: Dispatcher) -> Result<()> {
    let socket = bind(&config.address).await?;
    serve_with_shutdown(socket, dispatcher, config, shutdown_on_ctrl_c()).await
}

/// Channel that fires once CTRL+C is received
pub fn shutdown_on_ctrl_c() -> mpsc::Receiver<()> {
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            info!("Received CTRL+C signal, shutting down");
            let _ = shutdown_tx.send(()).await;
        }
    });
    shutdown_rx
}

/// Bind a UDP socket for the login service
pub async fn bind(address: &str) -> Result<UdpSocket> {
    let addr: SocketAddr = address
        .parse()
        .map_err(|e| LoginError::ConfigError(format!("Invalid UDP address '{address}': {e}")))?;
    Ok(UdpSocket::bind(addr).await?)
}

/// Serve login requests on `socket` until `shutdown_rx` fires.
///
/// Every datagram gets its own task; the dispatch itself runs on the
/// blocking pool because it may wait on the store lock and rewrite the store
/// file. Replies funnel through a bounded channel into the single task that
/// owns the sending half of the socket.
#[instrument(skip_all)]
pub async fn serve_with_shutdown(
    socket: UdpSocket,
    dispatcher: Dispatcher,
    config: &ServerConfig,
    mut shutdown_rx: mpsc::Receiver<()>,
) -> Result<()> {
    let local_addr = socket.local_addr()?;
    info!(%local_addr, "Starting login service");

    let (mut sink, mut stream) = UdpFramed::new(socket, ServerCodec).split();
    let (reply_tx, mut reply_rx) =
        mpsc::channel::<(LoginReply, SocketAddr)>(config.backpressure_limit);

    let writer = tokio::spawn(async move {
        while let Some((reply, peer)) = reply_rx.recv().await {
            let len = reply_len(&reply);
            match sink.send((reply, peer)).await {
                Ok(()) => global_metrics().reply_sent(len),
                Err(e) => warn!(%peer, error = %e, "Failed to send reply"),
            }
        }
    });

    let mut workers = JoinSet::new();
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("Shutting down login service. Waiting for requests in flight...");
                break;
            }

            received = stream.next() => match received {
                Some(Ok((datagram, peer))) => {
                    let dispatcher = dispatcher.clone();
                    let reply_tx = reply_tx.clone();
                    workers.spawn(async move {
                        let handled =
                            tokio::task::spawn_blocking(move || dispatcher.handle(&datagram, peer))
                                .await;
                        match handled {
                            Ok(Some(reply)) => {
                                if reply_tx.send((reply, peer)).await.is_err() {
                                    debug!(%peer, "Reply writer gone, dropping reply");
                                }
                            }
                            Ok(None) => {}
                            Err(e) => error!(%peer, error = %e, "Login worker failed"),
                        }
                    });
                }
                Some(Err(e)) => warn!(error = %e, "Failed to receive datagram"),
                None => break,
            },

            Some(_) = workers.join_next(), if !workers.is_empty() => {}
        }
    }

    let drained = tokio::time::timeout(config.shutdown_timeout, async {
        while workers.join_next().await.is_some() {}
    })
    .await;
    if drained.is_err() {
        warn!("Shutdown timeout reached, abandoning requests in flight");
        workers.abort_all();
    }

    drop(reply_tx);
    if let Err(e) = writer.await {
        error!(error = %e, "Reply writer failed");
    }

    global_metrics().log_metrics();
    info!("Login service stopped");
    Ok(())
}

fn reply_len(reply: &LoginReply) -> u64 {
    match reply {
        LoginReply::LoggedIn { .. } => LOGGED_IN_LEN as u64,
        LoginReply::Failed { .. } => LOGIN_FAILED_LEN as u64,
    }
}
