//! Reconnecting push channel connection.
//!
//! Owns a background task that keeps one WebSocket open to the server's
//! notification endpoint and forwards every text frame, unparsed and in
//! delivery order, to a bounded channel. The connection is receive-only.
//!
//! # Reconnection
//!
//! Connect failures and disconnects are retried with exponential backoff
//! from [`RECONNECT_INITIAL_BACKOFF`] up to [`RECONNECT_MAX_BACKOFF`]. A
//! successful handshake resets the delay. Reconnects are invisible to the
//! consumer; no gap detection or replay is attempted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::constants::{FRAME_BUFFER, RECONNECT_INITIAL_BACKOFF, RECONNECT_MAX_BACKOFF};
use crate::ws::{self, WsMessage};

/// Handle to the background push connection.
///
/// Dropping the handle stops the background task at its next wake-up.
#[derive(Debug)]
pub struct PushConnection {
    shutdown: Arc<AtomicBool>,
}

/// Internal configuration for the connection loop.
struct ConnectionConfig {
    url: String,
    headers: Vec<(String, String)>,
    shutdown: Arc<AtomicBool>,
}

/// Why the inner message loop returned.
enum LoopExit {
    /// Shutdown requested or consumer gone.
    Stop,
    /// Connection lost; reconnect.
    Disconnected,
}

impl PushConnection {
    /// Spawn the connection task.
    ///
    /// Returns the handle and the receiver of raw frame text.
    #[must_use]
    pub fn connect(url: String, headers: Vec<(String, String)>) -> (Self, mpsc::Receiver<String>) {
        let (frame_tx, frame_rx) = mpsc::channel(FRAME_BUFFER);
        let shutdown = Arc::new(AtomicBool::new(false));

        let config = ConnectionConfig {
            url,
            headers,
            shutdown: Arc::clone(&shutdown),
        };

        tokio::spawn(run_connection_loop(config, frame_tx));

        (Self { shutdown }, frame_rx)
    }

    /// Stop the background task.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

impl Drop for PushConnection {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Next reconnect delay after `current`.
fn next_backoff(current: Duration) -> Duration {
    (current * 2).min(RECONNECT_MAX_BACKOFF)
}

async fn run_connection_loop(config: ConnectionConfig, frame_tx: mpsc::Sender<String>) {
    let mut backoff = RECONNECT_INITIAL_BACKOFF;

    loop {
        if config.shutdown.load(Ordering::SeqCst) {
            log::info!("[Push] Shutdown requested, exiting connection loop");
            return;
        }

        log::info!("[Push] Connecting to {}", config.url);

        match ws::connect(&config.url, &config.headers).await {
            Ok((mut writer, mut reader)) => {
                log::info!("[Push] Connected");
                backoff = RECONNECT_INITIAL_BACKOFF;

                let exit = run_message_loop(&config, &frame_tx, &mut writer, &mut reader).await;
                if let LoopExit::Stop = exit {
                    let _ = writer.close().await;
                    return;
                }
                log::info!(
                    "[Push] Disconnected, reconnecting in {}s",
                    backoff.as_secs()
                );
            }
            Err(e) => {
                log::warn!(
                    "[Push] Connection failed: {:#} (retry in {}s)",
                    e,
                    backoff.as_secs()
                );
            }
        }

        tokio::time::sleep(backoff).await;
        backoff = next_backoff(backoff);
    }
}

async fn run_message_loop(
    config: &ConnectionConfig,
    frame_tx: &mpsc::Sender<String>,
    writer: &mut ws::WsWriter,
    reader: &mut ws::WsReader,
) -> LoopExit {
    // Wake up periodically so a shutdown is seen on an idle connection
    let mut shutdown_check = tokio::time::interval(Duration::from_secs(1));
    shutdown_check.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        if config.shutdown.load(Ordering::SeqCst) {
            log::info!("[Push] Shutdown requested, closing connection");
            return LoopExit::Stop;
        }

        tokio::select! {
            msg = reader.recv() => match msg {
                Some(Ok(WsMessage::Text(text))) => {
                    log::trace!("[Push] Frame: {}", text.chars().take(200).collect::<String>());
                    if frame_tx.send(text).await.is_err() {
                        log::info!("[Push] Frame receiver dropped");
                        return LoopExit::Stop;
                    }
                }
                Some(Ok(WsMessage::Ping(data))) => {
                    if let Err(e) = writer.send_pong(data).await {
                        log::warn!("[Push] Failed to answer ping: {:#}", e);
                        return LoopExit::Disconnected;
                    }
                }
                Some(Ok(WsMessage::Close { code, reason })) => {
                    log::info!("[Push] Closed by server ({code}: {reason})");
                    return LoopExit::Disconnected;
                }
                Some(Ok(WsMessage::Other)) => {}
                Some(Err(e)) => {
                    log::warn!("[Push] {:#}", e);
                    return LoopExit::Disconnected;
                }
                None => {
                    log::info!("[Push] Stream ended");
                    return LoopExit::Disconnected;
                }
            },
            _ = shutdown_check.tick() => {}
        }
    }
}
