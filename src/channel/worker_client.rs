//! Worker-channel client side: a reconnecting `tokio-tungstenite` loop that
//! a worker process runs against the scheduler's accept endpoint. Handles
//! its own liveness (sends pings, expects pongs) and backs off
//! exponentially between connection attempts.

use crate::channel::messages::{sniff, ControlMessage, DispatchMessage, ReplyMessage, SniffedFrame};
use crate::channel::ChannelTiming;
use crate::error::ChannelError;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

const RECONNECT_MAX_EXPONENT: u32 = 6;

/// Handed to the caller's task-execution closure for each dispatched job;
/// the closure sends exactly one `ReplyMessage` back through this sender.
pub type ReplySender = mpsc::UnboundedSender<ReplyMessage>;

/// Runs forever, reconnecting with exponential backoff on every drop.
/// `on_dispatch` is invoked once per `DispatchMessage` received; it owns a
/// clone of `ReplySender` to report results back whenever the proof
/// finishes, independent of how long that takes relative to the socket's
/// own heartbeat cadence.
pub async fn run<F>(url: &str, timing: ChannelTiming, on_dispatch: F)
where
    F: Fn(DispatchMessage, ReplySender) + Send + Sync + 'static,
{
    let mut attempt: u32 = 0;
    loop {
        match connect_and_serve(url, timing, &on_dispatch).await {
            Ok(()) => {
                info!("worker channel closed cleanly, reconnecting");
                attempt = 0;
            }
            Err(e) => {
                warn!(error = %e, attempt, "worker channel dropped");
            }
        }
        let exponent: u32 = attempt.min(RECONNECT_MAX_EXPONENT);
        let delay = timing.reconnect_base * 2u32.pow(exponent);
        attempt += 1;
        tokio::time::sleep(delay).await;
    }
}

async fn connect_and_serve<F>(url: &str, timing: ChannelTiming, on_dispatch: &F) -> Result<(), ChannelError>
where
    F: Fn(DispatchMessage, ReplySender) + Send + Sync + 'static,
{
    let (ws_stream, _) = tokio_tungstenite::connect_async(url)
        .await
        .map_err(|e| ChannelError::MalformedFrame(e.to_string()))?;
    info!(url, "worker channel connected");
    let (mut write, mut read) = ws_stream.split();

    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<ReplyMessage>();
    let mut last_pong = tokio::time::Instant::now();
    let mut ping_timer = tokio::time::interval(timing.ping_interval);
    ping_timer.tick().await;

    loop {
        tokio::select! {
            _ = ping_timer.tick() => {
                if last_pong.elapsed() > timing.ping_interval + timing.pong_timeout {
                    return Err(ChannelError::PongTimeout);
                }
                let ping = serde_json::to_string(&ControlMessage::Ping).unwrap();
                write.send(Message::Text(ping)).await.map_err(|e| ChannelError::MalformedFrame(e.to_string()))?;
            }
            reply = reply_rx.recv() => {
                match reply {
                    Some(reply) => {
                        let text = serde_json::to_string(&reply).map_err(|e| ChannelError::MalformedFrame(e.to_string()))?;
                        write.send(Message::Text(text)).await.map_err(|e| ChannelError::MalformedFrame(e.to_string()))?;
                    }
                    None => return Err(ChannelError::Closed),
                }
            }
            frame = read.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => match sniff(&text) {
                        SniffedFrame::Control(ControlMessage::Ping) => {
                            let pong = serde_json::to_string(&ControlMessage::Pong).unwrap();
                            write.send(Message::Text(pong)).await.map_err(|e| ChannelError::MalformedFrame(e.to_string()))?;
                        }
                        SniffedFrame::Control(ControlMessage::Pong) => {
                            last_pong = tokio::time::Instant::now();
                        }
                        SniffedFrame::Dispatch(dispatch) => {
                            on_dispatch(dispatch, reply_tx.clone());
                        }
                        SniffedFrame::Reply(_) => {
                            debug!("ignoring reply-shaped frame from scheduler");
                        }
                        SniffedFrame::Unknown(raw) => {
                            warn!(frame = %raw, "unknown message type, discarding");
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => return Ok(()),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(ChannelError::MalformedFrame(e.to_string())),
                }
            }
        }
    }
}
