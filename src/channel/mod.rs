//! Worker channel runtime: the wire schema both sides agree on, the
//! scheduler-side accept/registry half, and the worker-side reconnecting
//! client half.

pub mod messages;
pub mod server;
pub mod worker_client;

use crate::config::AppConfig;
use std::time::Duration;

pub use messages::{ControlMessage, DispatchMessage, ProofResults, ProofTaskPayload, ReplyMessage};
pub use server::{worker_ws_route, WorkerRegistry};

/// Heartbeat and reconnect timings, threaded from `AppConfig` into both the
/// scheduler-side accept actor (`server::WorkerSession`) and the
/// worker-side reconnect loop (`worker_client::run`), rather than
/// hardcoded per side.
#[derive(Debug, Clone, Copy)]
pub struct ChannelTiming {
    pub ping_interval: Duration,
    pub pong_timeout: Duration,
    pub connection_timeout: Duration,
    pub reconnect_base: Duration,
}

impl From<&AppConfig> for ChannelTiming {
    fn from(config: &AppConfig) -> Self {
        Self {
            ping_interval: Duration::from_millis(config.ping_interval_ms),
            pong_timeout: Duration::from_millis(config.pong_timeout_ms),
            connection_timeout: Duration::from_millis(config.connection_timeout_ms),
            reconnect_base: Duration::from_millis(config.reconnect_base_ms),
        }
    }
}
