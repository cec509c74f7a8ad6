// Toolchain workaround: this rustc's precompiled std only emits `__rust_probestack`
// lazily when a codegen unit needs it, so wasmer-vm's unconditional `extern "C"`
// reference to it can go unresolved at link time. Provide the same no-op fallback
// wasmer-vm itself uses on architectures without stack-probe support.
#[no_mangle]
pub extern "C" fn __rust_probestack() {}

pub mod channel;
pub mod config;
pub mod error;
pub mod jwt;
pub mod nonce;
pub mod poseidon;
pub mod scheduler;
pub mod store;
pub mod worker;
pub mod zkinput;

use actix_web::{dev::Server, web, App, HttpServer};
use channel::{ChannelTiming, WorkerRegistry};
use config::AppConfig;
use scheduler::Scheduler;
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;
use store::JobStore;
use tokio::sync::mpsc;
use tracing::info;

/// Wires the worker-accept WebSocket route onto a listener and returns the
/// `actix-web` `Server` future, plus a background task that drains worker
/// replies into the scheduler and a periodic scheduler tick loop. Mirrors
/// a `run(listener) -> Server` shape so the binary entry point stays a
/// thin `.await` on whatever this returns.
pub fn run(
    listener: TcpListener,
    store: Arc<dyn JobStore>,
    config: AppConfig,
) -> std::io::Result<Server> {
    let registry = WorkerRegistry::new();
    let (results_tx, mut results_rx) = mpsc::unbounded_channel();

    let scheduler = Arc::new(Scheduler::new(
        store,
        registry.clone(),
        Duration::from_millis(config.proof_timeout_ms),
    ));

    let result_scheduler = scheduler.clone();
    tokio::spawn(async move {
        while let Some((proof_id, results)) = results_rx.recv().await {
            result_scheduler.on_result(proof_id, results);
        }
    });

    let tick_scheduler = scheduler.clone();
    let poll_interval = Duration::from_millis(config.poll_interval_ms);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(poll_interval);
        loop {
            interval.tick().await;
            tick_scheduler.tick();
        }
    });

    info!(addr = %listener.local_addr().unwrap(), "zkid scheduler listening");
    let registry_data = web::Data::new(registry);
    let results_tx_data = web::Data::new(results_tx);
    let timing_data = web::Data::new(ChannelTiming::from(&config));
    let server = HttpServer::new(move || {
        App::new()
            .app_data(registry_data.clone())
            .app_data(results_tx_data.clone())
            .app_data(timing_data.clone())
            .route("/ws/worker", web::get().to(channel::worker_ws_route))
    })
    .listen(listener)?
    .run();
    Ok(server)
}
