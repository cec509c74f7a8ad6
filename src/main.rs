use std::net::TcpListener;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use zkid_proof_core::config::AppConfig;
use zkid_proof_core::store::InMemoryJobStore;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "config load failed, using defaults");
        AppConfig::default()
    });

    let store: Arc<dyn zkid_proof_core::store::JobStore> = Arc::new(InMemoryJobStore::new());
    let listener = TcpListener::bind(&config.bind_addr)?;
    zkid_proof_core::run(listener, store, config)?.await
}
