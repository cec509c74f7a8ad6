use tracing_subscriber::EnvFilter;
use zkid_proof_core::channel::{worker_client, ChannelTiming, DispatchMessage, ProofResults, ReplyMessage};
use zkid_proof_core::config::AppConfig;
use zkid_proof_core::worker::prove;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "config load failed, using defaults");
        AppConfig::default()
    });

    let url = config.proof_server_ws_url.clone();
    let timing = ChannelTiming::from(&config);
    worker_client::run(&url, timing, move |dispatch, reply_tx| {
        let config = config.clone();
        tokio::spawn(async move {
            let DispatchMessage::GenerateProof { proof_id, payload } = dispatch;
            let job_dir = config.cache_dir.join(&payload.fields.address_seed);
            if let Err(e) = tokio::fs::create_dir_all(&job_dir).await {
                tracing::warn!(job_id = %proof_id, error = %e, "failed to create job cache dir");
                return;
            }
            match prove(&config, &job_dir, &payload.inputs).await {
                Ok((proof, public)) => {
                    let _ = reply_tx.send(ReplyMessage::GenerateProof {
                        proof_id,
                        results: ProofResults { proof, public },
                    });
                }
                Err(e) => {
                    tracing::warn!(job_id = %proof_id, error = %e, "proof generation failed, no reply sent");
                }
            }
        });
    })
    .await;
}
