//! Layered configuration: defaults, then an optional YAML file, then
//! `ZKID_`-prefixed environment variables, in that order of precedence.
//! Mirrors the figment-based config pattern used across the example pack
//! rather than hand-rolling `std::env::var` parsing.

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProofMode {
    /// Witness + proof generated in-process via `ark-circom`/`ark-groth16`.
    InProcess,
    /// Witness and prover binaries invoked as child processes.
    Subprocess,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub bind_addr: String,
    pub cache_dir: PathBuf,
    pub zkey_path: PathBuf,
    pub wasm_path: PathBuf,
    pub r1cs_path: PathBuf,
    pub witness_bin_path: Option<PathBuf>,
    pub prover_bin_path: Option<PathBuf>,
    pub proof_mode: ProofMode,
    pub proof_server_ws_url: String,
    pub proof_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub ping_interval_ms: u64,
    pub pong_timeout_ms: u64,
    pub connection_timeout_ms: u64,
    pub reconnect_base_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".into(),
            cache_dir: PathBuf::from("./cache"),
            zkey_path: PathBuf::from("circuits/zklogin/zklogin.zkey"),
            wasm_path: PathBuf::from("circuits/zklogin/zklogin_js/zklogin.wasm"),
            r1cs_path: PathBuf::from("circuits/zklogin/zklogin.r1cs"),
            witness_bin_path: None,
            prover_bin_path: None,
            proof_mode: ProofMode::InProcess,
            proof_server_ws_url: "ws://127.0.0.1:8080/ws/worker".into(),
            proof_timeout_ms: 600_000,
            poll_interval_ms: 1_000,
            ping_interval_ms: 30_000,
            pong_timeout_ms: 5_000,
            connection_timeout_ms: 35_000,
            reconnect_base_ms: 5_000,
        }
    }
}

impl AppConfig {
    /// Loads defaults, then `config.yaml` in the current directory if
    /// present, then `ZKID_*` environment overrides.
    pub fn load() -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Yaml::file("config.yaml"))
            .merge(Env::prefixed("ZKID_").split("__"))
            .extract()
    }
}
