//! Proof worker: turns a dispatched job's `CircuitInputs` into a Groth16
//! proof, either in-process via `ark-circom`/`ark-groth16` across the full
//! signal set or by shelling out to standalone witness/prover binaries for
//! deployments that keep the proving toolchain out of the worker's own
//! address space.

use crate::config::{AppConfig, ProofMode};
use crate::error::WorkerExecutionError;
use crate::store::Groth16Proof;
use crate::zkinput::CircuitInputs;
use ark_bn254::{Bn254, Fq, Fq2, Fr, G1Affine, G2Affine};
use ark_circom::{read_zkey, CircomBuilder, CircomConfig, CircomReduction};
use ark_ff::{BigInteger, PrimeField};
use ark_groth16::{Groth16, ProvingKey};
use ark_snark::SNARK;
use num_bigint::BigInt;
use once_cell::sync::OnceCell;
use rand::thread_rng;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;
use tokio::process::Command;
use tokio::sync::Semaphore;

static PROVING_KEY: OnceCell<ProvingKey<Bn254>> = OnceCell::new();
static PROOF_SEM: OnceCell<Semaphore> = OnceCell::new();

fn proof_semaphore() -> &'static Semaphore {
    PROOF_SEM.get_or_init(|| Semaphore::new(num_cpus::get()))
}

fn load_proving_key(zkey_path: &Path) -> Result<&'static ProvingKey<Bn254>, WorkerExecutionError> {
    if let Some(pk) = PROVING_KEY.get() {
        return Ok(pk);
    }
    let mut rd = BufReader::new(
        std::fs::File::open(zkey_path)
            .map_err(|e| WorkerExecutionError::ProvingFailed(format!("opening zkey: {e}")))?,
    );
    let (pk, _) = read_zkey(&mut rd)
        .map_err(|e| WorkerExecutionError::ProvingFailed(format!("invalid zkey: {e}")))?;
    Ok(PROVING_KEY.get_or_init(|| pk))
}

fn fq_to_hex(f: &Fq) -> String {
    let mut bytes = f.into_bigint().to_bytes_be();
    if bytes.len() < 32 {
        bytes = [vec![0u8; 32 - bytes.len()], bytes].concat();
    }
    format!("0x{}", hex::encode(bytes))
}

fn g1_to_hex(p: &G1Affine) -> (String, String) {
    (fq_to_hex(&p.x), fq_to_hex(&p.y))
}

fn g2_to_hex(p: &G2Affine) -> (String, String, String, String) {
    let fq2_to_hex = |f: &Fq2| (fq_to_hex(&f.c0), fq_to_hex(&f.c1));
    let (x0, x1) = fq2_to_hex(&p.x);
    let (y0, y1) = fq2_to_hex(&p.y);
    (x1, x0, y1, y0)
}

fn push_scalar(builder: &mut CircomBuilder<Fr>, name: &str, value: &str) -> Result<(), WorkerExecutionError> {
    let int = BigInt::from_str(value)
        .map_err(|e| WorkerExecutionError::WitnessFailed(format!("{name}: {e}")))?;
    builder.push_input(name, int);
    Ok(())
}

fn push_array(builder: &mut CircomBuilder<Fr>, name: &str, values: &[String]) -> Result<(), WorkerExecutionError> {
    for v in values {
        push_scalar(builder, name, v)?;
    }
    Ok(())
}

fn populate_builder(builder: &mut CircomBuilder<Fr>, inputs: &CircuitInputs) -> Result<(), WorkerExecutionError> {
    push_scalar(builder, "all_inputs_hash", &inputs.all_inputs_hash)?;
    push_scalar(builder, "salt", &inputs.salt)?;
    push_scalar(builder, "max_epoch", &inputs.max_epoch)?;
    push_scalar(builder, "jwt_randomness", &inputs.jwt_randomness)?;
    push_array(builder, "eph_public_key", &inputs.eph_public_key)?;

    push_array(builder, "modulus", &inputs.modulus)?;
    push_array(builder, "signature", &inputs.signature)?;

    push_array(builder, "padded_unsigned_jwt", &inputs.padded_unsigned_jwt)?;
    push_scalar(builder, "payload_len", &inputs.payload_len)?;
    push_scalar(builder, "num_sha2_blocks", &inputs.num_sha2_blocks)?;
    push_scalar(builder, "payload_start_index", &inputs.payload_start_index)?;

    push_array(builder, "ext_kc", &inputs.ext_kc)?;
    push_scalar(builder, "ext_kc_length", &inputs.ext_kc_length)?;
    push_scalar(builder, "kc_index_b64", &inputs.kc_index_b64)?;
    push_scalar(builder, "kc_length_b64", &inputs.kc_length_b64)?;
    push_scalar(builder, "kc_name_length", &inputs.kc_name_length)?;
    push_scalar(builder, "kc_colon_index", &inputs.kc_colon_index)?;
    push_scalar(builder, "kc_value_index", &inputs.kc_value_index)?;
    push_scalar(builder, "kc_value_length", &inputs.kc_value_length)?;

    push_array(builder, "ext_nonce", &inputs.ext_nonce)?;
    push_scalar(builder, "ext_nonce_length", &inputs.ext_nonce_length)?;
    push_scalar(builder, "nonce_index_b64", &inputs.nonce_index_b64)?;
    push_scalar(builder, "nonce_length_b64", &inputs.nonce_length_b64)?;
    push_scalar(builder, "nonce_colon_index", &inputs.nonce_colon_index)?;
    push_scalar(builder, "nonce_value_index", &inputs.nonce_value_index)?;

    push_array(builder, "ext_ev", &inputs.ext_ev)?;
    push_scalar(builder, "ext_ev_length", &inputs.ext_ev_length)?;
    push_scalar(builder, "ev_index_b64", &inputs.ev_index_b64)?;
    push_scalar(builder, "ev_length_b64", &inputs.ev_length_b64)?;
    push_scalar(builder, "ev_name_length", &inputs.ev_name_length)?;
    push_scalar(builder, "ev_colon_index", &inputs.ev_colon_index)?;
    push_scalar(builder, "ev_value_index", &inputs.ev_value_index)?;
    push_scalar(builder, "ev_value_length", &inputs.ev_value_length)?;

    push_array(builder, "ext_aud", &inputs.ext_aud)?;
    push_scalar(builder, "ext_aud_length", &inputs.ext_aud_length)?;
    push_scalar(builder, "aud_index_b64", &inputs.aud_index_b64)?;
    push_scalar(builder, "aud_length_b64", &inputs.aud_length_b64)?;
    push_scalar(builder, "aud_colon_index", &inputs.aud_colon_index)?;
    push_scalar(builder, "aud_value_index", &inputs.aud_value_index)?;
    push_scalar(builder, "aud_value_length", &inputs.aud_value_length)?;

    push_scalar(builder, "iss_index_b64", &inputs.iss_index_b64)?;
    push_scalar(builder, "iss_length_b64", &inputs.iss_length_b64)?;
    Ok(())
}

/// Generates a proof without leaving the worker process: builds the
/// witness from `inputs` via the circuit's wasm witness calculator, then
/// runs Groth16 proving against the preloaded proving key.
pub fn prove_in_process(config: &AppConfig, inputs: &CircuitInputs) -> Result<(Groth16Proof, Vec<String>), WorkerExecutionError> {
    let cfg = CircomConfig::<Fr>::new(&config.wasm_path, &config.r1cs_path)
        .map_err(|e| WorkerExecutionError::WitnessFailed(format!("loading circuit artifacts: {e}")))?;
    let mut builder = CircomBuilder::new(cfg);
    populate_builder(&mut builder, inputs)?;

    let circuit = builder
        .build()
        .map_err(|e| WorkerExecutionError::WitnessFailed(e.to_string()))?;
    let public_inputs = circuit.get_public_inputs().unwrap_or_default();

    let proving_key = load_proving_key(&config.zkey_path)?;
    let mut rng = thread_rng();
    let proof = Groth16::<Bn254, CircomReduction>::prove(proving_key, circuit, &mut rng)
        .map_err(|e| WorkerExecutionError::ProvingFailed(e.to_string()))?;

    let (a_x, a_y) = g1_to_hex(&proof.a);
    let (b_x1, b_x0, b_y1, b_y0) = g2_to_hex(&proof.b);
    let (c_x, c_y) = g1_to_hex(&proof.c);
    let groth16_proof = Groth16Proof {
        pi_a: [a_x, a_y, "1".into()],
        pi_b: [[b_x1, b_x0], [b_y1, b_y0], ["1".into(), "0".into()]],
        pi_c: [c_x, c_y, "1".into()],
    };
    let public = public_inputs.iter().map(|fr| fr.to_string()).collect();
    Ok((groth16_proof, public))
}

/// Generates a proof by shelling out to standalone witness/prover
/// binaries, writing `input.json` into `job_dir` first. `job_dir` must
/// already exist.
pub async fn prove_subprocess(
    config: &AppConfig,
    job_dir: &Path,
    inputs: &CircuitInputs,
) -> Result<(Groth16Proof, Vec<String>), WorkerExecutionError> {
    let input_path = job_dir.join("input.json");
    let witness_path = job_dir.join("witness.wtns");
    let proof_path = job_dir.join("proof.json");
    let public_path = job_dir.join("public.json");

    tokio::fs::write(&input_path, serde_json::to_vec(inputs).unwrap())
        .await
        .map_err(WorkerExecutionError::MaterializeFailed)?;

    let witness_bin = config
        .witness_bin_path
        .as_ref()
        .ok_or_else(|| WorkerExecutionError::WitnessFailed("no witness binary configured".into()))?;
    let status = Command::new(witness_bin)
        .arg(&input_path)
        .arg(&witness_path)
        .status()
        .await
        .map_err(WorkerExecutionError::MaterializeFailed)?;
    if !status.success() {
        return Err(WorkerExecutionError::WitnessFailed(format!("exit status {status}")));
    }

    let prover_bin = config
        .prover_bin_path
        .as_ref()
        .ok_or_else(|| WorkerExecutionError::ProvingFailed("no prover binary configured".into()))?;
    let status = Command::new(prover_bin)
        .arg(&config.zkey_path)
        .arg(&witness_path)
        .arg(&proof_path)
        .arg(&public_path)
        .status()
        .await
        .map_err(WorkerExecutionError::MaterializeFailed)?;
    if !status.success() {
        return Err(WorkerExecutionError::ProvingFailed(format!("exit status {status}")));
    }

    let proof_bytes = tokio::fs::read(&proof_path)
        .await
        .map_err(WorkerExecutionError::MaterializeFailed)?;
    let public_bytes = tokio::fs::read(&public_path)
        .await
        .map_err(WorkerExecutionError::MaterializeFailed)?;
    let proof: Groth16Proof = serde_json::from_slice(&proof_bytes)
        .map_err(|e| WorkerExecutionError::OutputParseFailed(e.to_string()))?;
    let public: Vec<String> = serde_json::from_slice(&public_bytes)
        .map_err(|e| WorkerExecutionError::OutputParseFailed(e.to_string()))?;
    Ok((proof, public))
}

/// Bounds in-process proving to `num_cpus::get()` concurrent jobs; a
/// worker with more dispatched jobs than that queues behind the semaphore
/// rather than oversubscribing the CPU with competing Groth16 provers.
pub async fn prove(config: &AppConfig, job_dir: &Path, inputs: &CircuitInputs) -> Result<(Groth16Proof, Vec<String>), WorkerExecutionError> {
    match config.proof_mode {
        ProofMode::InProcess => {
            let permit = proof_semaphore().acquire().await.expect("semaphore never closed");
            let config = config.clone();
            let inputs = inputs.clone();
            let result = tokio::task::spawn_blocking(move || prove_in_process(&config, &inputs))
                .await
                .map_err(|e| WorkerExecutionError::ProvingFailed(e.to_string()))?;
            drop(permit);
            result
        }
        ProofMode::Subprocess => prove_subprocess(config, job_dir, inputs).await,
    }
}
