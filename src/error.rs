//! Error taxonomy: each variant maps to exactly one host-visible failure
//! mode. `ZkInputError` propagates synchronously to the initiator;
//! `SchedulerError`/`ChannelError` are logged and folded into job-row
//! status, never raised across the scheduler/initiator boundary.

use crate::jwt::JwtError;
use crate::poseidon::PoseidonError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ZkInputError {
    #[error(transparent)]
    Jwt(#[from] JwtError),

    #[error(transparent)]
    Poseidon(#[from] PoseidonError),

    #[error("no JWKS entry matches kid {kid:?}")]
    UnknownKid { kid: String },

    #[error("RSA public key is malformed: {0}")]
    InvalidRsaKey(String),

    #[error("ephemeral public key is malformed: {0}")]
    InvalidEphemeralKey(String),

    #[error("salt is not valid ASCII: {0}")]
    InvalidSalt(String),

    #[error("computed base64 span falls outside the JWT string")]
    InvalidJwtSlice,
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("store operation failed: {0}")]
    Store(String),

    #[error("attempted to update a job already in a terminal state")]
    StoreUpdateConflict,

    #[error("no idle worker is available")]
    NoIdleWorker,

    #[error("dispatch to worker {worker_id} failed: {reason}")]
    WorkerDispatchFailed { worker_id: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("connection closed")]
    Closed,

    #[error("missed pong within timeout")]
    PongTimeout,

    #[error("received malformed frame: {0}")]
    MalformedFrame(String),

    #[error("unknown message type: {0}")]
    UnknownMessageType(String),
}

#[derive(Debug, Error)]
pub enum WorkerExecutionError {
    #[error("witness generation failed: {0}")]
    WitnessFailed(String),

    #[error("proving failed: {0}")]
    ProvingFailed(String),

    #[error("failed to materialize job inputs: {0}")]
    MaterializeFailed(#[from] std::io::Error),

    #[error("failed to parse prover output: {0}")]
    OutputParseFailed(String),
}
