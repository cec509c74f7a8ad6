//! Proof Job Store.
//!
//! The durable store itself is an external collaborator; this module
//! defines the contract the scheduler consumes (`JobStore`) and an
//! in-memory reference implementation that satisfies it exactly —
//! `insert`/`find_oldest_waiting`/`update_status` are all atomic
//! single-row operations.

use crate::zkinput::{CircuitInputs, SuiProofFields};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Waiting,
    Generating,
    Generated,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Groth16Proof {
    pub pi_a: [String; 3],
    pub pi_b: [[String; 2]; 3],
    pub pi_c: [String; 3],
}

#[derive(Debug, Clone)]
pub struct ProofJob {
    pub id: Uuid,
    pub nonce: String,
    pub jwt: String,
    pub inputs: Option<CircuitInputs>,
    pub fields: Option<SuiProofFields>,
    pub proof: Option<Groth16Proof>,
    pub public: Option<Vec<String>>,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProofJob {
    pub fn new(nonce: String, jwt: String, inputs: CircuitInputs, fields: SuiProofFields, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            nonce,
            jwt,
            inputs: Some(inputs),
            fields: Some(fields),
            proof: None,
            public: None,
            status: JobStatus::Waiting,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, JobStatus::Generated | JobStatus::Failed)
    }
}

/// Fields a terminal (or timeout) transition may set alongside `status`.
#[derive(Debug, Clone, Default)]
pub struct StatusUpdate {
    pub proof: Option<Groth16Proof>,
    pub public: Option<Vec<String>>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no job with id {0}")]
    NotFound(Uuid),

    #[error("job {0} already nonce-registered")]
    DuplicateNonce(String),

    #[error("update rejected: job {0} is already in a terminal state")]
    TerminalStateConflict(Uuid),
}

/// The durable job store's contract. A real deployment backs this with a
/// database; `InMemoryJobStore` below is the reference implementation the
/// scheduler is developed and tested against.
pub trait JobStore: Send + Sync {
    fn insert(&self, job: ProofJob) -> Result<(), StoreError>;
    fn find_oldest_waiting(&self) -> Option<ProofJob>;
    fn get(&self, id: Uuid) -> Option<ProofJob>;
    /// Atomically transition `id` to `new_status`, applying `update` only
    /// if the current row is not already terminal. Returns the error
    /// variant `TerminalStateConflict` (swallowed by callers) if the row
    /// was already `generated`/`failed`.
    fn update_status(
        &self,
        id: Uuid,
        new_status: JobStatus,
        update: StatusUpdate,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

/// `DashMap`-backed reference implementation. FIFO order for
/// `find_oldest_waiting` is maintained by scanning for the minimum
/// `created_at` among `Waiting` rows — fine at the job volumes this
/// system is built for.
pub struct InMemoryJobStore {
    jobs: DashMap<Uuid, ProofJob>,
    nonces: Mutex<std::collections::HashSet<String>>,
}

impl Default for InMemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self {
            jobs: DashMap::new(),
            nonces: Mutex::new(std::collections::HashSet::new()),
        }
    }
}

impl JobStore for InMemoryJobStore {
    fn insert(&self, job: ProofJob) -> Result<(), StoreError> {
        let mut nonces = self.nonces.lock().unwrap();
        if !nonces.insert(job.nonce.clone()) {
            return Err(StoreError::DuplicateNonce(job.nonce));
        }
        self.jobs.insert(job.id, job);
        Ok(())
    }

    fn find_oldest_waiting(&self) -> Option<ProofJob> {
        self.jobs
            .iter()
            .filter(|entry| entry.status == JobStatus::Waiting)
            .min_by_key(|entry| entry.created_at)
            .map(|entry| entry.value().clone())
    }

    fn get(&self, id: Uuid) -> Option<ProofJob> {
        self.jobs.get(&id).map(|entry| entry.value().clone())
    }

    fn update_status(
        &self,
        id: Uuid,
        new_status: JobStatus,
        update: StatusUpdate,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut entry = self.jobs.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if entry.is_terminal() {
            return Err(StoreError::TerminalStateConflict(id));
        }
        entry.status = new_status;
        entry.updated_at = now;
        if let Some(proof) = update.proof {
            entry.proof = Some(proof);
        }
        if let Some(public) = update.public {
            entry.public = Some(public);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zkinput::{IssBase64Details, SuiProofFields};

    fn sample_inputs() -> CircuitInputs {
        CircuitInputs {
            all_inputs_hash: "1".into(),
            salt: "1".into(),
            max_epoch: "1".into(),
            jwt_randomness: "1".into(),
            eph_public_key: ["1".into(), "2".into()],
            modulus: vec!["1".into()],
            signature: vec!["1".into()],
            padded_unsigned_jwt: vec!["0".into()],
            payload_len: "1".into(),
            num_sha2_blocks: "1".into(),
            payload_start_index: "1".into(),
            ext_kc: vec!["0".into()],
            ext_kc_length: "0".into(),
            kc_index_b64: "0".into(),
            kc_length_b64: "0".into(),
            kc_name_length: "0".into(),
            kc_colon_index: "0".into(),
            kc_value_index: "0".into(),
            kc_value_length: "0".into(),
            ext_nonce: vec!["0".into()],
            ext_nonce_length: "0".into(),
            nonce_index_b64: "0".into(),
            nonce_length_b64: "0".into(),
            nonce_colon_index: "0".into(),
            nonce_value_index: "0".into(),
            ext_ev: vec!["0".into()],
            ext_ev_length: "0".into(),
            ev_index_b64: "0".into(),
            ev_length_b64: "0".into(),
            ev_name_length: "0".into(),
            ev_colon_index: "0".into(),
            ev_value_index: "0".into(),
            ev_value_length: "0".into(),
            ext_aud: vec!["0".into()],
            ext_aud_length: "0".into(),
            aud_index_b64: "0".into(),
            aud_length_b64: "0".into(),
            aud_colon_index: "0".into(),
            aud_value_index: "0".into(),
            aud_value_length: "0".into(),
            iss_index_b64: "0".into(),
            iss_length_b64: "0".into(),
        }
    }

    fn sample_fields() -> SuiProofFields {
        SuiProofFields {
            address_seed: "1".into(),
            header: "1".into(),
            iss_base64_details: IssBase64Details {
                value: "1".into(),
                index_mod_4: 0,
            },
        }
    }

    #[test]
    fn duplicate_nonce_is_rejected() {
        let store = InMemoryJobStore::new();
        let now = Utc::now();
        let job_a = ProofJob::new("n1".into(), "jwt".into(), sample_inputs(), sample_fields(), now);
        let job_b = ProofJob::new("n1".into(), "jwt2".into(), sample_inputs(), sample_fields(), now);
        store.insert(job_a).unwrap();
        assert!(matches!(
            store.insert(job_b).unwrap_err(),
            StoreError::DuplicateNonce(_)
        ));
    }

    #[test]
    fn find_oldest_waiting_is_fifo() {
        let store = InMemoryJobStore::new();
        let t0 = Utc::now();
        let t1 = t0 + chrono::Duration::seconds(5);
        let older = ProofJob::new("n1".into(), "jwt".into(), sample_inputs(), sample_fields(), t0);
        let newer = ProofJob::new("n2".into(), "jwt".into(), sample_inputs(), sample_fields(), t1);
        let older_id = older.id;
        store.insert(newer).unwrap();
        store.insert(older).unwrap();
        assert_eq!(store.find_oldest_waiting().unwrap().id, older_id);
    }

    #[test]
    fn terminal_update_is_a_sink() {
        let store = InMemoryJobStore::new();
        let now = Utc::now();
        let job = ProofJob::new("n1".into(), "jwt".into(), sample_inputs(), sample_fields(), now);
        let id = job.id;
        store.insert(job).unwrap();
        store
            .update_status(id, JobStatus::Generating, StatusUpdate::default(), now)
            .unwrap();
        store
            .update_status(id, JobStatus::Failed, StatusUpdate::default(), now)
            .unwrap();
        let err = store
            .update_status(id, JobStatus::Generated, StatusUpdate::default(), now)
            .unwrap_err();
        assert!(matches!(err, StoreError::TerminalStateConflict(_)));
        assert_eq!(store.get(id).unwrap().status, JobStatus::Failed);
    }

    #[test]
    fn updated_at_never_precedes_created_at() {
        let store = InMemoryJobStore::new();
        let now = Utc::now();
        let job = ProofJob::new("n1".into(), "jwt".into(), sample_inputs(), sample_fields(), now);
        let id = job.id;
        let created_at = job.created_at;
        store.insert(job).unwrap();
        let later = now + chrono::Duration::seconds(10);
        store
            .update_status(id, JobStatus::Generating, StatusUpdate::default(), later)
            .unwrap();
        assert!(store.get(id).unwrap().updated_at >= created_at);
    }
}
