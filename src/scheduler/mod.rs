//! Proof Job Scheduler: polls the job store for waiting work, hands it to
//! an idle worker over the channel runtime, and enforces a per-job
//! wall-clock timeout independent of whether the assigned worker ever
//! replies.

use crate::channel::{DispatchMessage, ProofResults, ProofTaskPayload, WorkerRegistry};
use crate::error::SchedulerError;
use crate::store::{JobStore, JobStatus, StatusUpdate};
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use uuid::Uuid;

pub struct Scheduler {
    store: Arc<dyn JobStore>,
    registry: WorkerRegistry,
    proof_timeout: Duration,
    dispatched_at: DashMap<Uuid, Instant>,
}

impl Scheduler {
    pub fn new(store: Arc<dyn JobStore>, registry: WorkerRegistry, proof_timeout: Duration) -> Self {
        Self {
            store,
            registry,
            proof_timeout,
            dispatched_at: DashMap::new(),
        }
    }

    /// One scheduling pass: expire timed-out dispatches, then try to hand
    /// the oldest waiting job to an idle worker. Safe to call repeatedly
    /// on a fixed interval; a pass that finds no work or no idle worker is
    /// a no-op.
    pub fn tick(&self) {
        self.expire_timeouts();

        let Some(job) = self.store.find_oldest_waiting() else {
            return;
        };
        let Some(worker_id) = self.registry.pick_idle() else {
            return;
        };
        let job_id = job.id;

        match self.try_dispatch(job, worker_id) {
            Ok(()) => info!(job_id = %job_id, worker_id = %worker_id, "dispatched proof job"),
            Err(e) => warn!(job_id = %job_id, worker_id = %worker_id, error = %e, "dispatch attempt failed, leaving for retry"),
        }
    }

    fn try_dispatch(&self, job: crate::store::ProofJob, worker_id: Uuid) -> Result<(), SchedulerError> {
        let job_id = job.id;
        let (Some(inputs), Some(fields)) = (job.inputs, job.fields) else {
            let _ = self
                .store
                .update_status(job_id, JobStatus::Failed, StatusUpdate::default(), Utc::now());
            return Err(SchedulerError::Store(format!("job {job_id} missing built inputs")));
        };

        let dispatch = DispatchMessage::GenerateProof {
            proof_id: job_id,
            payload: ProofTaskPayload { inputs, fields },
        };

        self.registry
            .dispatch(worker_id, &dispatch)
            .map_err(|e| SchedulerError::WorkerDispatchFailed {
                worker_id: worker_id.to_string(),
                reason: e.to_string(),
            })?;

        self.store
            .update_status(job_id, JobStatus::Generating, StatusUpdate::default(), Utc::now())
            .map_err(|_| SchedulerError::StoreUpdateConflict)?;

        self.dispatched_at.insert(job_id, Instant::now());
        Ok(())
    }

    fn expire_timeouts(&self) {
        let expired: Vec<Uuid> = self
            .dispatched_at
            .iter()
            .filter(|entry| entry.value().elapsed() > self.proof_timeout)
            .map(|entry| *entry.key())
            .collect();

        for job_id in expired {
            self.dispatched_at.remove(&job_id);
            match self
                .store
                .update_status(job_id, JobStatus::Failed, StatusUpdate::default(), Utc::now())
            {
                Ok(()) => warn!(job_id = %job_id, "proof job timed out"),
                Err(e) => warn!(job_id = %job_id, error = %e, "timeout update rejected, job already terminal"),
            }
        }
    }

    /// Applies a worker's reply. A reply arriving after the job already
    /// timed out hits the store's terminal-state guard and is discarded
    /// rather than resurrecting a failed job.
    pub fn on_result(&self, proof_id: Uuid, results: ProofResults) {
        self.dispatched_at.remove(&proof_id);
        let update = StatusUpdate {
            proof: Some(results.proof),
            public: Some(results.public),
        };
        match self
            .store
            .update_status(proof_id, JobStatus::Generated, update, Utc::now())
        {
            Ok(()) => info!(job_id = %proof_id, "proof job completed"),
            Err(e) => warn!(job_id = %proof_id, error = %e, "late or duplicate result discarded"),
        }
    }
}
