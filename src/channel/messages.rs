//! Worker wire protocol. Frames are UTF-8 JSON objects; dispatch and
//! reply frames share the `{task, proofId, ...}` shape so a worker can
//! tell its own echoes apart from a genuine dispatch without extra
//! framing.

use crate::store::Groth16Proof;
use crate::zkinput::{CircuitInputs, SuiProofFields};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofTaskPayload {
    pub inputs: CircuitInputs,
    pub fields: SuiProofFields,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofResults {
    pub proof: Groth16Proof,
    pub public: Vec<String>,
}

/// Scheduler -> worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "task")]
pub enum DispatchMessage {
    #[serde(rename = "generateProof")]
    GenerateProof {
        #[serde(rename = "proofId")]
        proof_id: Uuid,
        payload: ProofTaskPayload,
    },
}

/// Worker -> scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "task")]
pub enum ReplyMessage {
    #[serde(rename = "generateProof")]
    GenerateProof {
        #[serde(rename = "proofId")]
        proof_id: Uuid,
        results: ProofResults,
    },
}

/// Heartbeat control frames, either direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlMessage {
    Ping,
    Pong,
}

/// Sniff a raw text frame to decide which of the three shapes above it is,
/// without committing to a direction ahead of time — both peers accept
/// control frames, and logging+discarding unknown types has to happen
/// before we know which typed shape applies.
pub enum SniffedFrame {
    Control(ControlMessage),
    Dispatch(DispatchMessage),
    Reply(ReplyMessage),
    Unknown(String),
}

pub fn sniff(raw: &str) -> SniffedFrame {
    let value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(_) => return SniffedFrame::Unknown(raw.to_string()),
    };

    if value.get("type").is_some() {
        if let Ok(control) = serde_json::from_value::<ControlMessage>(value.clone()) {
            return SniffedFrame::Control(control);
        }
    }
    if let Some(task) = value.get("task").and_then(|t| t.as_str()) {
        if task == "generateProof" {
            if value.get("payload").is_some() {
                if let Ok(dispatch) = serde_json::from_value::<DispatchMessage>(value.clone()) {
                    return SniffedFrame::Dispatch(dispatch);
                }
            }
            if value.get("results").is_some() {
                if let Ok(reply) = serde_json::from_value::<ReplyMessage>(value) {
                    return SniffedFrame::Reply(reply);
                }
            }
        }
    }
    SniffedFrame::Unknown(raw.to_string())
}
