//! Finalize intents.
//!
//! Moving a record into the historical collection takes two separate writes
//! (historical upsert, then active delete). An intent is persisted before the
//! first write and advanced after each one, so an interrupted move can be
//! resumed from the phase it reached.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::historical::HistoricalFields;
use super::timestamp::now_timestamp;

/// How far a finalize got.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FinalizePhase {
    /// Intent recorded, historical record not yet written
    Pending,
    /// Historical record written, active record not yet deleted
    HistoricalWritten,
}

impl FinalizePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinalizePhase::Pending => "pending",
            FinalizePhase::HistoricalWritten => "historical_written",
        }
    }
}

impl FromStr for FinalizePhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(FinalizePhase::Pending),
            "historical_written" => Ok(FinalizePhase::HistoricalWritten),
            _ => Err(format!("Unknown finalize phase: {}", s)),
        }
    }
}

/// A persisted, resumable finalize.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinalizeIntent {
    /// Active record being finalized
    pub record_id: String,
    /// Business key of the historical record
    pub registration_number: String,
    /// Payload to write into the historical collection
    pub payload: HistoricalFields,
    /// SHA-256 (hex) of the canonical payload JSON
    pub payload_digest: String,
    pub phase: FinalizePhase,
    pub created_at: String,
    pub updated_at: String,
}

impl FinalizeIntent {
    /// Create a pending intent for the given record.
    pub fn new(record_id: String, payload: HistoricalFields) -> Result<Self, serde_json::Error> {
        let payload_digest = payload_digest(&payload)?;
        let now = now_timestamp();
        Ok(Self {
            record_id,
            registration_number: payload.registration_number.clone(),
            payload,
            payload_digest,
            phase: FinalizePhase::Pending,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Check that the stored digest still matches the payload.
    pub fn is_intact(&self) -> bool {
        payload_digest(&self.payload)
            .map(|digest| digest == self.payload_digest)
            .unwrap_or(false)
    }
}

/// Digest of a historical payload.
pub fn payload_digest(payload: &HistoricalFields) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(payload)?;
    Ok(hex::encode(Sha256::digest(json.as_bytes())))
}
