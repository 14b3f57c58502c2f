//! Tamper-evident audit trail
//!
//! Each committed import appends one record per applied mapping. Records are
//! chained: every hash covers the record's fields and the previous hash, so
//! editing or dropping a record breaks [`AuditTrail::verify_integrity`].

use crate::error::AuditError;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Hash of the (absent) record before the first one
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// One audited operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    /// Position in the trail, from 0
    pub sequence: u64,
    /// When the record was appended
    pub timestamp: DateTime<Utc>,
    /// Operation name, e.g. `CreatedNew`
    pub operation: String,
    /// Entity the operation applied to, `type:id`
    pub subject: String,
    /// Free-form detail
    pub detail: String,
    /// Hex hash of the previous record
    pub prev_hash: String,
    /// Hex hash of this record
    pub hash: String,
}

/// Append-only, hash-chained record list
#[derive(Debug, Default)]
pub struct AuditTrail {
    inner: Mutex<Vec<AuditRecord>>,
}

impl AuditTrail {
    /// Empty trail
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record; returns its sequence number
    pub fn append(
        &self,
        operation: impl Into<String>,
        subject: impl Into<String>,
        detail: impl Into<String>,
    ) -> u64 {
        let mut guard = self.inner.lock();
        let sequence = guard.len() as u64;
        let prev_hash = guard
            .last()
            .map_or_else(|| GENESIS_HASH.to_string(), |r| r.hash.clone());
        let mut record = AuditRecord {
            sequence,
            timestamp: Utc::now(),
            operation: operation.into(),
            subject: subject.into(),
            detail: detail.into(),
            prev_hash,
            hash: String::new(),
        };
        record.hash = compute_hash(&record);
        guard.push(record);
        sequence
    }

    /// Copy of every record
    #[must_use]
    pub fn records(&self) -> Vec<AuditRecord> {
        self.inner.lock().clone()
    }

    /// Number of records
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether nothing was recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Check every back link and hash
    ///
    /// # Errors
    ///
    /// [`AuditError::IntegrityViolation`] naming the first bad record.
    pub fn verify_integrity(&self) -> Result<(), AuditError> {
        verify_chain(&self.inner.lock())
    }
}

/// Check a detached list of records, e.g. one read back from disk
///
/// # Errors
///
/// [`AuditError::IntegrityViolation`] naming the first bad record.
pub fn verify_chain(records: &[AuditRecord]) -> Result<(), AuditError> {
    let mut prev: &str = GENESIS_HASH;
    for record in records {
        if record.prev_hash != prev || record.hash != compute_hash(record) {
            return Err(AuditError::IntegrityViolation {
                sequence: record.sequence,
            });
        }
        prev = record.hash.as_str();
    }
    Ok(())
}

fn compute_hash(record: &AuditRecord) -> String {
    let mut hasher = Sha256::new();
    hasher.update(record.sequence.to_le_bytes());
    hasher.update(record.timestamp.to_rfc3339().as_bytes());
    hasher.update([0]);
    hasher.update(record.operation.as_bytes());
    hasher.update([0]);
    hasher.update(record.subject.as_bytes());
    hasher.update([0]);
    hasher.update(record.detail.as_bytes());
    hasher.update([0]);
    hasher.update(record.prev_hash.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn create_test_trail() -> AuditTrail {
        let trail = AuditTrail::new();
        trail.append("CreatedNew", "POLICY:p1", "");
        trail.append("UsedExisting", "FOLDER:root", "");
        trail.append("Deleted", "SECURITY_ZONE:z1", "");
        trail
    }

    #[test]
    fn test_chain_links() {
        let trail = create_test_trail();
        let records = trail.records();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].prev_hash, GENESIS_HASH);
        assert_eq!(records[1].prev_hash, records[0].hash);
        assert_eq!(records[2].sequence, 2);
        assert!(trail.verify_integrity().is_ok());
    }

    #[test]
    fn test_tampering_is_detected() {
        let mut records = create_test_trail().records();
        records[1].subject = "FOLDER:elsewhere".to_string();
        assert!(matches!(
            verify_chain(&records),
            Err(AuditError::IntegrityViolation { sequence: 1 })
        ));

        let mut records = create_test_trail().records();
        records.remove(0);
        assert!(matches!(
            verify_chain(&records),
            Err(AuditError::IntegrityViolation { sequence: 1 })
        ));
    }
}
