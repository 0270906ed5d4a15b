use serde::{Deserialize, Serialize};

use crate::model::SnapshotVersion;
use crate::query::Query;

/// Why a target is registered with the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryPurpose {
    /// A user-requested listen.
    Listen,
    /// Re-query after the server's existence filter disagreed with the
    /// local key set.
    ExistenceFilterMismatch,
    /// Single-document lookup resolving a limbo key.
    LimboResolution,
}

/// Persisted registration of an active (or, under deferred GC, previously
/// active) query target, carrying the state needed to resume its listen.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryData {
    pub target_id: i32,
    pub query: Query,
    pub purpose: QueryPurpose,
    /// Store-wide counter value of the last operation that touched this
    /// target, consulted by deferred sweeps.
    pub sequence_number: i64,
    /// Version through which the server has told us this target is
    /// consistent.
    pub snapshot_version: SnapshotVersion,
    /// Opaque server token replayed on reconnect. Never replaced by an
    /// empty token.
    #[serde(with = "crate::util::base64")]
    pub resume_token: Vec<u8>,
}

impl QueryData {
    pub fn new(query: Query, target_id: i32, sequence_number: i64, purpose: QueryPurpose) -> Self {
        Self {
            target_id,
            query,
            purpose,
            sequence_number,
            snapshot_version: SnapshotVersion::MIN,
            resume_token: Vec::new(),
        }
    }
}
