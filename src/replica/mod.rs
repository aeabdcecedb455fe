/// Replica topology module
///
/// A database is served by a set of replicas forming one consensus group.
/// At any term at most one replica is primary (authoritative for writes);
/// one replica may additionally be marked preferred for read routing.
///
/// # Streaming
///
/// The server reports a replica set as a finite stream. The stream is read
/// through a [`ReplicaCursor`] and always drained completely before any
/// result is returned, so callers only ever see a materialized `Vec`:
///
/// ```text
/// DatabaseHandle::replicas()
///     ↓
/// ServerConnection::stream_replicas() → Box<dyn ReplicaCursor>
///     ↓
/// drain_cursor() → Vec<RawReplicaInfo> → Vec<ReplicaInfo>
///     ↓
/// verify_replica_set() (optional)
/// ```
///
/// The number of records is controlled by the server and may be zero.
use std::collections::HashMap;

use crate::{
    connection::RawReplicaInfo,
    util::{Result, Status},
};

mod replica_info;
mod vec_cursor;

pub use replica_info::ReplicaInfo;
pub use vec_cursor::VecReplicaCursor;

/// Lazy, finite, non-restartable stream of replica records
///
/// # Error Handling
///
/// A transport failure mid-stream is returned from `next()`; the cursor must
/// not be advanced again afterwards.
pub trait ReplicaCursor {
    /// Fetch the next record
    ///
    /// Returns Ok(None) once the stream is exhausted
    fn next(&mut self) -> Result<Option<RawReplicaInfo>>;
}

/// Consume `cursor` to the end, converting every record
///
/// Fails with `InvalidResponse` if the stream yields more than `limit`
/// records. Any error aborts the drain; partial results are discarded.
pub fn drain_cursor(cursor: &mut dyn ReplicaCursor, limit: usize) -> Result<Vec<ReplicaInfo>> {
    let mut replicas = Vec::new();

    while let Some(raw) = cursor.next()? {
        if replicas.len() == limit {
            return Err(Status::invalid_response(format!(
                "Replica stream exceeded {limit} records"
            )));
        }
        replicas.push(ReplicaInfo::try_from(raw)?);
    }

    Ok(replicas)
}

/// Check that no term has more than one primary
pub fn verify_replica_set(replicas: &[ReplicaInfo]) -> Result<()> {
    let mut primaries: HashMap<i64, &str> = HashMap::new();

    for replica in replicas.iter().filter(|r| r.is_primary()) {
        if let Some(other) = primaries.insert(replica.term(), replica.server()) {
            return Err(Status::invalid_response(format!(
                "Replicas {other} and {} both claim primary at term {}",
                replica.server(),
                replica.term()
            )));
        }
    }

    Ok(())
}

/// Primary with the highest term in a snapshot, if any
pub fn latest_primary(replicas: &[ReplicaInfo]) -> Option<&ReplicaInfo> {
    replicas
        .iter()
        .filter(|r| r.is_primary())
        .max_by_key(|r| r.term())
}

/// Preferred replica in a snapshot, falling back to [`latest_primary`]
pub fn preferred_or_primary(replicas: &[ReplicaInfo]) -> Option<&ReplicaInfo> {
    replicas
        .iter()
        .find(|r| r.is_preferred())
        .or_else(|| latest_primary(replicas))
}
