use std::{fmt, sync::Arc};

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::{
    connection::{RawHandle, SchemaKind, ServerConnection},
    database::ClientOptions,
    replica::{self, ReplicaInfo},
    statistics::Statistics,
    util::{Result, Status},
};

/// Handle to a database on the server
///
/// Owns the transport's [`RawHandle`] for as long as the database exists.
/// Every accessor is a synchronous round trip; no topology is cached here.
///
/// # Lifetime
///
/// After [`delete`](Self::delete) succeeds the token is dropped and every
/// method except [`name`](Self::name) fails with `HandleInvalidated`
/// without contacting the server.
///
/// # Thread Safety
///
/// Reads hold the token's read lock for the whole round trip and `delete`
/// holds the write lock across the server call. A read racing a delete
/// either completes first or observes the deleted state; it never runs
/// against a database the server has already dropped.
///
/// # Example
///
/// ```ignore
/// let db = registry.get("mydb")?;
/// let primary = db.primary_replica()?;
/// println!("{} routes writes to {}", db.name(), primary.server());
/// ```
pub struct DatabaseHandle {
    name: String,
    connection: Arc<dyn ServerConnection>,
    raw: RwLock<Option<RawHandle>>,
    options: ClientOptions,
    statistics: Arc<Statistics>,
}

impl DatabaseHandle {
    pub(crate) fn new(
        raw: RawHandle,
        connection: Arc<dyn ServerConnection>,
        options: ClientOptions,
        statistics: Arc<Statistics>,
    ) -> Self {
        DatabaseHandle {
            name: raw.database().to_string(),
            connection,
            raw: RwLock::new(Some(raw)),
            options,
            statistics,
        }
    }

    /// Database name; available even after deletion
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_deleted(&self) -> bool {
        self.raw.read().is_none()
    }

    /// Full schema: type definitions followed by rules
    pub fn schema(&self) -> Result<String> {
        self.fetch_schema(SchemaKind::Full)
    }

    pub fn type_schema(&self) -> Result<String> {
        self.fetch_schema(SchemaKind::Type)
    }

    pub fn rule_schema(&self) -> Result<String> {
        self.fetch_schema(SchemaKind::Rule)
    }

    /// Delete the database on the server
    ///
    /// A failed request leaves the handle valid. Once deleted, further calls
    /// fail with `HandleInvalidated` and are not sent.
    pub fn delete(&self) -> Result<()> {
        let mut guard = self.raw.write();
        let raw = guard.as_ref().ok_or_else(|| self.invalidated())?;

        self.statistics.record_round_trip();
        self.track(self.connection.delete_database(raw))?;
        self.statistics.record_delete();

        *guard = None;
        debug!(database = %self.name, "database deleted");
        Ok(())
    }

    /// Every replica of the database, in the order the server reported
    ///
    /// The server stream is drained completely before returning; the result
    /// may be empty. Ordering is not guaranteed to be stable across calls.
    pub fn replicas(&self) -> Result<Vec<ReplicaInfo>> {
        self.with_raw(|raw| {
            self.statistics.record_round_trip();
            let mut cursor = self.track(self.connection.stream_replicas(raw))?;
            let replicas = self.track(replica::drain_cursor(
                cursor.as_mut(),
                self.options.max_replicas,
            ))?;

            if self.options.verify_replica_set {
                self.track(replica::verify_replica_set(&replicas))?;
            }

            self.statistics
                .record_replica_fetch(replicas.len() as u64);
            debug!(database = %self.name, count = replicas.len(), "fetched replica set");
            Ok(replicas)
        })
    }

    /// The replica currently believed to be primary
    ///
    /// Fails with `NoPrimaryElected` while the cluster is between leaders.
    pub fn primary_replica(&self) -> Result<ReplicaInfo> {
        self.with_raw(|raw| self.fetch_primary(raw))
    }

    /// The read-routing replica, or the primary if no preference is set
    pub fn preferred_replica(&self) -> Result<ReplicaInfo> {
        self.with_raw(|raw| {
            self.statistics.record_round_trip();
            match self.track(self.connection.fetch_preferred_replica(raw))? {
                Some(preferred) => {
                    let preferred = self.track(ReplicaInfo::try_from(preferred))?;
                    self.statistics.record_replica_fetch(1);
                    Ok(preferred)
                }
                None => {
                    debug!(database = %self.name, "no preferred replica, using primary");
                    self.fetch_primary(raw)
                }
            }
        })
    }

    /// Drop the token without contacting the server
    ///
    /// Used when the server-side database is known to be gone, e.g. it was
    /// recreated under the same name.
    pub(crate) fn invalidate(&self) -> bool {
        let invalidated = self.raw.write().take().is_some();
        if invalidated {
            debug!(database = %self.name, "handle invalidated locally");
        }
        invalidated
    }

    fn fetch_schema(&self, kind: SchemaKind) -> Result<String> {
        self.with_raw(|raw| {
            self.statistics.record_round_trip();
            let schema = self.track(self.connection.fetch_schema(raw, kind))?;
            self.statistics.record_schema_fetch();
            Ok(schema)
        })
    }

    fn fetch_primary(&self, raw: &RawHandle) -> Result<ReplicaInfo> {
        self.statistics.record_round_trip();
        let primary = self.track(self.connection.fetch_primary_replica(raw))?;

        if !primary.is_primary {
            warn!(
                database = %self.name,
                server = %primary.server,
                "server returned a non-primary replica as primary"
            );
            return self.track(Err(Status::invalid_response(format!(
                "Replica {} returned as primary is not primary",
                primary.server
            ))));
        }

        let primary = self.track(ReplicaInfo::try_from(primary))?;
        self.statistics.record_replica_fetch(1);
        Ok(primary)
    }

    /// Run `f` with the token while holding the read lock
    fn with_raw<T>(&self, f: impl FnOnce(&RawHandle) -> Result<T>) -> Result<T> {
        let guard = self.raw.read();
        let raw = guard.as_ref().ok_or_else(|| self.invalidated())?;
        f(raw)
    }

    fn invalidated(&self) -> Status {
        self.statistics.record_invalidated_rejection();
        Status::handle_invalidated(format!("Database '{}' has been deleted", self.name))
    }

    fn track<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            self.statistics.record_error();
            debug!(database = %self.name, error = %e, "request failed");
        }
        result
    }
}

impl fmt::Display for DatabaseHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl fmt::Debug for DatabaseHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseHandle")
            .field("name", &self.name)
            .field("deleted", &self.is_deleted())
            .finish()
    }
}
