/// Transport seam
///
/// Everything this crate knows about the server goes through the
/// [`ServerConnection`] trait. Implementations own the network, timeouts and
/// any retry policy; errors they return are surfaced to callers unchanged.
///
/// # Thread Safety
///
/// A connection is shared read-only by every handle opened on it, so all
/// methods take `&self` and implementations must be `Send + Sync`.
///
/// # Handles
///
/// ```text
/// open_database("mydb") → RawHandle ──owned by──→ DatabaseHandle
///                              │
///      fetch_schema / stream_replicas / fetch_*_replica  (borrow)
///                              │
///                   delete_database (borrow, then dropped)
/// ```
use std::fmt;

use crate::{replica::ReplicaCursor, util::Result};

pub mod memory;

pub use memory::MemoryConnection;

/// Opaque server-side database reference
///
/// Move-only: exactly one [`DatabaseHandle`](crate::DatabaseHandle) owns it.
pub struct RawHandle {
    id: u64,
    database: String,
}

impl RawHandle {
    /// Issued by transports when a database is opened or created
    pub fn new(id: u64, database: impl Into<String>) -> Self {
        RawHandle {
            id,
            database: database.into(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn database(&self) -> &str {
        &self.database
    }
}

impl fmt::Debug for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawHandle({}#{})", self.database, self.id)
    }
}

/// Which part of the schema to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    /// Types and rules
    Full,
    Type,
    Rule,
}

/// Replica record as reported by the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReplicaInfo {
    pub server: String,
    pub is_primary: bool,
    pub is_preferred: bool,
    pub term: i64,
}

impl RawReplicaInfo {
    pub fn new(server: impl Into<String>, is_primary: bool, is_preferred: bool, term: i64) -> Self {
        RawReplicaInfo {
            server: server.into(),
            is_primary,
            is_preferred,
            term,
        }
    }
}

/// Operations a transport provides to the topology client
pub trait ServerConnection: Send + Sync {
    /// Returns `NotFound` if the database does not exist
    fn open_database(&self, name: &str) -> Result<RawHandle>;

    /// Returns `AlreadyExists` if the database exists
    fn create_database(&self, name: &str) -> Result<RawHandle>;

    fn database_exists(&self, name: &str) -> Result<bool>;

    fn list_databases(&self) -> Result<Vec<String>>;

    fn fetch_schema(&self, handle: &RawHandle, kind: SchemaKind) -> Result<String>;

    fn delete_database(&self, handle: &RawHandle) -> Result<()>;

    /// Start a replica stream; the cursor is finite and cannot be restarted
    fn stream_replicas(&self, handle: &RawHandle) -> Result<Box<dyn ReplicaCursor + '_>>;

    /// Returns `NoPrimaryElected` while the group has no primary
    fn fetch_primary_replica(&self, handle: &RawHandle) -> Result<RawReplicaInfo>;

    /// Returns `None` if no preference is configured server-side
    fn fetch_preferred_replica(&self, handle: &RawHandle) -> Result<Option<RawReplicaInfo>>;
}
