use std::{
    collections::{HashMap, VecDeque},
    sync::atomic::{AtomicU64, Ordering},
    thread,
    time::Duration,
};

use parking_lot::{Mutex, RwLock};

use crate::{
    connection::{RawHandle, RawReplicaInfo, SchemaKind, ServerConnection},
    replica::{ReplicaCursor, VecReplicaCursor},
    util::{Result, Status},
};

pub const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:1729";

/// Server-side state of one database
struct DatabaseState {
    /// Bumped on every create so stale handles from a previous incarnation
    /// resolve to `NotFound`
    incarnation: u64,
    type_schema: String,
    rule_schema: String,
    term: i64,
    /// Index into `MemoryConnection::servers`
    primary: Option<usize>,
    preferred: Option<usize>,
}

/// In-process cluster implementing [`ServerConnection`]
///
/// Every database is replicated on all configured servers. A new database
/// starts at term 1 with the first server as primary and no preference.
///
/// Faults can be injected to exercise error paths:
/// - `fail_next()` queues an error for the next request of any kind
/// - `fail_stream_after()` breaks the next replica stream mid-way
/// - `set_latency()` delays every request, widening race windows
///
/// # Example
///
/// ```ignore
/// use replitopo::{MemoryConnection, DatabaseRegistry, ClientOptions};
///
/// let conn = MemoryConnection::with_servers(["a:1729", "b:1729", "c:1729"]);
/// conn.add_database("mydb")?;
/// conn.elect_primary("mydb", "b:1729")?;
/// ```
pub struct MemoryConnection {
    servers: Vec<String>,
    databases: RwLock<HashMap<String, DatabaseState>>,
    next_incarnation: AtomicU64,
    pending_failures: Mutex<VecDeque<Status>>,
    stream_failure: Mutex<Option<(usize, Status)>>,
    latency: Mutex<Duration>,
    requests: AtomicU64,
}

impl Default for MemoryConnection {
    fn default() -> Self {
        MemoryConnection::with_servers([DEFAULT_SERVER_ADDRESS])
    }
}

impl MemoryConnection {
    pub fn new() -> Self {
        MemoryConnection::default()
    }

    pub fn with_servers<I, S>(servers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MemoryConnection {
            servers: servers.into_iter().map(Into::into).collect(),
            databases: RwLock::new(HashMap::new()),
            next_incarnation: AtomicU64::new(1),
            pending_failures: Mutex::new(VecDeque::new()),
            stream_failure: Mutex::new(None),
            latency: Mutex::new(Duration::ZERO),
            requests: AtomicU64::new(0),
        }
    }

    pub fn servers(&self) -> &[String] {
        &self.servers
    }

    /// Create a database directly on the server side, bypassing fault
    /// injection and request counting
    pub fn add_database(&self, name: &str) -> Result<()> {
        self.insert_database(name).map(|_| ())
    }

    pub fn define_schema(&self, name: &str, type_schema: &str, rule_schema: &str) -> Result<()> {
        let mut databases = self.databases.write();
        let state = Self::state_mut(&mut databases, name)?;
        state.type_schema = type_schema.to_string();
        state.rule_schema = rule_schema.to_string();
        Ok(())
    }

    /// Start a new term with `server` as primary; returns the new term
    pub fn elect_primary(&self, name: &str, server: &str) -> Result<i64> {
        let index = self.server_index(server)?;
        let mut databases = self.databases.write();
        let state = Self::state_mut(&mut databases, name)?;
        state.term += 1;
        state.primary = Some(index);
        Ok(state.term)
    }

    /// Drop the current primary without electing a new one
    pub fn step_down(&self, name: &str) -> Result<()> {
        let mut databases = self.databases.write();
        let state = Self::state_mut(&mut databases, name)?;
        state.primary = None;
        Ok(())
    }

    pub fn set_preferred(&self, name: &str, server: Option<&str>) -> Result<()> {
        let index = server.map(|s| self.server_index(s)).transpose()?;
        let mut databases = self.databases.write();
        let state = Self::state_mut(&mut databases, name)?;
        state.preferred = index;
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.databases.read().contains_key(name)
    }

    /// Make the next request fail with `status`
    pub fn fail_next(&self, status: Status) {
        self.pending_failures.lock().push_back(status);
    }

    /// Make the next replica stream fail after `after` records
    pub fn fail_stream_after(&self, after: usize, status: Status) {
        *self.stream_failure.lock() = Some((after, status));
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    /// Requests received through [`ServerConnection`]
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::SeqCst)
    }

    fn begin_request(&self) -> Result<()> {
        self.requests.fetch_add(1, Ordering::SeqCst);

        let latency = *self.latency.lock();
        if !latency.is_zero() {
            thread::sleep(latency);
        }

        match self.pending_failures.lock().pop_front() {
            Some(status) => Err(status),
            None => Ok(()),
        }
    }

    fn insert_database(&self, name: &str) -> Result<u64> {
        if name.is_empty() {
            return Err(Status::invalid_argument("Database name must not be empty"));
        }

        let mut databases = self.databases.write();
        if databases.contains_key(name) {
            return Err(Status::already_exists(format!(
                "Database '{name}' already exists"
            )));
        }

        let incarnation = self.next_incarnation.fetch_add(1, Ordering::SeqCst);
        databases.insert(
            name.to_string(),
            DatabaseState {
                incarnation,
                type_schema: String::new(),
                rule_schema: String::new(),
                term: 1,
                primary: if self.servers.is_empty() { None } else { Some(0) },
                preferred: None,
            },
        );
        Ok(incarnation)
    }

    fn server_index(&self, server: &str) -> Result<usize> {
        self.servers
            .iter()
            .position(|s| s == server)
            .ok_or_else(|| Status::invalid_argument(format!("Unknown server '{server}'")))
    }

    fn state_mut<'a>(
        databases: &'a mut HashMap<String, DatabaseState>,
        name: &str,
    ) -> Result<&'a mut DatabaseState> {
        databases
            .get_mut(name)
            .ok_or_else(|| Status::not_found(format!("Database '{name}' does not exist")))
    }

    /// Run `f` against the live state `handle` refers to
    fn with_state<T>(&self, handle: &RawHandle, f: impl FnOnce(&DatabaseState) -> T) -> Result<T> {
        let databases = self.databases.read();
        match databases.get(handle.database()) {
            Some(state) if state.incarnation == handle.id() => Ok(f(state)),
            _ => Err(Status::not_found(format!(
                "Database '{}' does not exist",
                handle.database()
            ))),
        }
    }

    fn replica_record(&self, state: &DatabaseState, index: usize) -> RawReplicaInfo {
        RawReplicaInfo::new(
            self.servers[index].clone(),
            state.primary == Some(index),
            state.preferred == Some(index),
            state.term,
        )
    }
}

impl ServerConnection for MemoryConnection {
    fn open_database(&self, name: &str) -> Result<RawHandle> {
        self.begin_request()?;
        let databases = self.databases.read();
        match databases.get(name) {
            Some(state) => Ok(RawHandle::new(state.incarnation, name)),
            None => Err(Status::not_found(format!(
                "Database '{name}' does not exist"
            ))),
        }
    }

    fn create_database(&self, name: &str) -> Result<RawHandle> {
        self.begin_request()?;
        let incarnation = self.insert_database(name)?;
        Ok(RawHandle::new(incarnation, name))
    }

    fn database_exists(&self, name: &str) -> Result<bool> {
        self.begin_request()?;
        Ok(self.contains(name))
    }

    fn list_databases(&self) -> Result<Vec<String>> {
        self.begin_request()?;
        let mut names: Vec<String> = self.databases.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn fetch_schema(&self, handle: &RawHandle, kind: SchemaKind) -> Result<String> {
        self.begin_request()?;
        self.with_state(handle, |state| match kind {
            SchemaKind::Type => state.type_schema.clone(),
            SchemaKind::Rule => state.rule_schema.clone(),
            SchemaKind::Full => [state.type_schema.as_str(), state.rule_schema.as_str()]
                .iter()
                .filter(|part| !part.is_empty())
                .copied()
                .collect::<Vec<_>>()
                .join("\n\n"),
        })
    }

    fn delete_database(&self, handle: &RawHandle) -> Result<()> {
        self.begin_request()?;
        let mut databases = self.databases.write();
        match databases.get(handle.database()) {
            Some(state) if state.incarnation == handle.id() => {
                databases.remove(handle.database());
                Ok(())
            }
            _ => Err(Status::not_found(format!(
                "Database '{}' does not exist",
                handle.database()
            ))),
        }
    }

    fn stream_replicas(&self, handle: &RawHandle) -> Result<Box<dyn ReplicaCursor + '_>> {
        self.begin_request()?;
        let records = self.with_state(handle, |state| {
            (0..self.servers.len())
                .map(|index| self.replica_record(state, index))
                .collect::<Vec<_>>()
        })?;

        let mut cursor = VecReplicaCursor::new(records);
        if let Some((after, status)) = self.stream_failure.lock().take() {
            cursor = cursor.fail_after(after, status);
        }
        Ok(Box::new(cursor))
    }

    fn fetch_primary_replica(&self, handle: &RawHandle) -> Result<RawReplicaInfo> {
        self.begin_request()?;
        self.with_state(handle, |state| {
            state
                .primary
                .map(|index| self.replica_record(state, index))
                .ok_or_else(|| {
                    Status::no_primary_elected(format!(
                        "Database '{}' has no primary at term {}",
                        handle.database(),
                        state.term
                    ))
                })
        })?
    }

    fn fetch_preferred_replica(&self, handle: &RawHandle) -> Result<Option<RawReplicaInfo>> {
        self.begin_request()?;
        self.with_state(handle, |state| {
            state
                .preferred
                .map(|index| self.replica_record(state, index))
        })
    }
}
