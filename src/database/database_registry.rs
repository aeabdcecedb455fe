use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::{
    connection::{RawHandle, ServerConnection},
    database::{ClientOptions, DatabaseHandle},
    statistics::Statistics,
    util::{Result, Status},
};

/// Tracks the live database handles of one connection
///
/// DatabaseRegistry maintains:
/// - Map of database name → live handle (at most one per name)
/// - Options and statistics shared with every handle it creates
///
/// # Thread Safety
///
/// The map is protected by a RwLock:
/// - Cache hits use the read lock
/// - Opening, creating and deleting use the write lock, held across the
///   server round trip so a lookup never races a delete of the same name
///
/// # Lifecycle
///
/// ```text
/// get("mydb") → open on server → cache handle
///         ↓
/// get("mydb") again → same Arc
///         ↓
/// delete("mydb") → server delete → handle invalidated → removed from map
///         ↓
/// get("mydb") → NotFound
/// ```
pub struct DatabaseRegistry {
    connection: Arc<dyn ServerConnection>,
    handles: RwLock<HashMap<String, Arc<DatabaseHandle>>>,
    options: ClientOptions,
    statistics: Arc<Statistics>,
}

impl DatabaseRegistry {
    pub fn new(connection: Arc<dyn ServerConnection>, options: ClientOptions) -> Result<Self> {
        options.validate()?;

        Ok(DatabaseRegistry {
            connection,
            handles: RwLock::new(HashMap::new()),
            options,
            statistics: Arc::new(Statistics::new()),
        })
    }

    /// Look up a database, opening it on the server if no live handle exists
    ///
    /// Fails with `NotFound` if the server does not know the name.
    pub fn get(&self, name: &str) -> Result<Arc<DatabaseHandle>> {
        {
            let handles = self.handles.read();
            if let Some(handle) = handles.get(name) {
                if !handle.is_deleted() {
                    return Ok(Arc::clone(handle));
                }
            }
        }

        let mut handles = self.handles.write();
        match handles.get(name).map(|handle| (Arc::clone(handle), handle.is_deleted())) {
            Some((handle, false)) => return Ok(handle),
            Some((_, true)) => {
                // Deleted through the handle itself
                debug!(database = name, "purging deleted handle");
                handles.remove(name);
            }
            None => {}
        }

        let handle = self.open_on_server(name)?;
        handles.insert(name.to_string(), Arc::clone(&handle));

        debug!(database = name, "database opened");
        Ok(handle)
    }

    /// Create a database on the server and return its handle
    ///
    /// Fails with `AlreadyExists` if the name is taken. A cached handle left
    /// over from a database dropped behind the registry's back is
    /// invalidated, since it refers to a previous incarnation.
    pub fn create(&self, name: &str) -> Result<Arc<DatabaseHandle>> {
        if name.is_empty() {
            return Err(Status::invalid_argument("Database name must not be empty"));
        }

        let mut handles = self.handles.write();
        self.statistics.record_round_trip();
        let raw = self.track(self.connection.create_database(name))?;
        let handle = Arc::new(self.new_handle(raw));

        if let Some(stale) = handles.insert(name.to_string(), Arc::clone(&handle)) {
            if stale.invalidate() {
                warn!(database = name, "invalidated handle to a dropped database");
            }
        }

        debug!(database = name, "database created");
        Ok(handle)
    }

    pub fn contains(&self, name: &str) -> Result<bool> {
        self.statistics.record_round_trip();
        self.track(self.connection.database_exists(name))
    }

    /// Handles for every database the server reports
    ///
    /// Databases deleted between listing and opening are skipped.
    pub fn all(&self) -> Result<Vec<Arc<DatabaseHandle>>> {
        self.statistics.record_round_trip();
        let names = self.track(self.connection.list_databases())?;

        let mut databases = Vec::with_capacity(names.len());
        for name in names {
            match self.get(&name) {
                Ok(handle) => databases.push(handle),
                Err(e) if e.is_not_found() => {
                    debug!(database = %name, "database vanished while listing");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(databases)
    }

    /// Delete a database and invalidate its handle
    ///
    /// Holders of the handle observe `HandleInvalidated` on next use;
    /// subsequent lookups fail with `NotFound`. If the server rejects the
    /// delete the handle stays registered and valid.
    pub fn delete(&self, name: &str) -> Result<()> {
        let mut handles = self.handles.write();

        let cached = handles
            .get(name)
            .filter(|handle| !handle.is_deleted())
            .cloned();

        let handle = match cached {
            Some(handle) => handle,
            None => {
                handles.remove(name);
                self.open_on_server(name)?
            }
        };

        handle.delete()?;
        handles.remove(name);
        Ok(())
    }

    /// Number of handles currently cached, including ones deleted through
    /// the handle and not yet purged
    pub fn cached_count(&self) -> usize {
        self.handles.read().len()
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn statistics(&self) -> &Arc<Statistics> {
        &self.statistics
    }

    fn open_on_server(&self, name: &str) -> Result<Arc<DatabaseHandle>> {
        self.statistics.record_round_trip();
        let raw = self.track(self.connection.open_database(name))?;
        self.statistics.record_open();
        Ok(Arc::new(self.new_handle(raw)))
    }

    fn new_handle(&self, raw: RawHandle) -> DatabaseHandle {
        DatabaseHandle::new(
            raw,
            Arc::clone(&self.connection),
            self.options.clone(),
            Arc::clone(&self.statistics),
        )
    }

    fn track<T>(&self, result: Result<T>) -> Result<T> {
        if result.is_err() {
            self.statistics.record_error();
        }
        result
    }
}
