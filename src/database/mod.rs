/// Database module
///
/// A [`DatabaseRegistry`] hands out at most one live [`DatabaseHandle`] per
/// database name for a connection. Handles own the server-side reference and
/// answer schema and replica topology queries.
///
/// # Architecture
///
/// ```text
/// DatabaseRegistry (one per connection)
///  ├─→ DatabaseHandle("mydb")
///  │    ├─→ schema / type_schema / rule_schema
///  │    ├─→ replicas / primary_replica / preferred_replica
///  │    └─→ delete
///  └─→ DatabaseHandle("other")
///       └─→ ...
///            ↓
///  Arc<dyn ServerConnection> (shared by all handles)
/// ```
///
/// # Usage
///
/// ```ignore
/// use std::sync::Arc;
/// use replitopo::{ClientOptions, DatabaseRegistry, MemoryConnection};
///
/// let conn = Arc::new(MemoryConnection::with_servers(["a:1729", "b:1729"]));
/// conn.add_database("mydb")?;
///
/// let registry = DatabaseRegistry::new(conn, ClientOptions::default())?;
/// let db = registry.get("mydb")?;
/// for replica in db.replicas()? {
///     println!("{replica}");
/// }
/// registry.delete("mydb")?;
/// assert!(db.schema().unwrap_err().is_handle_invalidated());
/// ```
pub mod client_options;
pub mod database_handle;
pub mod database_registry;

pub use client_options::ClientOptions;
pub use database_handle::DatabaseHandle;
pub use database_registry::DatabaseRegistry;
