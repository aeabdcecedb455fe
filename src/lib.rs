pub mod connection;
pub mod database;
pub mod replica;
pub mod statistics;
pub mod util;

pub use connection::{
    MemoryConnection, RawHandle, RawReplicaInfo, SchemaKind, ServerConnection,
};
pub use database::{ClientOptions, DatabaseHandle, DatabaseRegistry};
pub use replica::{ReplicaCursor, ReplicaInfo};
pub use statistics::Statistics;
pub use util::{Code, Result, Status};
