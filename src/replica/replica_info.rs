use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    connection::RawReplicaInfo,
    util::{Result, Status},
};

/// Point-in-time description of one replica of a database
///
/// A `ReplicaInfo` is a copy: it is owned by the caller once returned and is
/// not updated when the cluster changes. Fetch a fresh one from the
/// [`DatabaseHandle`](crate::DatabaseHandle) to observe the current topology.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReplicaInfo {
    server: String,
    is_primary: bool,
    is_preferred: bool,
    term: i64,
}

impl ReplicaInfo {
    pub fn new(server: impl Into<String>, is_primary: bool, is_preferred: bool, term: i64) -> Self {
        ReplicaInfo {
            server: server.into(),
            is_primary,
            is_preferred,
            term,
        }
    }

    /// Network address of the server hosting this replica
    pub fn server(&self) -> &str {
        &self.server
    }

    /// Whether this replica was authoritative for writes when observed
    pub fn is_primary(&self) -> bool {
        self.is_primary
    }

    /// Whether this replica is the read-routing hint
    pub fn is_preferred(&self) -> bool {
        self.is_preferred
    }

    /// Election term the replica reported
    pub fn term(&self) -> i64 {
        self.term
    }
}

impl TryFrom<RawReplicaInfo> for ReplicaInfo {
    type Error = Status;

    fn try_from(raw: RawReplicaInfo) -> Result<Self> {
        if raw.server.is_empty() {
            return Err(Status::invalid_response(
                "Replica record has an empty server address",
            ));
        }
        if raw.term < 0 {
            return Err(Status::invalid_response(format!(
                "Replica {} reported negative term {}",
                raw.server, raw.term
            )));
        }

        Ok(ReplicaInfo {
            server: raw.server,
            is_primary: raw.is_primary,
            is_preferred: raw.is_preferred,
            term: raw.term,
        })
    }
}

impl fmt::Display for ReplicaInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let role = if self.is_primary { "primary" } else { "secondary" };
        write!(f, "{} ({role}, term {})", self.server, self.term)?;
        if self.is_preferred {
            write!(f, " [preferred]")?;
        }
        Ok(())
    }
}
