use std::collections::VecDeque;

use crate::{
    connection::RawReplicaInfo,
    replica::ReplicaCursor,
    util::{Result, Status},
};

/// Cursor over an already-fetched batch of replica records
///
/// Optionally fails after a fixed number of records to model a transport
/// that drops mid-stream.
pub struct VecReplicaCursor {
    records: VecDeque<RawReplicaInfo>,
    yielded: usize,
    failure: Option<(usize, Status)>,
    exhausted: bool,
}

impl VecReplicaCursor {
    pub fn new(records: Vec<RawReplicaInfo>) -> Self {
        VecReplicaCursor {
            records: records.into(),
            yielded: 0,
            failure: None,
            exhausted: false,
        }
    }

    /// Return `status` instead of the record at position `after`
    pub fn fail_after(mut self, after: usize, status: Status) -> Self {
        self.failure = Some((after, status));
        self
    }

    /// Records handed out so far
    pub fn yielded(&self) -> usize {
        self.yielded
    }
}

impl ReplicaCursor for VecReplicaCursor {
    fn next(&mut self) -> Result<Option<RawReplicaInfo>> {
        if self.exhausted {
            return Err(Status::invalid_argument(
                "Replica stream already consumed",
            ));
        }

        if let Some((after, status)) = self.failure.take() {
            if after == self.yielded {
                self.exhausted = true;
                return Err(status);
            }
            self.failure = Some((after, status));
        }

        match self.records.pop_front() {
            Some(record) => {
                self.yielded += 1;
                Ok(Some(record))
            }
            None => {
                self.exhausted = true;
                Ok(None)
            }
        }
    }
}
