use std::sync::atomic::{AtomicU64, Ordering};

/// Client-side statistics
///
/// Shared by a registry and every handle it hands out. Uses atomic counters
/// for lock-free updates.
#[derive(Debug, Default)]
pub struct Statistics {
    // Server round trips; the counters below only count successes
    pub round_trips: AtomicU64,
    pub schema_fetches: AtomicU64,
    pub replica_fetches: AtomicU64,
    pub replicas_streamed: AtomicU64,

    // Lifecycle
    pub databases_opened: AtomicU64,
    pub databases_deleted: AtomicU64,

    // Calls refused locally because the handle was deleted
    pub invalidated_rejections: AtomicU64,

    // Error counts
    pub num_errors: AtomicU64,
}

impl Statistics {
    pub fn new() -> Self {
        Statistics::default()
    }

    /// Counted before every request, whatever its outcome
    #[inline]
    pub fn record_round_trip(&self) {
        self.round_trips.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_schema_fetch(&self) {
        self.schema_fetches.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_replica_fetch(&self, num_replicas: u64) {
        self.replica_fetches.fetch_add(1, Ordering::Relaxed);
        self.replicas_streamed
            .fetch_add(num_replicas, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_open(&self) {
        self.databases_opened.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_delete(&self) {
        self.databases_deleted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_invalidated_rejection(&self) {
        self.invalidated_rejections
            .fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_error(&self) {
        self.num_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn round_trips(&self) -> u64 {
        self.round_trips.load(Ordering::Relaxed)
    }

    pub fn schema_fetches(&self) -> u64 {
        self.schema_fetches.load(Ordering::Relaxed)
    }

    pub fn replica_fetches(&self) -> u64 {
        self.replica_fetches.load(Ordering::Relaxed)
    }

    pub fn replicas_streamed(&self) -> u64 {
        self.replicas_streamed.load(Ordering::Relaxed)
    }

    pub fn databases_opened(&self) -> u64 {
        self.databases_opened.load(Ordering::Relaxed)
    }

    pub fn databases_deleted(&self) -> u64 {
        self.databases_deleted.load(Ordering::Relaxed)
    }

    pub fn invalidated_rejections(&self) -> u64 {
        self.invalidated_rejections.load(Ordering::Relaxed)
    }

    pub fn num_errors(&self) -> u64 {
        self.num_errors.load(Ordering::Relaxed)
    }

    pub fn error_rate(&self) -> f64 {
        let errors = self.num_errors() as f64;
        let total = self.round_trips() as f64;
        if total > 0.0 { errors / total } else { 0.0 }
    }

    /// Reset all statistics to zero
    pub fn reset(&self) {
        self.round_trips.store(0, Ordering::Relaxed);
        self.schema_fetches.store(0, Ordering::Relaxed);
        self.replica_fetches.store(0, Ordering::Relaxed);
        self.replicas_streamed.store(0, Ordering::Relaxed);
        self.databases_opened.store(0, Ordering::Relaxed);
        self.databases_deleted.store(0, Ordering::Relaxed);
        self.invalidated_rejections.store(0, Ordering::Relaxed);
        self.num_errors.store(0, Ordering::Relaxed);
    }

    /// Get a formatted statistics report
    pub fn report(&self) -> String {
        format!(
            "Client Statistics:\n\
            \n\
            Round trips:     {}\n\
            - Schema:        {}\n\
            - Replica sets:  {}\n\
            - Replicas seen: {}\n\
            \n\
            Databases:\n\
            - Opened:        {}\n\
            - Deleted:       {}\n\
            \n\
            Rejected (deleted handle): {}\n\
            Errors:          {} ({:.2}%)",
            self.round_trips(),
            self.schema_fetches(),
            self.replica_fetches(),
            self.replicas_streamed(),
            self.databases_opened(),
            self.databases_deleted(),
            self.invalidated_rejections(),
            self.num_errors(),
            self.error_rate() * 100.0,
        )
    }
}
