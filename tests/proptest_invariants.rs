//! Property-based tests for handle lifecycle and replica topology
//!
//! # Invariants
//!
//! ## 1. Handle Lifecycle
//! - After a successful delete, every accessor except `name()` fails with
//!   `HandleInvalidated` and no request reaches the server
//! - A failed delete leaves the handle fully usable
//!
//! ## 2. Replica Topology
//! - A replica set never contains two primaries for the same term
//! - The primary term never decreases across repeated reads
//! - `replicas()` is set-equal to the cluster's servers
//!
//! # Test Strategy
//!
//! Cluster events (elections, step-downs, preference changes) are generated
//! randomly and applied to a `MemoryConnection`; a model tracks the expected
//! term and primary.

use std::{collections::HashSet, sync::Arc};

use proptest::prelude::*;
use replitopo::{
    ClientOptions, DatabaseRegistry, MemoryConnection, ReplicaInfo, ServerConnection, Status,
    replica,
};

// ============================================================================
// Helper Functions
// ============================================================================

fn arbitrary_servers() -> impl Strategy<Value = Vec<String>> {
    prop::collection::hash_set("[a-z]{1,8}:[0-9]{2,5}", 1..=7)
        .prop_map(|set| set.into_iter().collect())
}

#[derive(Debug, Clone)]
enum ClusterEvent {
    Elect(usize),
    StepDown,
    Prefer(Option<usize>),
}

fn arbitrary_event() -> impl Strategy<Value = ClusterEvent> {
    prop_oneof![
        (0usize..16).prop_map(ClusterEvent::Elect),
        Just(ClusterEvent::StepDown),
        prop::option::of(0usize..16).prop_map(ClusterEvent::Prefer),
    ]
}

#[derive(Debug, Clone, Copy)]
enum Accessor {
    Schema,
    TypeSchema,
    RuleSchema,
    Delete,
    Replicas,
    Primary,
    Preferred,
}

fn arbitrary_accessor() -> impl Strategy<Value = Accessor> {
    prop_oneof![
        Just(Accessor::Schema),
        Just(Accessor::TypeSchema),
        Just(Accessor::RuleSchema),
        Just(Accessor::Delete),
        Just(Accessor::Replicas),
        Just(Accessor::Primary),
        Just(Accessor::Preferred),
    ]
}

fn call(db: &replitopo::DatabaseHandle, accessor: Accessor) -> Result<(), Status> {
    match accessor {
        Accessor::Schema => db.schema().map(|_| ()),
        Accessor::TypeSchema => db.type_schema().map(|_| ()),
        Accessor::RuleSchema => db.rule_schema().map(|_| ()),
        Accessor::Delete => db.delete(),
        Accessor::Replicas => db.replicas().map(|_| ()),
        Accessor::Primary => db.primary_replica().map(|_| ()),
        Accessor::Preferred => db.preferred_replica().map(|_| ()),
    }
}

fn setup(servers: &[String]) -> (Arc<MemoryConnection>, DatabaseRegistry) {
    let conn = Arc::new(MemoryConnection::with_servers(servers.to_vec()));
    conn.add_database("mydb").unwrap();
    let registry = DatabaseRegistry::new(
        Arc::clone(&conn) as Arc<dyn ServerConnection>,
        ClientOptions::default(),
    )
    .unwrap();
    (conn, registry)
}

// ============================================================================
// Property 1: Deleted handles reject everything locally
// ============================================================================

proptest! {
    #[test]
    fn prop_deleted_handle_rejects_all(
        before in prop::collection::vec(arbitrary_accessor(), 0..10),
        after in prop::collection::vec(arbitrary_accessor(), 1..20),
    ) {
        let (conn, registry) = setup(&["a:1729".to_string(), "b:1729".to_string()]);
        let db = registry.get("mydb").unwrap();

        let mut deleted = false;
        for accessor in before {
            let result = call(&db, accessor);
            if deleted {
                prop_assert!(result.unwrap_err().is_handle_invalidated());
            } else {
                prop_assert!(result.is_ok());
                deleted = matches!(accessor, Accessor::Delete);
            }
        }

        if !deleted {
            db.delete().unwrap();
        }

        let requests = conn.request_count();
        for accessor in after {
            let err = call(&db, accessor).unwrap_err();
            prop_assert!(err.is_handle_invalidated());
        }
        prop_assert_eq!(conn.request_count(), requests);
        prop_assert_eq!(db.name(), "mydb");
    }
}

// ============================================================================
// Property 2: Topology invariants under random cluster events
// ============================================================================

proptest! {
    #[test]
    fn prop_topology_invariants(
        servers in arbitrary_servers(),
        events in prop::collection::vec(arbitrary_event(), 1..40),
    ) {
        let (conn, registry) = setup(&servers);
        let db = registry.get("mydb").unwrap();

        let expected_servers: HashSet<String> = servers.iter().cloned().collect();
        let mut model_term = 1i64;
        let mut model_primary = Some(servers[0].clone());
        let mut last_primary_term = 0i64;

        for event in events {
            match event {
                ClusterEvent::Elect(i) => {
                    let server = &servers[i % servers.len()];
                    model_term = conn.elect_primary("mydb", server).unwrap();
                    model_primary = Some(server.clone());
                }
                ClusterEvent::StepDown => {
                    conn.step_down("mydb").unwrap();
                    model_primary = None;
                }
                ClusterEvent::Prefer(i) => {
                    let server = i.map(|i| servers[i % servers.len()].as_str());
                    conn.set_preferred("mydb", server).unwrap();
                }
            }

            let replicas = db.replicas().unwrap();
            let seen: HashSet<String> = replicas.iter().map(|r| r.server().to_string()).collect();
            prop_assert_eq!(&seen, &expected_servers);
            prop_assert!(replica::verify_replica_set(&replicas).is_ok());
            prop_assert!(replicas.iter().filter(|r| r.is_primary()).count() <= 1);
            prop_assert!(replicas.iter().filter(|r| r.is_preferred()).count() <= 1);

            match (db.primary_replica(), &model_primary) {
                (Ok(primary), Some(expected)) => {
                    prop_assert_eq!(primary.server(), expected.as_str());
                    prop_assert_eq!(primary.term(), model_term);
                    prop_assert!(primary.term() >= last_primary_term);
                    last_primary_term = primary.term();
                    prop_assert_eq!(
                        replica::latest_primary(&replicas).map(ReplicaInfo::server),
                        Some(expected.as_str())
                    );
                }
                (Err(e), None) => prop_assert!(e.is_no_primary_elected()),
                (result, expected) => {
                    prop_assert!(false, "primary {:?} vs model {:?}", result, expected);
                }
            }

            let preferred = db.preferred_replica();
            match replica::preferred_or_primary(&replicas) {
                Some(expected) => {
                    let preferred = preferred.unwrap();
                    prop_assert_eq!(preferred.server(), expected.server())
                }
                None => prop_assert!(preferred.unwrap_err().is_no_primary_elected()),
            }
        }
    }
}

// ============================================================================
// Property 3: Failed deletes leave the handle usable
// ============================================================================

proptest! {
    #[test]
    fn prop_failed_delete_is_harmless(failures in 1usize..5) {
        let (conn, registry) = setup(&["a:1729".to_string()]);
        let db = registry.get("mydb").unwrap();

        for _ in 0..failures {
            conn.fail_next(Status::connection_error("connection reset"));
            prop_assert!(db.delete().unwrap_err().is_connection_error());
            prop_assert!(!db.is_deleted());
            prop_assert!(db.replicas().is_ok());
        }

        db.delete().unwrap();
        prop_assert!(db.is_deleted());
        prop_assert!(!conn.contains("mydb"));
    }
}
