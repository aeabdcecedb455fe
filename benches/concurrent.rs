use std::{sync::Arc, thread};

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use replitopo::{ClientOptions, DatabaseRegistry, MemoryConnection, ServerConnection};

fn setup(num_servers: usize) -> Arc<DatabaseRegistry> {
    let servers: Vec<String> = (0..num_servers).map(|i| format!("10.0.0.{i}:1729")).collect();
    let conn = Arc::new(MemoryConnection::with_servers(servers));
    conn.add_database("bench").unwrap();
    conn.define_schema("bench", "define person sub entity;", "")
        .unwrap();

    Arc::new(
        DatabaseRegistry::new(conn as Arc<dyn ServerConnection>, ClientOptions::default())
            .unwrap(),
    )
}

fn bench_concurrent_schema_reads(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_schema_reads");

    for num_threads in [1, 2, 4, 8].iter() {
        group.throughput(Throughput::Elements(*num_threads as u64 * 1000));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{num_threads}_threads")),
            num_threads,
            |b, &num_threads| {
                let registry = setup(3);
                b.iter(|| {
                    let mut handles = vec![];
                    for _ in 0..num_threads {
                        let registry = Arc::clone(&registry);
                        handles.push(thread::spawn(move || {
                            let db = registry.get("bench").unwrap();
                            for _ in 0..1000 {
                                db.schema().unwrap();
                            }
                        }));
                    }

                    for handle in handles {
                        handle.join().unwrap();
                    }
                });
            },
        );
    }

    group.finish();
}

fn bench_replica_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("replica_drain");

    for num_servers in [1, 3, 7, 64].iter() {
        group.throughput(Throughput::Elements(*num_servers as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(num_servers),
            num_servers,
            |b, &num_servers| {
                let registry = setup(num_servers);
                let db = registry.get("bench").unwrap();
                b.iter(|| db.replicas().unwrap());
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_concurrent_schema_reads, bench_replica_drain);
criterion_main!(benches);
