use std::hint::black_box;
use std::time::Duration;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use tokio::runtime::Runtime;

use testgate::client::{AdmissionClient, NamedTask};
use testgate::coordinator::start_coordinator;
use testgate::resources::ResourceSet;

/// Starts a coordinator whose queue holds `waiting` requests that cannot be admitted,
/// so every event makes the admission pass visit all of them.
fn setup(runtime: &Runtime, waiting: usize) -> (AdmissionClient, testgate::client::AdmissionGuard) {
    runtime.block_on(async {
        let (client, future) = start_coordinator(
            ResourceSet::new().with("cpu", 2).with("gpu", 1),
            Default::default(),
        );
        tokio::spawn(future);
        let holder = client
            .request_admission(&NamedTask::new("gpu-holder"), ResourceSet::new().with("gpu", 1))
            .await
            .unwrap()
            .into_guard()
            .unwrap();
        for i in 0..waiting {
            let client = client.clone();
            tokio::spawn(async move {
                let _ = client
                    .request_admission(
                        &NamedTask::new(format!("gpu-waiter-{i}")),
                        ResourceSet::new().with("gpu", 1),
                    )
                    .await;
            });
        }
        loop {
            let snapshot = client.snapshot().await.unwrap();
            if snapshot.pending.len() == waiting {
                break;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        (client, holder)
    })
}

fn bench_admit_release(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap();
    for waiting in [0, 100, 10_000] {
        let (client, holder) = setup(&runtime, waiting);
        c.bench_with_input(
            BenchmarkId::new("admit and release with blocked waiters", waiting),
            &waiting,
            |b, _| {
                b.iter(|| {
                    runtime.block_on(async {
                        let guard = client
                            .request_admission(
                                &NamedTask::new("bench"),
                                black_box(ResourceSet::new().with("cpu", 1)),
                            )
                            .await
                            .unwrap()
                            .into_guard()
                            .unwrap();
                        guard.release();
                    })
                });
            },
        );
        drop(holder);
    }
}

fn bench_parse_resources(c: &mut Criterion) {
    c.bench_function("parse resource set", |b| {
        b.iter(|| {
            black_box("cpu=16,memory=64,gpus/nvidia=4,licenses=2")
                .parse::<ResourceSet>()
                .unwrap()
        })
    });
}

criterion_group!(admission, bench_admit_release, bench_parse_resources);
criterion_main!(admission);
