use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use std::sync::Arc;
use tokio::runtime::Runtime;

use stockyard_audit::TracingAuditRecorder;
use stockyard_core::{LocationId, ProductId, SupplierId, UserId};
use stockyard_infra::balance_store::{BalanceStore, InMemoryBalanceStore};
use stockyard_infra::lock_map::LockMap;
use stockyard_infra::movement_store::InMemoryMovementStore;
use stockyard_infra::services::{Actor, MovementService, ReceiptDraft};
use stockyard_ledger::{BalanceKey, BalanceOperation, MovementStatus, NewMovementLine};

fn bench_apply_latency(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("balance_apply_latency");
    group.sample_size(1000);

    // Benchmark: first credit against a pair with no balance row
    group.bench_function("credit_fresh_pair", |b| {
        let store = InMemoryBalanceStore::new();
        b.iter(|| {
            let key = BalanceKey::new(ProductId::new(), LocationId::new());
            rt.block_on(store.credit(black_box(key), black_box(5))).unwrap();
        });
    });

    // Benchmark: repeated debits against one hot pair
    group.bench_function("debit_hot_pair", |b| {
        let store = InMemoryBalanceStore::new();
        let key = BalanceKey::new(ProductId::new(), LocationId::new());
        rt.block_on(store.set(key, i64::MAX / 2)).unwrap();
        b.iter(|| {
            rt.block_on(store.debit(black_box(key), black_box(1))).unwrap();
        });
    });

    group.finish();
}

fn bench_apply_throughput(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("balance_apply_throughput");

    for batch_size in [1usize, 10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*batch_size as u64));
        group.bench_with_input(
            BenchmarkId::new("credit_batch", batch_size),
            batch_size,
            |b, &size| {
                let store = InMemoryBalanceStore::new();
                let operations: Vec<BalanceOperation> = (0..size)
                    .map(|_| BalanceOperation::Credit {
                        key: BalanceKey::new(ProductId::new(), LocationId::new()),
                        amount: 1,
                    })
                    .collect();
                b.iter(|| {
                    rt.block_on(store.apply(black_box(&operations))).unwrap();
                });
            },
        );
    }

    group.finish();
}

fn bench_movement_completion(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("movement_completion");

    // Benchmark: the full workflow (validate, persist, three transitions, apply)
    group.bench_function("receipt_create_to_done", |b| {
        let service = MovementService::new(
            Arc::new(InMemoryBalanceStore::new()),
            Arc::new(InMemoryMovementStore::new()),
            Arc::new(LockMap::default()),
            Arc::new(TracingAuditRecorder::new()),
        );
        let actor = Actor::new(UserId::new());
        b.iter(|| {
            rt.block_on(async {
                let movement = service
                    .create_receipt(
                        &actor,
                        ReceiptDraft {
                            to_location_id: Some(LocationId::new()),
                            supplier_id: Some(SupplierId::new()),
                            notes: None,
                            lines: vec![NewMovementLine {
                                product_id: ProductId::new(),
                                quantity: black_box(5),
                                batch_id: None,
                            }],
                        },
                    )
                    .unwrap();
                service
                    .transition(&actor, movement.id, MovementStatus::Waiting)
                    .await
                    .unwrap();
                service
                    .transition(&actor, movement.id, MovementStatus::Ready)
                    .await
                    .unwrap();
                service.complete(&actor, movement.id).await.unwrap();
            });
        });
    });

    // Benchmark: the bare credit the workflow boils down to
    group.bench_function("direct_credit_baseline", |b| {
        let store = InMemoryBalanceStore::new();
        b.iter(|| {
            let key = BalanceKey::new(ProductId::new(), LocationId::new());
            rt.block_on(store.credit(key, black_box(5))).unwrap();
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_apply_latency,
    bench_apply_throughput,
    bench_movement_completion
);
criterion_main!(benches);
