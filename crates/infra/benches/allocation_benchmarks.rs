use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use chrono::Utc;
use wareflow_core::{BayId, ItemId, LocationId, TenantId};
use wareflow_infra::InMemoryWarehouseStore;
use wareflow_inventory::{BatchAllocator, BatchStore, LocationInventory, StockLedger};

/// Store with `batches` lots of 10 units each, spread over one shelf per lot.
fn seeded_store(tenant_id: TenantId, item_id: ItemId, batches: usize) -> InMemoryWarehouseStore {
    let store = InMemoryWarehouseStore::new();
    let mut tx = store.begin();
    for _ in 0..batches {
        let location_id = LocationId::new();
        tx.ensure_location(tenant_id, location_id, BayId::new(), 1_000).unwrap();
        tx.receive_at_location(tenant_id, location_id, 10).unwrap();
        tx.create_batch(tenant_id, item_id, location_id, 10, None, Utc::now())
            .unwrap();
        tx.receive_stock(tenant_id, item_id, 10).unwrap();
    }
    tx.commit().unwrap();
    store
}

fn bench_fifo_allocation(c: &mut Criterion) {
    let mut group = c.benchmark_group("fifo_allocation");
    let tenant_id = TenantId::new();

    for batches in [10usize, 100, 1_000] {
        let item_id = ItemId::new();
        let store = seeded_store(tenant_id, item_id, batches);
        // Half the lots are drained by every allocation.
        let quantity = (batches as i64 / 2) * 10;
        group.throughput(Throughput::Elements(batches as u64));
        group.bench_with_input(BenchmarkId::from_parameter(batches), &quantity, |b, &quantity| {
            b.iter(|| {
                let mut tx = store.begin();
                let consumed = tx.allocate_fifo(tenant_id, item_id, black_box(quantity)).unwrap();
                black_box(consumed.len())
            });
        });
    }
    group.finish();
}

fn bench_batch_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("batches_for_item");
    let tenant_id = TenantId::new();

    for batches in [10usize, 1_000] {
        let item_id = ItemId::new();
        let store = seeded_store(tenant_id, item_id, batches);
        group.bench_function(BenchmarkId::from_parameter(batches), |b| {
            b.iter(|| {
                let tx = store.begin();
                black_box(tx.batches_for_item(tenant_id, black_box(item_id)).unwrap().len())
            });
        });
    }
    group.finish();
}

fn bench_commit(c: &mut Criterion) {
    let tenant_id = TenantId::new();
    let item_id = ItemId::new();
    let store = InMemoryWarehouseStore::new();

    c.bench_function("receive_and_commit", |b| {
        b.iter(|| {
            let mut tx = store.begin();
            tx.receive_stock(tenant_id, item_id, black_box(1)).unwrap();
            black_box(tx.commit().unwrap().rows_written)
        });
    });
}

criterion_group!(benches, bench_fifo_allocation, bench_batch_scan, bench_commit);
criterion_main!(benches);
