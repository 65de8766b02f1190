//! # Zigbee Gateway Benchmarks
//!
//! Hot paths of the gateway core:
//!
//! | Area | Operation | Expected cost |
//! |------|-----------|---------------|
//! | Event bus | publish + dispatch | O(subscribers) per envelope |
//! | Scheduler | one pass | O(fibres) |
//! | Address cache | upsert / lookup | O(devices) |
//! | Pending table | allocate + complete by TSN | O(1) |
//! | Persistence | buffered put + flush | O(buffer) |

#![allow(clippy::unwrap_used)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gw_01_fibre_scheduler::{FibreBackend, Scheduler, SchedulerConfig};
use gw_02_zigbee_adapter::{AddressCache, PendingTable};
use gw_04_persistence::{BufferedStore, MemoryBackend};
use shared_bus::{Envelope, EventBus, EventFilter, EventHandler, EventPublisher, EventType};
use shared_types::limits::MAX_DEVICES;
use shared_types::{Clock, CorrelationId, Eui64, ManualClock, NetAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// ============================================================================
// Event bus
// ============================================================================

fn bench_bus_publish_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("shared-bus");

    for subscribers in [1usize, 8, 32] {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(0));
        let bus = EventBus::new(clock);
        let counter = Arc::new(AtomicU64::new(0));
        for i in 0..subscribers {
            let seen = Arc::clone(&counter);
            let handler: Arc<dyn EventHandler> = Arc::new(move |_: &Envelope| {
                seen.fetch_add(1, Ordering::Relaxed);
            });
            // Half the table listens to Zigbee traffic only.
            let filter = if i % 2 == 0 {
                EventFilter::ALL
            } else {
                EventFilter::ZIGBEE
            };
            bus.subscribe(filter, handler).unwrap();
        }

        group.throughput(Throughput::Elements(64));
        group.bench_with_input(
            BenchmarkId::new("publish_dispatch_64", subscribers),
            &bus,
            |b, bus| {
                b.iter(|| {
                    for i in 0..64u8 {
                        let kind = if i % 4 == 0 {
                            EventType::BOOT
                        } else {
                            EventType::ATTRIBUTE_REPORT
                        };
                        bus.emit(kind, &[i; 8]).unwrap();
                    }
                    black_box(bus.dispatch(0))
                })
            },
        );
    }

    group.finish();
}

// ============================================================================
// Fibre scheduler
// ============================================================================

fn bench_scheduler_passes(c: &mut Criterion) {
    let mut group = c.benchmark_group("gw-01-scheduler");

    for fibres in [1usize, 7, 15] {
        let scheduler =
            Scheduler::new(SchedulerConfig::for_testing(FibreBackend::Polled)).unwrap();
        for i in 0..fibres {
            scheduler
                .create(&format!("worker-{i}"), 0, |ctx| async move {
                    loop {
                        ctx.yield_now().await;
                    }
                })
                .unwrap();
        }

        group.throughput(Throughput::Elements(100));
        group.bench_with_input(BenchmarkId::new("run_100_passes", fibres), &scheduler, |b, s| {
            b.iter(|| s.run_passes(black_box(100)))
        });
    }

    group.finish();
}

// ============================================================================
// Zigbee adapter tables
// ============================================================================

fn bench_address_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("gw-02-address-cache");

    let mut cache: AddressCache = AddressCache::new();
    for i in 1..=MAX_DEVICES as u64 {
        cache.insert(Eui64(i), NetAddr(i as u16)).unwrap();
    }
    let last = Eui64(MAX_DEVICES as u64);

    group.bench_function("lookup_last_of_full", |b| {
        b.iter(|| black_box(cache.find_by_identity(black_box(last))))
    });
    group.bench_function("lookup_by_net_addr", |b| {
        b.iter(|| black_box(cache.find_by_net_addr(black_box(NetAddr(MAX_DEVICES as u16)))))
    });
    group.bench_function("readdress_existing", |b| {
        let mut addr = 0u16;
        b.iter(|| {
            addr = addr.wrapping_add(1);
            black_box(cache.insert(last, NetAddr(addr)).unwrap())
        })
    });

    group.finish();
}

fn bench_pending_table(c: &mut Criterion) {
    let mut group = c.benchmark_group("gw-02-pending-table");

    group.bench_function("allocate_attach_complete", |b| {
        let mut table: PendingTable = PendingTable::new();
        let mut tsn = 0u8;
        b.iter(|| {
            tsn = tsn.wrapping_add(1);
            let slot = table.allocate(CorrelationId(u32::from(tsn) + 1), 0x0006, 1, 0).unwrap();
            table.attach(slot, tsn);
            black_box(table.complete(tsn))
        })
    });

    group.bench_function("purge_full_table", |b| {
        b.iter_batched(
            || {
                let mut table: PendingTable = PendingTable::new();
                for i in 0..16u8 {
                    let slot = table
                        .allocate(CorrelationId(u32::from(i) + 1), 0x0006, 1, 0)
                        .unwrap();
                    table.attach(slot, i);
                }
                table
            },
            |mut table| black_box(table.purge_expired(20_000, 10_000)),
            criterion::BatchSize::SmallInput,
        )
    });

    group.finish();
}

// ============================================================================
// Persistence
// ============================================================================

fn bench_buffered_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("gw-04-persistence");
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(0));
    let store = BufferedStore::open(MemoryBackend::new(), clock).unwrap();
    let keys: Vec<String> = (0..16).map(|i| format!("node/{i:016X}")).collect();
    let value = [0xA5u8; 128];

    group.throughput(Throughput::Elements(keys.len() as u64));
    group.bench_function("put_16_then_flush", |b| {
        b.iter(|| {
            for key in &keys {
                store.put(key, &value).unwrap();
            }
            black_box(store.flush().unwrap())
        })
    });
    group.bench_function("get_buffered_or_flushed", |b| {
        b.iter(|| black_box(store.get(&keys[7]).unwrap()))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_bus_publish_dispatch,
    bench_scheduler_passes,
    bench_address_cache,
    bench_pending_table,
    bench_buffered_store,
);
criterion_main!(benches);
