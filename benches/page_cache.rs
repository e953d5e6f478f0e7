//! Page cache benchmarks.
//!
//! - insert with eviction on a full cache
//! - lookups over a hot working set
//! - a mixed scan that keeps replacing the cold part of the cache

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pagepool::{CacheKey, Page, PageCache, PageSize, PageType, ResourceId};

const RESOURCE: ResourceId = ResourceId(1);

fn page(number: u32) -> Arc<Page> {
    Arc::new(Page::new(number, PageType::Table, vec![0u8; 64].into_boxed_slice()))
}

fn filled(capacity: usize) -> PageCache {
    let mut cache = PageCache::new(PageSize::Size4K, capacity);
    for number in 0..capacity as u32 {
        cache.insert(page(number), RESOURCE, false).unwrap();
    }
    cache
}

fn bench_insert_with_eviction(c: &mut Criterion) {
    let mut group = c.benchmark_group("page_cache_insert");
    for capacity in [64usize, 1024, 8192] {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &capacity, |b, &capacity| {
            let mut cache = filled(capacity);
            let mut next = capacity as u32;
            b.iter(|| {
                let evicted = cache.insert(page(next), RESOURCE, false).unwrap();
                next = next.wrapping_add(1);
                black_box(evicted);
            });
        });
    }
    group.finish();
}

fn bench_hot_lookups(c: &mut Criterion) {
    let mut group = c.benchmark_group("page_cache_lookup");
    for capacity in [64usize, 1024, 8192] {
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &capacity, |b, &capacity| {
            let mut cache = filled(capacity);
            let hot = (capacity / 8).max(1) as u32;
            let mut i = 0u32;
            b.iter(|| {
                let key = CacheKey::new(RESOURCE, i % hot);
                black_box(cache.lookup(key, false));
                i = i.wrapping_add(1);
            });
        });
    }
    group.finish();
}

fn bench_scan_with_hot_set(c: &mut Criterion) {
    let capacity = 1024usize;
    c.bench_function("page_cache_scan_with_hot_set", |b| {
        let mut cache = filled(capacity);
        let mut scan = capacity as u32;
        b.iter(|| {
            // One scan page per eight hot lookups
            for hot in 0..8u32 {
                black_box(cache.lookup(CacheKey::new(RESOURCE, hot), false));
            }
            if cache.lookup(CacheKey::new(RESOURCE, scan), false).is_none() {
                let _ = cache.insert(page(scan), RESOURCE, false);
            }
            scan = scan.wrapping_add(1);
        });
    });
}

criterion_group!(
    benches,
    bench_insert_with_eviction,
    bench_hot_lookups,
    bench_scan_with_hot_set
);
criterion_main!(benches);
