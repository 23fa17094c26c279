//! Benchmarks for the sliding-window rate limiter
//!
//! Target: amortized O(1) per admitted request

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use resource_core::core::{ManualClock, WindowRateLimiter};
use std::time::Duration;

fn bench_allow_steady_state(c: &mut Criterion) {
    let clock = ManualClock::new(0);
    let limiter = WindowRateLimiter::with_clock(Duration::from_millis(1000), 100, clock.clone());

    c.bench_function("rate_limit_allow_single_identity", |b| {
        b.iter(|| {
            // 1 request per ms keeps the window full and trimming
            clock.advance(Duration::from_millis(1));
            black_box(limiter.allow("10.0.0.1"))
        })
    });
}

fn bench_allow_many_identities(c: &mut Criterion) {
    let clock = ManualClock::new(0);
    let limiter = WindowRateLimiter::with_clock(Duration::from_millis(1000), 10, clock.clone());
    let identities: Vec<String> = (0..1024).map(|i| format!("10.0.{}.{}", i / 256, i % 256)).collect();
    let mut i = 0usize;

    c.bench_function("rate_limit_allow_1024_identities", |b| {
        b.iter(|| {
            i = (i + 1) % identities.len();
            black_box(limiter.allow(&identities[i]))
        })
    });
}

criterion_group!(benches, bench_allow_steady_state, bench_allow_many_identities);
criterion_main!(benches);
