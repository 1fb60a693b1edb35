//! Message construction benchmarks
//!
//! Measures header lookup, request decomposition, and copy-on-write change.

use conduit_core::{Changes, Headers, Request};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn bench_header_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("header_lookup");

    for count in [1usize, 5, 20] {
        let headers: Headers = (0..count)
            .map(|i| (format!("X-Header-{i}"), format!("value-{i}")))
            .collect();
        let last = format!("x-HEADER-{}", count - 1);

        group.bench_with_input(BenchmarkId::new("get", count), &headers, |b, headers| {
            b.iter(|| headers.get(black_box(&last)))
        });
    }

    group.finish();
}

fn bench_request_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_construction");

    group.bench_function("bare", |b| {
        b.iter(|| Request::new("GET", black_box("http://localhost/static/dir/file.html")))
    });

    group.bench_function("with_handler_path", |b| {
        b.iter(|| {
            Request::builder("GET", black_box("http://localhost/static/dir/file.html?v=1"))
                .handler_path("/static/")
                .header("Accept", "text/html")
                .body("payload")
                .build()
        })
    });

    group.finish();
}

fn bench_change(c: &mut Criterion) {
    let mut group = c.benchmark_group("change");

    let request = Request::builder("GET", "http://localhost/static/dir/file.html")
        .header("Accept", "text/html")
        .build()
        .expect("request");

    group.bench_function("add_header", |b| {
        b.iter(|| request.change(black_box(Changes::new().header("X-Trace", "abc"))))
    });

    group.bench_function("advance_path", |b| {
        b.iter(|| request.change(black_box(Changes::new().path("static"))))
    });

    group.finish();
}

criterion_group!(benches, bench_header_lookup, bench_request_construction, bench_change);
criterion_main!(benches);
