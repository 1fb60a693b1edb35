//! Middleware pipeline benchmarks
//!
//! Measures the overhead of wrapping a handler in middleware layers.

use conduit_core::{Changes, Next, Pipeline, Request, Response};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

fn pass_through(req: Request, next: Next) -> impl std::future::Future<Output = conduit_core::Result<conduit_core::Handled>> {
    async move {
        let req = req.change(Changes::new().context("seen", true))?;
        next.call(req).await
    }
}

fn bench_pipeline_depth(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let mut group = c.benchmark_group("pipeline_depth");

    for depth in [0usize, 1, 5, 10] {
        let pipeline = (0..depth).fold(Pipeline::new(), |p, _| p.add_middleware(pass_through));
        let handler = pipeline.handler(|_req: Request| async { Response::ok("ok").build() });

        group.bench_with_input(BenchmarkId::new("layers", depth), &handler, |b, handler| {
            b.to_async(&runtime).iter(|| async {
                let req = Request::new("GET", "http://localhost/").expect("request");
                handler.call(req).await
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_pipeline_depth);
criterion_main!(benches);
