use callrouter::{DispatchRouter, LocalRunner};
use criterion::{criterion_group, criterion_main, Criterion};
use serde_json::{json, Value};
use std::hint::black_box;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn bench_router() -> (LocalRunner, Arc<AtomicUsize>, DispatchRouter) {
    let home = LocalRunner::new("bench-home");
    let bytes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&bytes);
    let mut router = DispatchRouter::new(
        Arc::new(move |msg: &str| {
            counter.fetch_add(msg.len(), Ordering::Relaxed);
        }),
        home.handle(),
    );
    router.register("add", |call| {
        let sum: i64 = call.arguments().iter().filter_map(Value::as_i64).sum();
        call.post_result(vec![json!(sum)]);
    });
    (home, bytes, router)
}

fn bench_sync_dispatch(c: &mut Criterion) {
    let (home, bytes, router) = bench_router();
    c.bench_function("handle_message_sync_reply", |b| {
        b.iter(|| {
            home.enter(|| {
                black_box(router.handle_message(json!(["add", "cb-42", 3, 4])));
            })
        })
    });
    black_box(bytes.load(Ordering::Relaxed));
}

fn bench_raw_dispatch(c: &mut Criterion) {
    let (home, bytes, router) = bench_router();
    c.bench_function("handle_raw_message_sync_reply", |b| {
        b.iter(|| {
            home.enter(|| {
                black_box(router.handle_raw_message(r#"["add","cb-42",3,4,5,6,7,8]"#));
            })
        })
    });
    black_box(bytes.load(Ordering::Relaxed));
}

fn bench_redirected_reply(c: &mut Criterion) {
    let (home, bytes, router) = bench_router();
    c.bench_function("handle_message_redirected_reply", |b| {
        b.iter(|| {
            // Outside the home runner the reply takes one hop through its queue.
            black_box(router.handle_message(json!(["add", "cb-42", 3, 4])));
            home.run_until_idle();
        })
    });
    black_box(bytes.load(Ordering::Relaxed));
}

criterion_group!(
    benches,
    bench_sync_dispatch,
    bench_raw_dispatch,
    bench_redirected_reply
);
criterion_main!(benches);
