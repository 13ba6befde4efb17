//! PIPE transport throughput.
//!
//! Run: cargo bench --bench bench_pipe

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::hint::black_box;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use slotq::Queue;

const EVENTS: u64 = 50_000;

fn spsc_round_trip(events: u64) -> u64 {
    let queue: Arc<Queue<u64>> = Arc::new(Queue::builder().pipe().build().unwrap());

    let consumer_queue = Arc::clone(&queue);
    let consumer = thread::spawn(move || {
        let mut received = 0u64;
        while received < events {
            let deadline = Instant::now() + Duration::from_secs(5);
            match consumer_queue.shift(Some(deadline)) {
                Ok(payload) => {
                    black_box(payload);
                    received += 1;
                }
                Err(_) => break,
            }
        }
        received
    });

    for i in 0..events {
        let deadline = Instant::now() + Duration::from_secs(5);
        queue.push(i, Some(deadline)).expect("producer never times out in bench");
    }

    consumer.join().unwrap()
}

fn bench_spsc(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipe_spsc");
    group.throughput(Throughput::Elements(EVENTS));
    group.bench_function("round_trip", |b| {
        b.iter(|| spsc_round_trip(EVENTS));
    });
    group.finish();
}

fn bench_try_mode(c: &mut Criterion) {
    c.bench_function("pipe_try_push_try_shift", |b| {
        let queue: Queue<u64> = Queue::builder().pipe().build().unwrap();
        b.iter(|| {
            for i in 0..256u64 {
                let _ = queue.push(i, None);
            }
            while queue.shift(None).is_ok() {}
        });
    });
}

criterion_group!(benches, bench_spsc, bench_try_mode);
criterion_main!(benches);
