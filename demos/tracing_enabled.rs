//! Same as `mutex_basic`, but with the `tracing` feature compiled in and a
//! subscriber installed, so push/shift spans are visible.
//!
//! Run with: `cargo run --example tracing_enabled --features tracing`

use std::time::{Duration, Instant};

use slotq::Queue;

fn main() {
    tracing_subscriber::fmt::init();

    let queue: Queue<u32> = Queue::builder().capacity(2).mutex().build().expect("build queue");
    queue.push(1, None).expect("room in a fresh ring");

    let deadline = Instant::now() + Duration::from_millis(50);
    let payload = queue.shift(Some(deadline)).expect("payload just pushed");
    println!("shifted {payload}");
}
