//! Fill-then-drain over the MUTEX transport from a single thread.

use std::time::{Duration, Instant};

use slotq::Queue;

fn main() {
    let queue: Queue<u32> = Queue::builder().capacity(4).mutex().build().expect("build queue");

    for payload in [0x1, 0x2, 0x3, 0x4] {
        queue.push(payload, None).expect("room for four");
    }
    match queue.push(0x5, None) {
        Err(e) => println!("fifth push rejected as expected: {e}"),
        Ok(()) => unreachable!("ring should be full"),
    }

    while let Ok(payload) = queue.shift(Some(Instant::now() + Duration::from_millis(10))) {
        println!("shifted {payload:#x}");
    }

    println!("{}", queue.metrics());
}
