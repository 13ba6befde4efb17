//! The same fill-then-drain exercise over the PIPE transport. `capacity`
//! is accepted but ignored in this mode.

use slotq::Queue;

fn main() {
    let queue: Queue<String> = Queue::builder().pipe().build().expect("open pipe");

    for word in ["alpha", "beta", "gamma"] {
        queue.push(word.to_string(), None).expect("pipe has room");
    }

    let mut drained = Vec::new();
    queue.flush(|payload| drained.push(payload)).expect("flush succeeds");
    println!("drained: {drained:?}");

    queue.destroy().expect("destroy is infallible once called");
}
