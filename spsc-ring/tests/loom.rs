//! Model-checked interleavings of the push/pop protocol.
//!
//! ```bash
//! RUSTFLAGS="--cfg loom" cargo test --release --test loom
//! ```

#![cfg(loom)]

use loom::thread;
use spsc_ring::channel;

#[test]
fn loom_spsc_fifo() {
    loom::model(|| {
        let (mut tx, mut rx) = channel::<u32, 4>();

        let producer = thread::spawn(move || {
            for i in 0..2 {
                while tx.try_push(i).is_err() {
                    thread::yield_now();
                }
            }
        });

        let mut received = Vec::new();
        while received.len() < 2 {
            match rx.try_pop() {
                Some(val) => received.push(val),
                None => thread::yield_now(),
            }
        }

        producer.join().unwrap();
        assert_eq!(received, [0, 1]);
        assert!(rx.try_pop().is_none());
    });
}

#[test]
fn loom_spsc_full_retry() {
    // One usable slot forces the producer through the full path on every
    // second push.
    loom::model(|| {
        let (mut tx, mut rx) = channel::<u32, 2>();

        let producer = thread::spawn(move || {
            for i in 0..3 {
                while tx.try_push(i).is_err() {
                    thread::yield_now();
                }
            }
        });

        let consumer = thread::spawn(move || {
            let mut received = Vec::new();
            while received.len() < 3 {
                match rx.try_pop() {
                    Some(val) => received.push(val),
                    None => thread::yield_now(),
                }
            }
            received
        });

        producer.join().unwrap();
        assert_eq!(consumer.join().unwrap(), [0, 1, 2]);
    });
}

#[test]
fn loom_front_sees_published_value() {
    loom::model(|| {
        let (mut tx, mut rx) = channel::<String, 2>();

        let producer = thread::spawn(move || {
            tx.try_push("ready".to_string()).unwrap();
        });

        loop {
            if let Some(front) = rx.front() {
                assert_eq!(front, "ready");
                break;
            }
            thread::yield_now();
        }
        assert_eq!(rx.try_pop().as_deref(), Some("ready"));

        producer.join().unwrap();
    });
}

#[test]
fn loom_drop_with_elements_in_flight() {
    loom::model(|| {
        let (mut tx, mut rx) = channel::<Box<u32>, 4>();

        let producer = thread::spawn(move || {
            let _ = tx.try_push(Box::new(1));
            let _ = tx.try_push(Box::new(2));
        });

        // Whatever the consumer misses is dropped with the queue.
        let _ = rx.try_pop();

        producer.join().unwrap();
        drop(rx);
    });
}
