//! SPSC ring throughput and latency benchmark.
//!
//! Usage:
//!     cargo run --release --bin spsc_bench
//!
//! Environment variables:
//!     PRODUCER_CPU=0  Pin producer to CPU 0 (default: 0)
//!     CONSUMER_CPU=2  Pin consumer to CPU 2 (default: 2)
//!     RUST_LOG        Log filter, with `--features tracing`

use std::env;
use std::hint;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use minstant::Instant;
use spsc_ring::{Boxed, Consumer, Producer, try_channel};

const QUEUE_SIZE: usize = 1 << 16;
const ITERATIONS: usize = 1 << 24;

type Payload = i32;
type Slots = Boxed<Payload, QUEUE_SIZE>;
type Tx = Producer<'static, Payload, QUEUE_SIZE, Slots>;
type Rx = Consumer<'static, Payload, QUEUE_SIZE, Slots>;

fn get_cpu_affinity() -> (Option<usize>, Option<usize>) {
    let producer_cpu = env::var("PRODUCER_CPU")
        .ok()
        .and_then(|s| s.parse().ok())
        .or(Some(0));
    let consumer_cpu = env::var("CONSUMER_CPU")
        .ok()
        .and_then(|s| s.parse().ok())
        .or(Some(2));
    (producer_cpu, consumer_cpu)
}

fn pin_to_cpu(cpu: Option<usize>) {
    if let Some(id) = cpu
        && !core_affinity::set_for_current(core_affinity::CoreId { id })
    {
        eprintln!("could not pin thread to CPU {id}; running unpinned");
    }
}

fn queue() -> (Tx, Rx) {
    try_channel::<Payload, QUEUE_SIZE, Slots>().expect("failed to allocate queue")
}

fn wait_ready(ready: &AtomicBool) {
    while !ready.load(Ordering::Acquire) {
        hint::spin_loop();
    }
}

fn bench_throughput(producer_cpu: Option<usize>, consumer_cpu: Option<usize>) {
    let (mut tx, mut rx) = queue();

    let ready = Arc::new(AtomicBool::new(false));
    let ready_clone = ready.clone();

    let consumer_thread = std::thread::spawn(move || {
        pin_to_cpu(consumer_cpu);
        ready_clone.store(true, Ordering::Release);

        for expected in 0..ITERATIONS as Payload {
            let value = rx.force_pop();
            if value != expected {
                panic!("Data corruption: expected {expected}, got {value}");
            }
        }
    });

    wait_ready(&ready);
    pin_to_cpu(producer_cpu);

    let start = Instant::now();

    for i in 0..ITERATIONS as Payload {
        tx.force_push(i);
    }

    consumer_thread.join().unwrap();
    let elapsed = start.elapsed();

    let ops_per_ms = ITERATIONS as u128 * 1_000_000 / elapsed.as_nanos();
    println!("{ops_per_ms} ops/ms");
}

fn bench_rtt(producer_cpu: Option<usize>, consumer_cpu: Option<usize>) {
    let (mut ping_tx, mut ping_rx) = queue();
    let (mut pong_tx, mut pong_rx) = queue();

    let ready = Arc::new(AtomicBool::new(false));
    let ready_clone = ready.clone();

    let responder = std::thread::spawn(move || {
        pin_to_cpu(consumer_cpu);
        ready_clone.store(true, Ordering::Release);

        for _ in 0..ITERATIONS {
            let value = ping_rx.force_pop();
            pong_tx.force_push(value);
        }
    });

    wait_ready(&ready);
    pin_to_cpu(producer_cpu);

    let start = Instant::now();

    for i in 0..ITERATIONS as Payload {
        ping_tx.force_push(i);
        pong_rx.force_discard();
    }

    let elapsed = start.elapsed();
    responder.join().unwrap();

    let rtt_ns = elapsed.as_nanos() / ITERATIONS as u128;
    println!("{rtt_ns} ns RTT");
}

fn main() {
    spsc_ring::init_tracing();
    let (producer_cpu, consumer_cpu) = get_cpu_affinity();

    println!("spsc-ring (size={QUEUE_SIZE}, iters={ITERATIONS}):");
    bench_throughput(producer_cpu, consumer_cpu);
    bench_rtt(producer_cpu, consumer_cpu);
}
