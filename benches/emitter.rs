//! Emitter and pending-wait benchmarks.
//!
//! Measures the per-wait overhead of the bridge: registering a one-shot
//! listener, dispatching an event, and a full subscribe-fire-await round.
//!
//! Run with: cargo bench --bench emitter
//! Results saved to: target/criterion/

use criterion::{Criterion, criterion_group, criterion_main};
use tokio::runtime::Runtime;

use ws_bridge::{EventEmitter, EventKind, MessageEvent, SocketEvent};

// ============================================================================
// Benchmark: Subscribe + Emit
// ============================================================================

fn bench_once_then_emit(c: &mut Criterion) {
    let emitter = EventEmitter::new();

    c.bench_function("once_then_emit", |b| {
        b.iter(|| {
            let sub = emitter.once(EventKind::Message, |_| {});
            emitter.emit(SocketEvent::Message(MessageEvent::new("ping")));
            drop(sub);
        })
    });
}

// ============================================================================
// Benchmark: Full Pending-Wait Round
// ============================================================================

fn bench_pending_wait_round(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let emitter = EventEmitter::new();

    c.bench_function("pending_wait_round", |b| {
        b.to_async(&rt).iter(|| {
            let emitter = emitter.clone();
            async move {
                let (tx, rx) = tokio::sync::oneshot::channel();
                let _sub = emitter.once(EventKind::Message, move |event| {
                    let _ = tx.send(event);
                });
                emitter.emit(SocketEvent::Message(MessageEvent::new("ping")));
                let _ = rx.await;
            }
        })
    });
}

criterion_group!(benches, bench_once_then_emit, bench_pending_wait_round);
criterion_main!(benches);
