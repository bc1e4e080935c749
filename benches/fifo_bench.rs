//! Performance benchmarks for ByteFifo.
//!
//! The producer side runs inside the transport's receive context, so append
//! latency bounds how quickly a chunk can be handed back to the UART.
//! At 115200 baud a link delivers roughly 11.5 KB/s; these benchmarks
//! check that the FIFO stays orders of magnitude above that.
//!
//! Run benchmarks with:
//! ```sh
//! cargo bench --bench fifo_bench
//! ```

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use uartlink_echo::ByteFifo;

/// Typical receive chunk sizes, from single bytes to a full DMA buffer.
const CHUNK_SIZES: [usize; 4] = [1, 32, 256, 4096];

/// Benchmark append followed by take of the same chunk.
fn bench_append_take(c: &mut Criterion) {
    let mut group = c.benchmark_group("append_take");

    for size in CHUNK_SIZES {
        let chunk = vec![0x5Au8; size];
        let fifo = ByteFifo::with_capacity(4096).unwrap();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &chunk, |b, chunk| {
            b.iter(|| {
                fifo.append(black_box(chunk));
                black_box(fifo.take(chunk.len()));
            });
        });
    }

    group.finish();
}

/// Benchmark appends into a full FIFO, where every byte is dropped.
fn bench_append_overflow(c: &mut Criterion) {
    let mut group = c.benchmark_group("append_overflow");
    group.throughput(Throughput::Bytes(256));

    let fifo = ByteFifo::with_capacity(4096).unwrap();
    fifo.append(&[0u8; 4096]);
    let chunk = [0xFFu8; 256];

    group.bench_function("full_fifo_256", |b| {
        b.iter(|| black_box(fifo.append(black_box(&chunk))));
    });

    group.finish();
}

/// Benchmark the inspector's non-destructive preview.
fn bench_preview(c: &mut Criterion) {
    let mut group = c.benchmark_group("preview");
    group.throughput(Throughput::Elements(1));

    let fifo = ByteFifo::with_capacity(4096).unwrap();
    // Force the stored region to wrap around the end of the ring
    fifo.append(&[0u8; 4000]);
    fifo.take(3990);
    fifo.append(&[1u8; 2000]);

    group.bench_function("preview_32_wrapped", |b| {
        b.iter(|| black_box(fifo.preview(black_box(32))));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_append_take,
    bench_append_overflow,
    bench_preview
);
criterion_main!(benches);
