//! # pyrelay benchmarks
//!
//! ## Groups
//! - `frontend`: normalization and compilation
//! - `kernel`: full submit round trips through the multiplexer
//!
//! ```bash
//! cargo bench            # everything
//! cargo bench submit     # kernel round trips only
//! ```

use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use pyrelay::frontend::{compile, normalize};
use pyrelay::kernel::{Kernel, MemorySink, Multiplexer};
use pyrelay::util::config::KernelConfig;
use pyrelay::util::logger::{self, LogLevel};

fn snippet(name: &str) -> String {
    let path = format!("{}/benches/snippets/{}", env!("CARGO_MANIFEST_DIR"), name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("cannot read {}: {}", path, e))
}

fn kernel() -> (Kernel, Arc<MemorySink>) {
    // Keep per-task logging out of the measurements
    logger::init_with_level(LogLevel::Error);
    let mux = Arc::new(Multiplexer::new());
    let sink = MemorySink::new();
    mux.open_channel("bench".into(), sink.clone());
    (Kernel::with_multiplexer(KernelConfig::default(), mux), sink)
}

// ============================================================================
// Frontend
// ============================================================================

fn bench_normalize(c: &mut Criterion) {
    let padded = format!("\n\n    \n{}\n\n  \n", snippet("list_ops.py"));
    c.bench_function("normalize_padded_snippet", |b| {
        b.iter(|| normalize(black_box(&padded)))
    });
}

fn bench_compile(c: &mut Criterion) {
    let source = normalize(&snippet("fibonacci.py"));
    c.bench_function("compile_fibonacci", |b| {
        b.iter(|| compile(black_box(&source)).expect("snippet compiles"))
    });
}

// ============================================================================
// Kernel
// ============================================================================

fn bench_submit_trivial(c: &mut Criterion) {
    let (kernel, sink) = kernel();
    let ns = kernel.new_namespace();
    c.bench_function("submit_print_round_trip", |b| {
        b.iter(|| {
            let status = kernel
                .submit("print(1)", &"bench".into(), &ns)
                .expect("channel is open")
                .join();
            sink.clear();
            status
        })
    });
}

fn bench_submit_programs(c: &mut Criterion) {
    let (kernel, _) = kernel();
    for name in ["fibonacci.py", "list_ops.py"] {
        let source = snippet(name);
        c.bench_function(&format!("submit_{}", name.trim_end_matches(".py")), |b| {
            b.iter(|| {
                kernel
                    .submit(&source, &"bench".into(), &kernel.new_namespace())
                    .expect("channel is open")
                    .join()
            })
        });
    }
}

criterion_group!(
    name = frontend;
    config = Criterion::default().sample_size(50);
    targets = bench_normalize, bench_compile
);

criterion_group!(
    name = kernel_group;
    config = Criterion::default().sample_size(20);
    targets = bench_submit_trivial, bench_submit_programs
);

criterion_main!(frontend, kernel_group);
