//! Per-tick cost of the two averaging strategies

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use meanblock::nodes::SineGenerator;
use meanblock::{process_blocks, AveragingStrategy, Engine, EngineConfig, Processor};

const BLOCK_SIZE: usize = 64;

fn bench_strategies(c: &mut Criterion) {
    // one second of tone at 48 kHz
    let mut tone = SineGenerator::new(440.0, 48_000).with_amplitude(0.5);
    let mut input = vec![0.0f32; 48_000];
    tone.process(&[], &mut input);
    let mut output = vec![0.0f32; input.len()];

    let mut group = c.benchmark_group("one_second_of_ticks");
    for window in [4usize, 32, 256] {
        for strategy in [AveragingStrategy::Incremental, AveragingStrategy::Resum] {
            let mut engine = Engine::new(EngineConfig { window_size: window, strategy });
            engine.set_block_size(BLOCK_SIZE).unwrap();
            group.bench_with_input(BenchmarkId::new(strategy.to_string(), window), &window, |b, _| {
                b.iter(|| process_blocks(&mut engine, BLOCK_SIZE, black_box(&input), &mut output));
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_strategies);
criterion_main!(benches);
