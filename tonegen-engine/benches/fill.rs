use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tonegen_engine::{Frame, PullDevice, ToneEngine};

fn fill_buffer(c: &mut Criterion) {
    let mut group = c.benchmark_group("fill_buffer");
    for frames in [256usize, 1024] {
        let mut engine = ToneEngine::new(PullDevice::new(48_000.0));
        engine.set_frequency(440.0);
        engine.set_volume(0.5);
        engine.activate().expect("pull device always activates");
        let mut renderer = engine.device_mut().take_renderer().expect("renderer installed");
        let mut buf = vec![Frame::SILENCE; frames];

        group.bench_with_input(BenchmarkId::new("sounding", frames), &frames, |b, _| {
            b.iter(|| {
                engine.set_tone_time(60.0);
                renderer.fill_buffer(black_box(&mut buf));
            });
        });
        group.bench_with_input(BenchmarkId::new("silent", frames), &frames, |b, _| {
            engine.reset();
            b.iter(|| renderer.fill_buffer(black_box(&mut buf)));
        });
    }
    group.finish();
}

criterion_group!(benches, fill_buffer);
criterion_main!(benches);
