//! Color sampler benchmarks
//!
//! # Running Benchmarks
//! ```bash
//! cargo bench --package teamlock-media --bench sampler
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use image::{Rgb as Pixel, RgbImage};
use std::time::Duration;
use teamlock_media::clahe::Clahe;
use teamlock_media::{ColorSampler, SamplerConfig};
use teamlock_models::BoundingBox;

/// Synthetic frame with a textured jersey region.
fn create_test_frame(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Pixel([
            ((x * 7 + y * 11) % 256) as u8,
            ((x * 13 + y * 17) % 256) as u8,
            ((x * 19 + y * 23) % 256) as u8,
        ])
    })
}

fn bench_sample(c: &mut Criterion) {
    let mut group = c.benchmark_group("sample");
    group.warm_up_time(Duration::from_secs(2));
    group.measurement_time(Duration::from_secs(5));

    let frame = create_test_frame(1280, 720);
    let boxes = [(40.0, 90.0), (80.0, 180.0), (160.0, 360.0)];

    for restarts in [1u32, 10] {
        let sampler = ColorSampler::new(SamplerConfig {
            n_init: restarts,
            ..Default::default()
        });
        for (w, h) in boxes {
            let bbox = BoundingBox::new(200.0, 100.0, 200.0 + w, 100.0 + h);
            group.throughput(Throughput::Elements(1));
            group.bench_with_input(
                BenchmarkId::new(format!("n_init_{restarts}"), format!("{w}x{h}")),
                &bbox,
                |b, bbox| b.iter(|| black_box(sampler.sample(black_box(&frame), bbox))),
            );
        }
    }

    group.finish();
}

fn bench_clahe(c: &mut Criterion) {
    let mut group = c.benchmark_group("clahe");
    let clahe = Clahe::default();

    for (w, h) in [(16, 180), (32, 360)] {
        let strip = create_test_frame(w, h);
        group.bench_with_input(BenchmarkId::new("apply_rgb", format!("{w}x{h}")), &strip, |b, strip| {
            b.iter(|| black_box(clahe.apply_rgb(black_box(strip))))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_sample, bench_clahe);
criterion_main!(benches);
