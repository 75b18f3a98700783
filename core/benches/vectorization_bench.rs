//! Basic benchmarks for rastervec-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use image::{ImageBuffer, Rgba};
use rastervec_core::{vectorize_with_preset, Preset};

fn create_checkerboard_image(size: u32) -> ImageBuffer<Rgba<u8>, Vec<u8>> {
    ImageBuffer::from_fn(size, size, |x, y| {
        let cell_size = (size / 8).max(1);
        let cell_x = x / cell_size;
        let cell_y = y / cell_size;
        if (cell_x + cell_y) % 2 == 0 {
            Rgba([255, 255, 255, 255])
        } else {
            Rgba([0, 0, 0, 255])
        }
    })
}

fn create_gradient_image(size: u32) -> ImageBuffer<Rgba<u8>, Vec<u8>> {
    ImageBuffer::from_fn(size, size, |x, _y| {
        let v = ((x as f64 / size as f64) * 255.0) as u8;
        Rgba([v, v, v, 255])
    })
}

fn benchmark_vectorize(c: &mut Criterion) {
    let sizes = vec![64, 128, 256];

    let mut group = c.benchmark_group("vectorize");

    for size in sizes {
        let pixels = (size * size) as u64;
        group.throughput(Throughput::Elements(pixels));

        let checkerboard = create_checkerboard_image(size);
        let gradient = create_gradient_image(size);

        group.bench_with_input(BenchmarkId::new("lineart_checkerboard", size), &size, |b, _| {
            b.iter(|| {
                black_box(vectorize_with_preset(&checkerboard, Preset::Lineart).unwrap());
            });
        });

        group.bench_with_input(BenchmarkId::new("photo_gradient", size), &size, |b, _| {
            b.iter(|| {
                black_box(vectorize_with_preset(&gradient, Preset::Photo).unwrap());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_vectorize);
criterion_main!(benches);
