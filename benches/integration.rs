use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::{Quat, Vec3};
use light_field::camera::{CameraModel, Intrinsics, Pose};
use light_field::compositor::{ProjectedImage, ProjectionOptions, ProjectiveCompositor};
use light_field::core::SoftwareRasterizer;
use light_field::integrator::Integrator;
use light_field::proxy::ProxySurface;
use light_field::shot::{Shot, ShotImage};
use light_field::traits::TextureFilter;

const RESOLUTION: u32 = 256;

fn shots(count: usize) -> Vec<Shot> {
    (0..count)
        .map(|i| {
            let x = (i as f32 - count as f32 / 2.0) * 0.5;
            let shade = (i * 37 % 256) as u8;
            Shot::from_image(
                ShotImage::filled(64, 64, [shade, 255 - shade, 128, 255]).unwrap(),
                format!("shot_{i}"),
                Pose::new(Vec3::new(x, 0.0, 0.0), Quat::IDENTITY).unwrap(),
                Intrinsics::with_fov(60.0, 1.0).unwrap(),
            )
        })
        .collect()
}

fn compositor(filter: TextureFilter) -> ProjectiveCompositor<SoftwareRasterizer> {
    let rasterizer = SoftwareRasterizer::new(RESOLUTION, RESOLUTION, filter).unwrap();
    ProjectiveCompositor::new(rasterizer, ProxySurface::default())
}

fn virtual_camera() -> CameraModel {
    CameraModel::new(Pose::IDENTITY, Intrinsics::with_fov(60.0, 1.0).unwrap())
}

fn bench_project_shot(c: &mut Criterion) {
    let mut group = c.benchmark_group("project_shot");
    let shot = &shots(1)[0];
    let camera = virtual_camera();

    for filter in [TextureFilter::Nearest, TextureFilter::Linear] {
        let mut compositor = compositor(filter);
        group.bench_function(format!("{filter:?}"), |b| {
            b.iter(|| {
                black_box(
                    compositor
                        .project_shot(&camera, shot, &ProjectionOptions::raw())
                        .unwrap(),
                )
            })
        });
    }
    group.finish();
}

fn bench_accumulate(c: &mut Criterion) {
    let mut group = c.benchmark_group("accumulate");
    let camera = virtual_camera();
    let mut compositor = compositor(TextureFilter::Nearest);

    for count in [4, 16, 64].iter() {
        let projections: Vec<ProjectedImage> = compositor
            .project_multiple_shots(&camera, &shots(*count), &ProjectionOptions::raw())
            .unwrap();

        group.bench_with_input(BenchmarkId::new("shots", count), count, |b, _| {
            b.iter(|| black_box(Integrator::default().accumulate(&projections).unwrap()))
        });
    }
    group.finish();
}

fn bench_integrate(c: &mut Criterion) {
    let mut group = c.benchmark_group("integrate");
    group.sample_size(20);
    let camera = virtual_camera();

    for count in [4, 16].iter() {
        let shots = shots(*count);
        let mut compositor = compositor(TextureFilter::Linear);
        group.bench_with_input(BenchmarkId::new("shots", count), count, |b, _| {
            b.iter(|| {
                black_box(
                    Integrator::default()
                        .integrate(&mut compositor, &camera, &shots, None, None)
                        .unwrap(),
                )
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_project_shot, bench_accumulate, bench_integrate);

criterion_main!(benches);
