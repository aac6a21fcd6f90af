use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dotty_blob::BlobParams;
use dotty_core::{BrownConrady, CameraIntrinsics};
use dotty_grid::{
    render_distorted, render_reference, CameraModel, DottyGridDetector, DottyGridParams,
    GridLayout,
};

fn bench_detect(c: &mut Criterion) {
    let layout = GridLayout {
        rows: 14,
        cols: 18,
        fiducial_cells: [[4, 3], [13, 3], [4, 10], [13, 10]],
        ..GridLayout::default()
    };
    let grid = layout.build().expect("layout");
    let size = grid.reference_size;
    let camera = CameraModel::new(
        CameraIntrinsics {
            fx: 700.0,
            fy: 700.0,
            cx: size.width as f64 / 2.0,
            cy: size.height as f64 / 2.0,
        },
        BrownConrady::from_opencv([-0.08, 0.01, 0.0, 0.0, 0.0]),
    );
    let reference = render_reference(&grid.model, &grid.fiducial_indexes, size, 6.0, 11.0);
    let raw = render_distorted(&reference.view(), &camera);

    let params = DottyGridParams {
        blob: BlobParams {
            threshold_window: 51,
            min_area: 20.0,
            max_area: 5_000.0,
            ..BlobParams::default()
        },
        ..DottyGridParams::for_reference(size)
    };
    let detector = DottyGridDetector::new(grid.model, &grid.fiducial_indexes, camera, params)
        .expect("detector");

    let mut group = c.benchmark_group("dotty_grid");
    group.sample_size(20);
    group.bench_function("detect_distorted", |b| {
        b.iter(|| detector.detect(black_box(&raw.view()), true))
    });
    group.bench_function("detect_undistorted", |b| {
        b.iter(|| detector.detect(black_box(&reference.view()), false))
    });
    group.finish();
}

criterion_group!(benches, bench_detect);
criterion_main!(benches);
