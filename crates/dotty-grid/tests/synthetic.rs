use dotty_blob::BlobParams;
use dotty_core::{BrownConrady, CameraIntrinsics, GrayImage, ImageSize};
use dotty_grid::{
    render_distorted, render_reference, CameraModel, DottyGridDetector, DottyGridParams,
    GeneratedGrid, GridLayout, Homography, ModelPoint, ModelTable, PointDetector, Rejection,
};
use nalgebra::{Matrix3, Point2};

const DOT_RADIUS: f64 = 6.0;
const FIDUCIAL_RADIUS: f64 = 11.0;

fn grid() -> GeneratedGrid {
    GridLayout::default().build().expect("layout")
}

fn params(size: ImageSize) -> DottyGridParams {
    DottyGridParams {
        rms_tolerance: 30.0,
        gaussian_sigma: 1.0,
        blob: BlobParams {
            threshold_window: 51,
            threshold_offset: 20.0,
            min_area: 20.0,
            max_area: 5_000.0,
            ..BlobParams::default()
        },
        reference_image_size: Some(size),
    }
}

fn camera(k1: f64) -> CameraModel {
    CameraModel::new(
        CameraIntrinsics {
            fx: 400.0,
            fy: 400.0,
            cx: 220.0,
            cy: 180.0,
        },
        BrownConrady::from_opencv([k1, 0.0, 0.0, 0.0, 0.0]),
    )
}

fn detector_for(grid: &GeneratedGrid, model: ModelTable, camera: CameraModel) -> DottyGridDetector {
    DottyGridDetector::new(
        model,
        &grid.fiducial_indexes,
        camera,
        params(grid.reference_size),
    )
    .expect("detector")
}

fn render(grid: &GeneratedGrid, model: &ModelTable, size: ImageSize) -> GrayImage {
    render_reference(
        model,
        &grid.fiducial_indexes,
        size,
        DOT_RADIUS,
        FIDUCIAL_RADIUS,
    )
}

/// Same ids and world points, reference positions moved by `f`.
fn moved_model(model: &ModelTable, f: impl Fn(usize, Point2<f64>) -> Point2<f64>) -> ModelTable {
    let points = model
        .points()
        .iter()
        .enumerate()
        .map(|(i, p)| ModelPoint {
            reference: f(i, p.reference),
            ..*p
        })
        .collect();
    ModelTable::new(points).expect("model")
}

fn assert_aligned(det: &dotty_grid::PointDetection) {
    assert_eq!(det.ids().len(), det.object_points().len());
    assert_eq!(det.ids().len(), det.image_points().len());
}

#[test]
fn undistorted_reference_round_trips_every_dot() {
    let grid = grid();
    let img = render(&grid, &grid.model, grid.reference_size);
    let detector = detector_for(&grid, grid.model.clone(), camera(0.0));

    let det = detector.detect(&img.view(), false);
    assert_aligned(&det);
    assert_eq!(det.len(), grid.model.len());

    for (k, (id, obj, img_pt)) in det.iter().enumerate() {
        let mp = grid.model.points()[k];
        assert_eq!(id, mp.id);
        assert_eq!(obj, mp.world);
        let err = (img_pt - mp.reference).norm();
        assert!(err < 0.5, "id {id}: image point off by {err:.3} px");
    }
}

#[test]
fn distorted_image_points_land_in_the_raw_frame() {
    let grid = grid();
    let cam = camera(-0.05);
    let reference = render(&grid, &grid.model, grid.reference_size);
    let raw = render_distorted(&reference.view(), &cam);
    let detector = detector_for(&grid, grid.model.clone(), cam);

    let det = detector.detect(&raw.view(), true);
    assert_aligned(&det);
    assert!(
        det.len() >= grid.model.len() - 4,
        "only {} of {} dots matched",
        det.len(),
        grid.model.len()
    );

    for (id, obj, img_pt) in det.iter() {
        let mp = grid.model.points()[id as usize];
        assert_eq!(obj, mp.world);
        let expected = cam.distort_pixel(mp.reference);
        let err = (img_pt - expected).norm();
        assert!(err < 1.0, "id {id}: image point off by {err:.3} px");
    }
}

#[test]
fn undistorted_input_keeps_points_in_the_input_frame() {
    let grid = grid();
    let (s, c) = 5.0_f64.to_radians().sin_cos();
    let scale = 1.2;
    let h_true = Homography::new(Matrix3::new(
        scale * c,
        -scale * s,
        60.0,
        scale * s,
        scale * c,
        50.0,
        0.0,
        0.0,
        1.0,
    ));
    let scene_model = moved_model(&grid.model, |_, p| h_true.apply(p));
    let img = render(&grid, &scene_model, ImageSize::new(640, 580));

    // Strong distortion that must not be applied when the input is undistorted.
    let detector = detector_for(&grid, grid.model.clone(), camera(-0.3));
    let det = detector.detect(&img.view(), false);
    assert_aligned(&det);
    assert_eq!(det.len(), grid.model.len());

    for (id, obj, img_pt) in det.iter() {
        let mp = grid.model.points()[id as usize];
        assert_eq!(obj, mp.world);
        let expected = h_true.apply(mp.reference);
        let err = (img_pt - expected).norm();
        assert!(err < 0.5, "id {id}: image point off by {err:.3} px");
    }
}

#[test]
fn get_points_matches_detect() {
    let grid = grid();
    let img = render(&grid, &grid.model, grid.reference_size);
    let detector = detector_for(&grid, grid.model.clone(), camera(0.0));
    let as_trait: &dyn PointDetector = &detector;
    assert_eq!(as_trait.get_points(&img.view(), false), detector.detect(&img.view(), false));
}

#[test]
fn blank_image_gives_empty_result() {
    let grid = grid();
    let img = GrayImage::filled(grid.reference_size, 255);
    let detector = detector_for(&grid, grid.model.clone(), camera(-0.05));

    let det = detector.detect(&img.view(), true);
    assert!(det.is_empty());
    assert_aligned(&det);
}

#[test]
fn four_dots_are_not_enough() {
    let grid = grid();
    let fiducials_only = ModelTable::new(
        grid.fiducial_indexes
            .iter()
            .map(|&i| grid.model.points()[i])
            .collect(),
    )
    .expect("model");
    let img = render_reference(
        &fiducials_only,
        &[0, 1, 2, 3],
        grid.reference_size,
        DOT_RADIUS,
        FIDUCIAL_RADIUS,
    );
    let detector = detector_for(&grid, grid.model.clone(), camera(0.0));

    let res = detector.detect_with_diagnostics(&img.view(), false);
    assert!(res.detection.is_empty());
    assert_eq!(
        res.rejection,
        Some(Rejection::TooFewBlobs {
            raw: 4,
            undistorted: 4
        })
    );
}

#[test]
fn empty_undistorted_pass_rejects_the_frame() {
    let grid = grid();
    let img = render(&grid, &grid.model, grid.reference_size);
    // Principal point far left of the frame: every undistorted pixel samples
    // far outside the raw image, so only the raw pass sees dots.
    let cam = CameraModel::new(
        CameraIntrinsics {
            fx: 400.0,
            fy: 400.0,
            cx: -10_000.0,
            cy: 180.0,
        },
        BrownConrady::from_opencv([0.01, 0.0, 0.0, 0.0, 0.0]),
    );
    let detector = detector_for(&grid, grid.model.clone(), cam);

    let res = detector.detect_with_diagnostics(&img.view(), true);
    assert!(res.detection.is_empty());
    assert_eq!(res.raw_blobs, grid.model.len());
    assert_eq!(
        res.rejection,
        Some(Rejection::TooFewBlobs {
            raw: grid.model.len(),
            undistorted: 0
        })
    );
}

#[test]
fn rms_above_tolerance_rejects_the_frame() {
    let grid = grid();
    let img = render(&grid, &grid.model, grid.reference_size);
    let fiducials = grid.fiducial_indexes;
    // Every non-fiducial model dot sits 5 px right of where it is printed.
    let shifted = moved_model(&grid.model, |i, p| {
        if fiducials.contains(&i) {
            p
        } else {
            Point2::new(p.x + 5.0, p.y)
        }
    });

    let mut strict = params(grid.reference_size);
    strict.rms_tolerance = 2.0;
    let detector = DottyGridDetector::new(shifted.clone(), &fiducials, camera(0.0), strict)
        .expect("detector");
    let res = detector.detect_with_diagnostics(&img.view(), false);
    assert!(res.detection.is_empty());
    assert!(matches!(res.rejection, Some(Rejection::RmsTooLarge { .. })));
    let rms = res.rms.expect("rms");
    assert!(rms > 4.0 && rms < 5.5, "rms {rms}");

    let lenient = detector_for(&grid, shifted, camera(0.0));
    let det = lenient.detect(&img.view(), false);
    assert_eq!(det.len(), grid.model.len());
}

#[test]
fn ids_matched_twice_are_dropped() {
    let grid = grid();
    // An extra printed dot close to id 0 makes two detections claim it.
    let mut printed: Vec<ModelPoint> = grid.model.points().to_vec();
    let first = printed[0];
    printed.push(ModelPoint::new(
        10_000,
        [first.reference.x, first.reference.y + 17.0],
        [0.0, 0.0, 0.0],
    ));
    let printed = ModelTable::new(printed).expect("model");
    let img = render(&grid, &printed, grid.reference_size);
    let detector = detector_for(&grid, grid.model.clone(), camera(0.0));

    let res = detector.detect_with_diagnostics(&img.view(), false);
    assert_eq!(res.rejection, None);
    assert_eq!(res.duplicates_dropped, 2);
    let det = res.detection;
    assert_aligned(&det);
    assert_eq!(det.len(), grid.model.len() - 1);
    assert!(!det.ids().contains(&first.id));
}
