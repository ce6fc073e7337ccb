use approx::assert_relative_eq;

use visual_search::constants::MIN_CROP_SIZE_PX;
use visual_search::crop::{CropHandle, CropTool};
use visual_search::geometry::{CropRegion, ImageMetrics, ImageState, PixelRect, update_image_state};

/// 600x400 natural image shown at 300x200, placed at (10, 20) in its container.
fn state() -> ImageState {
    update_image_state(&ImageMetrics {
        natural_width: 600,
        natural_height: 400,
        element: PixelRect::new(10.0, 20.0, 300.0, 200.0),
        container: PixelRect::new(0.0, 0.0, 400.0, 300.0),
    })
    .unwrap()
}

fn assert_inside(rect: &PixelRect) {
    let eps = 1e-3;
    assert!(rect.left >= -eps, "left {}", rect.left);
    assert!(rect.top >= -eps, "top {}", rect.top);
    assert!(rect.right() <= 300.0 + eps, "right {}", rect.right());
    assert!(rect.bottom() <= 200.0 + eps, "bottom {}", rect.bottom());
    assert!(rect.width >= MIN_CROP_SIZE_PX - eps, "width {}", rect.width);
    assert!(rect.height >= MIN_CROP_SIZE_PX - eps, "height {}", rect.height);
}

#[test]
fn test_initial_region_maps_to_displayed_pixels() {
    let tool = CropTool::new(
        state(),
        CropRegion {
            x: 0.25,
            y: 0.25,
            width: 0.5,
            height: 0.5,
        },
    );
    let r = tool.rect();
    assert_relative_eq!(r.left, 75.0);
    assert_relative_eq!(r.top, 50.0);
    assert_relative_eq!(r.width, 150.0);
    assert_relative_eq!(r.height, 100.0);

    let screen = tool.screen_rect();
    assert_relative_eq!(screen.left, 85.0);
    assert_relative_eq!(screen.top, 70.0);
}

#[test]
fn test_tiny_initial_region_is_grown_to_minimum() {
    let tool = CropTool::new(
        state(),
        CropRegion {
            x: 0.99,
            y: 0.99,
            width: 0.001,
            height: 0.001,
        },
    );
    assert_inside(&tool.rect());
}

#[test]
fn test_hit_test_handles_and_body() {
    let tool = CropTool::new(state(), CropRegion::full());
    // Screen box is (10, 20) to (310, 220).
    assert_eq!(tool.hit_test(10.0, 20.0), Some(CropHandle::TopLeft));
    assert_eq!(tool.hit_test(160.0, 20.0), Some(CropHandle::Top));
    assert_eq!(tool.hit_test(310.0, 120.0), Some(CropHandle::Right));
    assert_eq!(tool.hit_test(308.0, 218.0), Some(CropHandle::BottomRight));
    assert_eq!(tool.hit_test(100.0, 100.0), Some(CropHandle::Body));
    assert_eq!(tool.hit_test(390.0, 290.0), None);
}

#[test]
fn test_resize_past_bounds_is_clamped() {
    let mut tool = CropTool::new(state(), CropRegion::full());

    // Drag the top-left corner far past the bottom-right.
    assert_eq!(tool.pointer_down(10.0, 20.0), Some(CropHandle::TopLeft));
    let r = tool.pointer_move(5000.0, 5000.0).unwrap();
    assert_relative_eq!(r.width, MIN_CROP_SIZE_PX);
    assert_relative_eq!(r.height, MIN_CROP_SIZE_PX);
    assert_relative_eq!(r.right(), 300.0);
    assert_inside(&r);
    tool.pointer_up();

    // Drag the right edge out of the image.
    let mut tool = CropTool::new(state(), CropRegion::full());
    assert_eq!(tool.pointer_down(310.0, 120.0), Some(CropHandle::Right));
    let r = tool.pointer_move(-4000.0, 120.0).unwrap();
    assert_relative_eq!(r.left, 0.0);
    assert_relative_eq!(r.width, MIN_CROP_SIZE_PX);
    let r = tool.pointer_move(9000.0, 120.0).unwrap();
    assert_relative_eq!(r.width, 300.0);
}

#[test]
fn test_every_handle_stays_clamped() {
    let deltas = [-1000.0, -120.0, -30.0, 0.0, 45.0, 260.0, 1000.0];
    let start = CropRegion {
        x: 0.2,
        y: 0.2,
        width: 0.5,
        height: 0.5,
    };

    for handle in CropHandle::RESIZE.into_iter().chain([CropHandle::Body]) {
        for &dx in &deltas {
            for &dy in &deltas {
                let mut tool = CropTool::new(state(), start);
                let (hx, hy) = if handle == CropHandle::Body {
                    let (cx, cy) = tool.screen_rect().center();
                    (cx, cy)
                } else {
                    tool.handle_positions()
                        .into_iter()
                        .find(|(h, _, _)| *h == handle)
                        .map(|(_, x, y)| (x, y))
                        .unwrap()
                };
                assert_eq!(tool.pointer_down(hx, hy), Some(handle));
                let r = tool.pointer_move(hx + dx, hy + dy).unwrap();
                assert_inside(&r);

                let region = tool.pointer_up().unwrap();
                assert!(region.x >= 0.0 && region.x + region.width <= 1.0 + 1e-5);
                assert!(region.y >= 0.0 && region.y + region.height <= 1.0 + 1e-5);
            }
        }
    }
}

#[test]
fn test_body_drag_keeps_size() {
    let mut tool = CropTool::new(
        state(),
        CropRegion {
            x: 0.25,
            y: 0.25,
            width: 0.5,
            height: 0.5,
        },
    );
    assert_eq!(tool.pointer_down(160.0, 120.0), Some(CropHandle::Body));
    let r = tool.pointer_move(-500.0, -500.0).unwrap();
    assert_relative_eq!(r.left, 0.0);
    assert_relative_eq!(r.top, 0.0);
    assert_relative_eq!(r.width, 150.0);
    assert_relative_eq!(r.height, 100.0);
}

#[test]
fn test_pointer_up_returns_normalized_region() {
    let mut tool = CropTool::new(state(), CropRegion::full());
    tool.pointer_down(310.0, 220.0);
    tool.pointer_move(160.0, 120.0);
    let region = tool.pointer_up().unwrap();

    // 150x100 displayed is 300x200 natural of 600x400.
    assert_relative_eq!(region.x, 0.0);
    assert_relative_eq!(region.y, 0.0);
    assert_relative_eq!(region.width, 0.5, epsilon = 1e-5);
    assert_relative_eq!(region.height, 0.5, epsilon = 1e-5);

    assert!(!tool.is_dragging());
    assert!(tool.pointer_up().is_none());
}

#[test]
fn test_cancel_restores_box() {
    let mut tool = CropTool::new(state(), CropRegion::full());
    let before = tool.rect();
    tool.pointer_down(310.0, 220.0);
    tool.pointer_move(200.0, 200.0);
    tool.cancel();
    assert_eq!(tool.rect(), before);
}

#[test]
fn test_layout_change_keeps_region() {
    let mut tool = CropTool::new(
        state(),
        CropRegion {
            x: 0.25,
            y: 0.25,
            width: 0.5,
            height: 0.5,
        },
    );
    let bigger = update_image_state(&ImageMetrics {
        natural_width: 600,
        natural_height: 400,
        element: PixelRect::new(0.0, 0.0, 600.0, 400.0),
        container: PixelRect::new(0.0, 0.0, 600.0, 400.0),
    })
    .unwrap();
    tool.set_image_state(bigger);
    let r = tool.rect();
    assert_relative_eq!(r.left, 150.0, epsilon = 1e-3);
    assert_relative_eq!(r.width, 300.0, epsilon = 1e-3);
}

fn displayed(width: f32, height: f32) -> ImageState {
    update_image_state(&ImageMetrics {
        natural_width: 1000,
        natural_height: 750,
        element: PixelRect::new(3.0, 7.0, width, height),
        container: PixelRect::new(0.0, 0.0, width + 6.0, height + 14.0),
    })
    .unwrap()
}

fn assert_within(rect: &PixelRect, bw: f32, bh: f32) {
    let eps = 1e-3;
    assert!(rect.left >= 0.0 && rect.top >= 0.0, "{rect:?}");
    assert!(rect.right() <= bw + eps && rect.bottom() <= bh + eps, "{rect:?} in {bw}x{bh}");
    assert!(rect.width >= MIN_CROP_SIZE_PX - eps, "{rect:?}");
    assert!(rect.height >= MIN_CROP_SIZE_PX - eps, "{rect:?}");
}

fn grab(tool: &mut CropTool, handle: CropHandle) -> (f32, f32) {
    let (x, y) = if handle == CropHandle::Body {
        tool.screen_rect().center()
    } else {
        tool.handle_positions()
            .into_iter()
            .find(|(h, _, _)| *h == handle)
            .map(|(_, x, y)| (x, y))
            .unwrap()
    };
    tool.pointer_down(x, y).unwrap();
    (x, y)
}

#[test]
fn test_resize_after_move_to_edge_on_fractional_width() {
    let region = CropRegion {
        x: 0.338,
        y: 0.2,
        width: 0.506,
        height: 0.4,
    };
    for i in 0..200 {
        let bw = 481.6893 + i as f32 * 0.731;
        let bh = 301.377 + i as f32 * 0.417;
        let mut tool = CropTool::new(displayed(bw, bh), region);

        // Push the box hard against the right and bottom edges.
        let (x, y) = grab(&mut tool, CropHandle::Body);
        tool.pointer_move(x + 5000.0, y + 5000.0);
        tool.pointer_up();

        for handle in [CropHandle::Right, CropHandle::Bottom, CropHandle::BottomRight] {
            let (x, y) = grab(&mut tool, handle);
            let r = tool.pointer_move(x + 40.0, y + 40.0).unwrap();
            assert_within(&r, bw, bh);
            let r = tool.pointer_move(x - 5000.0, y - 5000.0).unwrap();
            assert_within(&r, bw, bh);
            tool.cancel();
        }
    }
}

#[test]
fn test_random_drag_sequences_stay_clamped() {
    let mut seed: u32 = 0x9e37_79b9;
    let mut next = move || {
        seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        (seed >> 8) as f32 / (1u32 << 24) as f32
    };
    let handles: Vec<CropHandle> = CropHandle::RESIZE
        .into_iter()
        .chain([CropHandle::Body])
        .collect();

    for _ in 0..500 {
        let bw = 60.0 + next() * 900.0;
        let bh = 60.0 + next() * 700.0;
        let start = CropRegion {
            x: next() * 0.8,
            y: next() * 0.8,
            width: 0.05 + next() * 0.6,
            height: 0.05 + next() * 0.6,
        };
        let mut tool = CropTool::new(displayed(bw, bh), start);
        assert_within(&tool.rect(), bw, bh);

        for _ in 0..12 {
            let handle = handles[(next() * handles.len() as f32) as usize % handles.len()];
            let (x, y) = grab(&mut tool, handle);
            for _ in 0..3 {
                let dx = (next() - 0.5) * 3.0 * bw;
                let dy = (next() - 0.5) * 3.0 * bh;
                let r = tool.pointer_move(x + dx, y + dy).unwrap();
                assert_within(&r, bw, bh);
            }
            let region = tool.pointer_up().unwrap();
            assert!(region.x + region.width <= 1.0 + 1e-5);
            assert!(region.y + region.height <= 1.0 + 1e-5);
        }
    }
}
