//! Manual crop box with corner and edge handles.
//!
//! The box lives in displayed pixels relative to the image's top-left corner
//! while the user interacts with it, and is handed out as a normalized
//! [`CropRegion`] when a drag or resize ends.

use crate::{
    constants::{HANDLE_HIT_RADIUS_PX, MIN_CROP_SIZE_PX},
    geometry::{CropRegion, ImageState, PixelRect},
};

/// Part of the crop box grabbed by the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropHandle {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
    /// Inside the box: moves it without resizing.
    Body,
}

impl CropHandle {
    pub const RESIZE: [CropHandle; 8] = [
        CropHandle::TopLeft,
        CropHandle::Top,
        CropHandle::TopRight,
        CropHandle::Right,
        CropHandle::BottomRight,
        CropHandle::Bottom,
        CropHandle::BottomLeft,
        CropHandle::Left,
    ];

    fn moves_left(self) -> bool {
        matches!(self, Self::TopLeft | Self::Left | Self::BottomLeft)
    }

    fn moves_right(self) -> bool {
        matches!(self, Self::TopRight | Self::Right | Self::BottomRight)
    }

    fn moves_top(self) -> bool {
        matches!(self, Self::TopLeft | Self::Top | Self::TopRight)
    }

    fn moves_bottom(self) -> bool {
        matches!(self, Self::BottomLeft | Self::Bottom | Self::BottomRight)
    }

    /// CSS cursor shown while hovering or dragging this handle.
    pub fn cursor(self) -> &'static str {
        match self {
            Self::TopLeft | Self::BottomRight => "nwse-resize",
            Self::TopRight | Self::BottomLeft => "nesw-resize",
            Self::Top | Self::Bottom => "ns-resize",
            Self::Left | Self::Right => "ew-resize",
            Self::Body => "move",
        }
    }

    fn anchor(self, r: &PixelRect) -> (f32, f32) {
        let (cx, cy) = r.center();
        match self {
            Self::TopLeft => (r.left, r.top),
            Self::Top => (cx, r.top),
            Self::TopRight => (r.right(), r.top),
            Self::Right => (r.right(), cy),
            Self::BottomRight => (r.right(), r.bottom()),
            Self::Bottom => (cx, r.bottom()),
            Self::BottomLeft => (r.left, r.bottom()),
            Self::Left => (r.left, cy),
            Self::Body => (cx, cy),
        }
    }
}

/// Like `f32::clamp`, but an upper bound that rounding pushed below `lo`
/// resolves to `lo` instead of panicking.
fn clamp_span(v: f32, lo: f32, hi: f32) -> f32 {
    v.max(lo).min(hi.max(lo))
}

#[derive(Debug, Clone, Copy)]
struct ActiveDrag {
    handle: CropHandle,
    start_x: f32,
    start_y: f32,
    start_rect: PixelRect,
}

#[derive(Debug, Clone)]
pub struct CropTool {
    state: ImageState,
    rect: PixelRect,
    drag: Option<ActiveDrag>,
}

impl CropTool {
    /// Start with the given region, clamped to the displayed image.
    pub fn new(state: ImageState, region: CropRegion) -> Self {
        let mut tool = Self {
            state,
            rect: PixelRect::default(),
            drag: None,
        };
        tool.rect = tool.clamp_rect(tool.region_to_rect(&region.clamped()));
        tool
    }

    fn bounds(&self) -> (f32, f32) {
        (self.state.displayed_width, self.state.displayed_height)
    }

    fn min_size(&self) -> (f32, f32) {
        let (w, h) = self.bounds();
        (MIN_CROP_SIZE_PX.min(w), MIN_CROP_SIZE_PX.min(h))
    }

    fn region_to_rect(&self, region: &CropRegion) -> PixelRect {
        let (w, h) = self.bounds();
        PixelRect::new(region.x * w, region.y * h, region.width * w, region.height * h)
    }

    fn clamp_rect(&self, r: PixelRect) -> PixelRect {
        let (bw, bh) = self.bounds();
        let (min_w, min_h) = self.min_size();
        let width = clamp_span(r.width, min_w, bw);
        let height = clamp_span(r.height, min_h, bh);
        PixelRect::new(
            clamp_span(r.left, 0.0, bw - width),
            clamp_span(r.top, 0.0, bh - height),
            width,
            height,
        )
    }

    /// Current box in image-local displayed pixels.
    pub fn rect(&self) -> PixelRect {
        self.rect
    }

    /// Current box relative to the preview container, for drawing.
    pub fn screen_rect(&self) -> PixelRect {
        self.rect.translate(self.state.offset_left, self.state.offset_top)
    }

    /// Handle anchor points relative to the preview container.
    pub fn handle_positions(&self) -> Vec<(CropHandle, f32, f32)> {
        let screen = self.screen_rect();
        CropHandle::RESIZE
            .iter()
            .map(|&h| {
                let (x, y) = h.anchor(&screen);
                (h, x, y)
            })
            .collect()
    }

    /// Current box as fractions of the original image.
    ///
    /// Displayed pixels are mapped back to natural pixels and divided by the
    /// natural size.
    pub fn region(&self) -> CropRegion {
        let s = &self.state;
        let nw = s.natural_width as f32;
        let nh = s.natural_height as f32;
        CropRegion {
            x: self.rect.left / s.scale_x / nw,
            y: self.rect.top / s.scale_y / nh,
            width: self.rect.width / s.scale_x / nw,
            height: self.rect.height / s.scale_y / nh,
        }
        .clamped()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Keep the same normalized region across a layout change.
    pub fn set_image_state(&mut self, state: ImageState) {
        let region = self.region();
        self.state = state;
        self.rect = self.clamp_rect(self.region_to_rect(&region));
        if let Some(drag) = self.drag.as_mut() {
            drag.start_rect = self.rect;
        }
    }

    /// Which part of the box is under a container-relative point.
    pub fn hit_test(&self, x: f32, y: f32) -> Option<CropHandle> {
        let screen = self.screen_rect();
        for handle in CropHandle::RESIZE {
            let (hx, hy) = handle.anchor(&screen);
            if (x - hx).abs() <= HANDLE_HIT_RADIUS_PX && (y - hy).abs() <= HANDLE_HIT_RADIUS_PX {
                return Some(handle);
            }
        }
        screen.contains(x, y).then_some(CropHandle::Body)
    }

    /// Begin a drag at a container-relative point. Returns the grabbed handle.
    pub fn pointer_down(&mut self, x: f32, y: f32) -> Option<CropHandle> {
        let handle = self.hit_test(x, y)?;
        self.drag = Some(ActiveDrag {
            handle,
            start_x: x,
            start_y: y,
            start_rect: self.rect,
        });
        Some(handle)
    }

    /// Update the box for the pointer at a container-relative point.
    ///
    /// Returns the new rect while a drag is active.
    pub fn pointer_move(&mut self, x: f32, y: f32) -> Option<PixelRect> {
        let drag = self.drag?;
        let dx = x - drag.start_x;
        let dy = y - drag.start_y;
        let start = drag.start_rect;
        let (bw, bh) = self.bounds();
        let (min_w, min_h) = self.min_size();

        self.rect = if drag.handle == CropHandle::Body {
            PixelRect::new(
                clamp_span(start.left + dx, 0.0, bw - start.width),
                clamp_span(start.top + dy, 0.0, bh - start.height),
                start.width,
                start.height,
            )
        } else {
            let mut left = start.left;
            let mut right = start.right();
            let mut top = start.top;
            let mut bottom = start.bottom();

            if drag.handle.moves_left() {
                left = clamp_span(start.left + dx, 0.0, right - min_w);
            }
            if drag.handle.moves_right() {
                right = clamp_span(start.right() + dx, (left + min_w).min(bw), bw);
            }
            if drag.handle.moves_top() {
                top = clamp_span(start.top + dy, 0.0, bottom - min_h);
            }
            if drag.handle.moves_bottom() {
                bottom = clamp_span(start.bottom() + dy, (top + min_h).min(bh), bh);
            }
            PixelRect::new(left, top, right - left, bottom - top)
        };

        Some(self.rect)
    }

    /// Finish the drag and return the region to analyse.
    pub fn pointer_up(&mut self) -> Option<CropRegion> {
        self.drag.take().map(|_| self.region())
    }

    pub fn cancel(&mut self) {
        if let Some(drag) = self.drag.take() {
            self.rect = drag.start_rect;
        }
    }
}
