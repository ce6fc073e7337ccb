//! Coordinate spaces used by the overlay and crop tool.
//!
//! Three spaces are in play:
//! - normalized: fractions in `[0, 1]` of the original image,
//! - natural: pixels of the decoded original image,
//! - screen: CSS pixels relative to the container that hosts the preview.

use serde::{Deserialize, Serialize};

use crate::error::{Result, VisualSearchError};

/// Axis-aligned rectangle in pixels (natural or screen, depending on context).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PixelRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl PixelRect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    pub fn center(&self) -> (f32, f32) {
        (self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.left && x <= self.right() && y >= self.top && y <= self.bottom()
    }

    pub fn translate(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.left + dx, self.top + dy, self.width, self.height)
    }
}

/// Layout snapshot of the preview image, standing in for the `<img>` element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageMetrics {
    pub natural_width: u32,
    pub natural_height: u32,
    /// Bounding rect of the image element.
    pub element: PixelRect,
    /// Bounding rect of the container the overlay is positioned in.
    pub container: PixelRect,
}

/// Scale and offset needed to map natural pixels onto the displayed image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageState {
    pub natural_width: u32,
    pub natural_height: u32,
    pub displayed_width: f32,
    pub displayed_height: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    /// Position of the image element within its container.
    pub offset_left: f32,
    pub offset_top: f32,
}

/// Recompute the image state from the current layout.
///
/// Must run after every image load and layout change, before any overlay
/// position is computed.
pub fn update_image_state(metrics: &ImageMetrics) -> Result<ImageState> {
    if metrics.natural_width == 0 || metrics.natural_height == 0 {
        return Err(VisualSearchError::InvalidImage(format!(
            "natural size {}x{} is empty",
            metrics.natural_width, metrics.natural_height
        )));
    }
    if metrics.element.width <= 0.0 || metrics.element.height <= 0.0 {
        return Err(VisualSearchError::InvalidImage(
            "image is not laid out yet".into(),
        ));
    }

    let displayed_width = metrics.element.width;
    let displayed_height = metrics.element.height;

    Ok(ImageState {
        natural_width: metrics.natural_width,
        natural_height: metrics.natural_height,
        displayed_width,
        displayed_height,
        scale_x: displayed_width / metrics.natural_width as f32,
        scale_y: displayed_height / metrics.natural_height as f32,
        offset_left: metrics.element.left - metrics.container.left,
        offset_top: metrics.element.top - metrics.container.top,
    })
}

impl ImageState {
    /// Natural-pixel rect to container-relative screen rect.
    pub fn natural_to_screen(&self, rect: &PixelRect) -> PixelRect {
        PixelRect::new(
            rect.left * self.scale_x + self.offset_left,
            rect.top * self.scale_y + self.offset_top,
            rect.width * self.scale_x,
            rect.height * self.scale_y,
        )
    }

    /// Displayed image bounds in image-local screen pixels (origin at the image's top left).
    pub fn displayed_bounds(&self) -> PixelRect {
        PixelRect::new(0.0, 0.0, self.displayed_width, self.displayed_height)
    }
}

/// Detection box as `[x1, y1, x2, y2]` fractions of the original image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl NormalizedBox {
    /// Build a box from raw API values, clamping into `[0, 1]`.
    ///
    /// Returns `None` for non-finite values or boxes without area.
    pub fn from_coords(coords: [f32; 4]) -> Option<Self> {
        if coords.iter().any(|c| !c.is_finite()) {
            return None;
        }
        let [x1, y1, x2, y2] = coords.map(|c| c.clamp(0.0, 1.0));
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(Self { x1, y1, x2, y2 })
    }

    /// Absolute box on the original image.
    pub fn to_natural(&self, natural_width: u32, natural_height: u32) -> PixelRect {
        let w = natural_width as f32;
        let h = natural_height as f32;
        PixelRect::new(
            self.x1 * w,
            self.y1 * h,
            (self.x2 - self.x1) * w,
            (self.y2 - self.y1) * h,
        )
    }

    /// Box position on screen relative to the preview container.
    pub fn to_screen(&self, state: &ImageState) -> PixelRect {
        let natural = self.to_natural(state.natural_width, state.natural_height);
        state.natural_to_screen(&natural)
    }
}

/// Crop selection in normalized coordinates of the original image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRegion {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl CropRegion {
    pub fn full() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
        }
    }

    /// Clamp into the unit square, keeping the origin inside first.
    pub fn clamped(&self) -> Self {
        // `max` before `min` so a NaN component collapses to zero.
        let x = self.x.max(0.0).min(1.0);
        let y = self.y.max(0.0).min(1.0);
        Self {
            x,
            y,
            width: self.width.max(0.0).min(1.0 - x),
            height: self.height.max(0.0).min(1.0 - y),
        }
    }

    /// Integer source rect on the original image, at least one pixel each way.
    pub fn to_pixel_bounds(&self, natural_width: u32, natural_height: u32) -> (u32, u32, u32, u32) {
        let c = self.clamped();
        let nw = natural_width as f32;
        let nh = natural_height as f32;

        let x = (c.x * nw).round().min(nw - 1.0).max(0.0) as u32;
        let y = (c.y * nh).round().min(nh - 1.0).max(0.0) as u32;
        let w = ((c.width * nw).round() as u32).min(natural_width.saturating_sub(x)).max(1);
        let h = ((c.height * nh).round() as u32).min(natural_height.saturating_sub(y)).max(1);
        (x, y, w, h)
    }
}

impl From<NormalizedBox> for CropRegion {
    fn from(b: NormalizedBox) -> Self {
        Self {
            x: b.x1,
            y: b.y1,
            width: b.x2 - b.x1,
            height: b.y2 - b.y1,
        }
    }
}
