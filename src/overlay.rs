use crate::{
    constants::MARKER_RADIUS_PX,
    geometry::{ImageState, PixelRect},
    response::Detection,
};

/// Round marker drawn at the centre of every detection.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub box_id: String,
    pub center_x: f32,
    pub center_y: f32,
    pub radius: f32,
    pub selected: bool,
}

impl Marker {
    pub fn contains(&self, x: f32, y: f32) -> bool {
        let dx = x - self.center_x;
        let dy = y - self.center_y;
        dx * dx + dy * dy <= self.radius * self.radius
    }
}

/// Outline around the selected detection.
#[derive(Debug, Clone, PartialEq)]
pub struct Highlight {
    pub box_id: String,
    pub rect: PixelRect,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct OverlayLayout {
    pub markers: Vec<Marker>,
    pub highlight: Option<Highlight>,
}

impl OverlayLayout {
    /// Marker under a container-relative point, topmost last-drawn first.
    pub fn marker_at(&self, x: f32, y: f32) -> Option<&Marker> {
        self.markers.iter().rev().find(|m| m.contains(x, y))
    }
}

/// Lay out markers for every detection and a rectangle for the selected one.
///
/// Positions are relative to the preview container, so `state` must reflect
/// the current layout.
pub fn show_multiple_detections(
    detections: &[Detection],
    selected_id: Option<&str>,
    state: &ImageState,
) -> OverlayLayout {
    let mut layout = OverlayLayout::default();

    for detection in detections {
        let rect = detection.bbox.to_screen(state);
        let (center_x, center_y) = rect.center();
        let selected = selected_id == Some(detection.box_id.as_str());

        layout.markers.push(Marker {
            box_id: detection.box_id.clone(),
            center_x,
            center_y,
            radius: MARKER_RADIUS_PX,
            selected,
        });

        if selected {
            layout.highlight = Some(Highlight {
                box_id: detection.box_id.clone(),
                rect,
                label: detection.label.clone(),
            });
        }
    }

    layout
}
