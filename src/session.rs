use log::{info, warn};

use crate::{
    crop::CropTool,
    error::Result,
    geometry::{CropRegion, ImageMetrics, ImageState, update_image_state},
    response::{Detection, DetectionResponse},
    results::ResultsPager,
    upload::UploadedFile,
};

/// Identifies one detection request. Later requests have larger values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Generation(u64);

/// What a request was analysing, which decides what its response replaces.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisKind {
    /// The whole upload: replaces detections and products.
    FullImage,
    /// A detection picked from the overlay: replaces products only.
    Detection(String),
    /// A manual crop: replaces products only.
    Crop(CropRegion),
}

/// Everything that belongs to the current upload, owned by one drawer.
#[derive(Debug, Default)]
pub struct SessionState {
    upload: Option<UploadedFile>,
    natural_size: Option<(u32, u32)>,
    image_state: Option<ImageState>,
    detections: Vec<Detection>,
    selected_id: Option<String>,
    results: ResultsPager,
    crop_tool: Option<CropTool>,
    generation: u64,
    loading: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the upload and everything derived from it.
    ///
    /// The generation counter survives, so requests issued before the reset
    /// can never match a later one.
    pub fn reset(&mut self) {
        *self = Self {
            generation: self.generation,
            ..Self::default()
        };
    }

    /// Start a new upload, dropping everything derived from the previous one.
    ///
    /// The generation counter keeps counting so responses for the old upload
    /// stay stale.
    pub fn set_upload(&mut self, upload: UploadedFile, natural_size: Option<(u32, u32)>) {
        self.reset();
        self.upload = Some(upload);
        self.natural_size = natural_size;
    }

    pub fn upload(&self) -> Option<&UploadedFile> {
        self.upload.as_ref()
    }

    pub fn natural_size(&self) -> Option<(u32, u32)> {
        self.natural_size
    }

    /// Recompute the image state from fresh layout metrics.
    pub fn set_image_metrics(&mut self, metrics: &ImageMetrics) -> Result<ImageState> {
        let state = update_image_state(metrics)?;
        self.natural_size = Some((state.natural_width, state.natural_height));
        self.image_state = Some(state);
        if let Some(tool) = self.crop_tool.as_mut() {
            tool.set_image_state(state);
        }
        Ok(state)
    }

    pub fn image_state(&self) -> Option<&ImageState> {
        self.image_state.as_ref()
    }

    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }

    pub fn detection(&self, box_id: &str) -> Option<&Detection> {
        self.detections.iter().find(|d| d.box_id == box_id)
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected_id.as_deref()
    }

    pub fn select(&mut self, box_id: &str) -> bool {
        if self.detection(box_id).is_some() {
            self.selected_id = Some(box_id.to_string());
            true
        } else {
            false
        }
    }

    pub fn results(&self) -> &ResultsPager {
        &self.results
    }

    pub fn results_mut(&mut self) -> &mut ResultsPager {
        &mut self.results
    }

    pub fn crop_tool(&self) -> Option<&CropTool> {
        self.crop_tool.as_ref()
    }

    pub fn crop_tool_mut(&mut self) -> Option<&mut CropTool> {
        self.crop_tool.as_mut()
    }

    /// Open the crop tool over the selected detection, or the whole image.
    pub fn open_crop_tool(&mut self) -> Option<&mut CropTool> {
        let state = self.image_state?;
        let region = self
            .selected_id
            .as_deref()
            .and_then(|id| self.detection(id))
            .map(|d| CropRegion::from(d.bbox))
            .unwrap_or_else(CropRegion::full);
        self.crop_tool = Some(CropTool::new(state, region));
        self.crop_tool.as_mut()
    }

    pub fn close_crop_tool(&mut self) {
        self.crop_tool = None;
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Issue a new request generation. Any earlier request becomes stale.
    pub fn begin_request(&mut self) -> Generation {
        self.generation += 1;
        self.loading = true;
        Generation(self.generation)
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        generation.0 == self.generation
    }

    /// Apply a response if it belongs to the latest request.
    ///
    /// Returns `false` when the response was stale and discarded.
    pub fn apply_response(
        &mut self,
        generation: Generation,
        kind: &AnalysisKind,
        response: DetectionResponse,
    ) -> bool {
        if !self.is_current(generation) {
            warn!(
                "Discarding stale response for request {} (latest {})",
                generation.0, self.generation
            );
            return false;
        }

        self.loading = false;
        if *kind == AnalysisKind::FullImage {
            self.selected_id = response.initial_selection().map(str::to_string);
            self.detections = response.detections;
        }
        info!(
            "Applied {} products for request {}",
            response.products.len(),
            generation.0
        );
        self.results = ResultsPager::new(response.products);
        true
    }

    /// Clear results after a failed request. Stale failures are ignored.
    pub fn apply_failure(&mut self, generation: Generation) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.loading = false;
        self.results = ResultsPager::default();
        true
    }
}
