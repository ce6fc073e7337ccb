//! The upload/results drawer.
//!
//! A [`DrawerController`] owns the session for one open drawer. Hosts feed it
//! uploads, layout metrics, pointer and scroll events, and draw the
//! [`DrawerView`] it keeps up to date.

use log::{debug, error, info, warn};
use serde_json::json;
use tokio::time::Instant;

use crate::{
    DetectionApi, DetectionRequest,
    analytics::AnalyticsSink,
    config::{ThemeConfig, ThemeSource},
    constants::*,
    crop::CropHandle,
    debounce::Debouncer,
    error::{ErrorCategory, Result, VisualSearchError},
    geometry::{CropRegion, ImageMetrics, ImageState, PixelRect},
    image_processor::{self, ProcessedImage},
    overlay::{OverlayLayout, show_multiple_detections},
    response::DetectionResponse,
    results::{ProductCard, ScrollMetrics},
    session::{AnalysisKind, Generation, SessionState},
    upload::{self, UploadSource, UploadedFile},
};

#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    pub name: String,
    pub mime: String,
    /// Natural size, unknown for formats that cannot be decoded locally.
    pub size: Option<(u32, u32)>,
    /// Skeleton shown while the image decodes.
    pub decoding: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toast {
    Error(String),
    Info(String),
}

/// Everything the host needs to draw the drawer.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawerView {
    pub open: bool,
    pub header: String,
    pub preview: Option<Preview>,
    pub skeleton_cards: usize,
    pub cards: Vec<ProductCard>,
    pub has_more: bool,
    pub empty_message: Option<String>,
    pub overlay: Option<OverlayLayout>,
    pub crop_box: Option<PixelRect>,
    pub toasts: Vec<Toast>,
}

impl Default for DrawerView {
    fn default() -> Self {
        Self {
            open: true,
            header: HEADER_UPLOAD_PROMPT.to_string(),
            preview: None,
            skeleton_cards: 0,
            cards: Vec::new(),
            has_more: false,
            empty_message: None,
            overlay: None,
            crop_box: None,
            toasts: Vec::new(),
        }
    }
}

/// A detection request that has been issued but not yet applied.
#[derive(Debug, Clone)]
pub struct PendingAnalysis {
    pub generation: Generation,
    pub kind: AnalysisKind,
    pub request: DetectionRequest,
}

pub struct DrawerController<A: DetectionApi> {
    api: A,
    http: reqwest::Client,
    analytics: AnalyticsSink,
    theme: ThemeConfig,
    session: SessionState,
    crop_debounce: Debouncer<CropRegion>,
    view: DrawerView,
    page_url: String,
    auth_blocked: bool,
    disposed: bool,
}

impl<A: DetectionApi> DrawerController<A> {
    /// Open a drawer. The theme is read once here and stays fixed until reopen.
    pub fn new(api: A, theme_source: &ThemeSource) -> Self {
        Self {
            api,
            http: reqwest::Client::builder().build().unwrap_or_default(),
            analytics: AnalyticsSink::disabled(),
            theme: ThemeConfig::read(theme_source),
            session: SessionState::new(),
            crop_debounce: Debouncer::new(CROP_DEBOUNCE),
            view: DrawerView::default(),
            page_url: String::new(),
            auth_blocked: false,
            disposed: false,
        }
    }

    pub fn with_http(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn with_analytics(mut self, analytics: AnalyticsSink) -> Self {
        self.analytics = analytics;
        self
    }

    pub fn with_page_url(mut self, url: impl Into<String>) -> Self {
        self.page_url = url.into();
        self
    }

    pub fn theme(&self) -> &ThemeConfig {
        &self.theme
    }

    pub fn view(&self) -> &DrawerView {
        &self.view
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Drop toasts once the host has shown them.
    pub fn take_toasts(&mut self) -> Vec<Toast> {
        std::mem::take(&mut self.view.toasts)
    }

    fn ensure_active(&self) -> Result<()> {
        if self.disposed {
            Err(VisualSearchError::Disposed)
        } else {
            Ok(())
        }
    }

    fn track(&self, action: &str, metadata: serde_json::Value) {
        if self.analytics.is_enabled() && tokio::runtime::Handle::try_current().is_ok() {
            self.analytics.track(action, &self.page_url, metadata);
        }
    }

    /// Replace the previous session with a fresh one and re-read the theme.
    pub fn reopen(&mut self, theme_source: &ThemeSource) -> Result<()> {
        self.ensure_active()?;
        self.theme = ThemeConfig::read(theme_source);
        self.session.reset();
        self.crop_debounce.cancel();
        self.view = DrawerView::default();
        self.track("drawer_open", json!({}));
        Ok(())
    }

    // --- Upload ---

    /// Validate an upload, show its preview and analyse the whole image.
    ///
    /// Rejected uploads leave the session untouched and make no detection call.
    pub async fn upload(&mut self, source: UploadSource) -> Result<()> {
        self.ensure_active()?;

        let file = match upload::load(source, &self.http).await {
            Ok(file) => file,
            Err(e) => {
                self.report_error(&e);
                return Err(e);
            }
        };

        self.accept_upload(file);
        self.track(
            "image_uploaded",
            json!({ "mime": self.view.preview.as_ref().map(|p| p.mime.clone()) }),
        );

        let pending = self.begin_analysis(AnalysisKind::FullImage)?;
        self.run_analysis(pending).await
    }

    fn accept_upload(&mut self, file: UploadedFile) {
        info!("Accepted upload {} ({}, {} bytes)", file.name, file.mime, file.size());

        self.crop_debounce.cancel();
        self.view.preview = Some(Preview {
            name: file.name.clone(),
            mime: file.mime.clone(),
            size: None,
            decoding: true,
        });
        self.view.overlay = None;
        self.view.crop_box = None;

        let size = image_processor::probe_dimensions(&file.bytes);
        if size.is_none() {
            warn!("Cannot decode {} locally, preview size unknown", file.mime);
        }
        self.session.set_upload(file, size);

        if let Some(preview) = self.view.preview.as_mut() {
            preview.size = size;
            preview.decoding = false;
        }
    }

    // --- Analysis ---

    fn request_for(&self, kind: &AnalysisKind) -> Result<DetectionRequest> {
        let upload = self
            .session
            .upload()
            .ok_or_else(|| VisualSearchError::InvalidImage("no image uploaded".into()))?;

        let cropped: Option<ProcessedImage> = match kind {
            AnalysisKind::FullImage => None,
            AnalysisKind::Detection(box_id) => {
                let detection = self.session.detection(box_id).ok_or_else(|| {
                    VisualSearchError::InvalidResponse(format!("unknown detection {box_id}"))
                })?;
                let (w, h) = self.natural_size()?;
                Some(image_processor::crop_rect_to_jpeg(
                    &upload.bytes,
                    &detection.bbox.to_natural(w, h),
                )?)
            }
            AnalysisKind::Crop(region) => {
                Some(image_processor::crop_region_to_jpeg(&upload.bytes, region)?)
            }
        };

        Ok(match cropped {
            Some(img) => DetectionRequest {
                image: img.bytes,
                file_name: "crop.jpg".to_string(),
                mime: img.mime.to_string(),
                crop: true,
            },
            None => DetectionRequest {
                image: upload.bytes.clone(),
                file_name: upload.name.clone(),
                mime: upload.mime.clone(),
                crop: false,
            },
        })
    }

    fn natural_size(&self) -> Result<(u32, u32)> {
        self.session
            .natural_size()
            .ok_or_else(|| VisualSearchError::InvalidImage("image size unknown".into()))
    }

    /// Build the request for `kind`, issue a new generation and show skeletons.
    ///
    /// Hosts that run requests themselves pair this with [`Self::complete_analysis`].
    pub fn begin_analysis(&mut self, kind: AnalysisKind) -> Result<PendingAnalysis> {
        self.ensure_active()?;
        if self.auth_blocked {
            let e = VisualSearchError::Auth(crate::error::AuthCode::ShopNotAuthenticated);
            self.report_error(&e);
            return Err(e);
        }

        let request = match self.request_for(&kind) {
            Ok(r) => r,
            Err(e) => {
                self.report_error(&e);
                return Err(e);
            }
        };
        let generation = self.session.begin_request();
        debug!("Issued {:?} as {:?}", kind, generation);

        self.view.header = HEADER_SEARCHING.to_string();
        self.view.skeleton_cards = SKELETON_CARD_COUNT;
        self.view.cards.clear();
        self.view.has_more = false;
        self.view.empty_message = None;

        Ok(PendingAnalysis {
            generation,
            kind,
            request,
        })
    }

    /// Apply the outcome of a request. Returns whether it was applied; results
    /// of superseded requests are discarded.
    pub fn complete_analysis(
        &mut self,
        generation: Generation,
        kind: &AnalysisKind,
        result: Result<DetectionResponse>,
    ) -> Result<bool> {
        self.ensure_active()?;
        match result {
            Ok(response) => {
                if !self.session.apply_response(generation, kind, response) {
                    return Ok(false);
                }
                self.refresh_results_view();
                if *kind == AnalysisKind::FullImage {
                    self.refresh_overlay();
                }
                Ok(true)
            }
            Err(e) => {
                if !self.session.apply_failure(generation) {
                    debug!("Ignoring failure of superseded request: {}", e);
                    return Ok(false);
                }
                self.report_error(&e);
                Err(e)
            }
        }
    }

    async fn run_analysis(&mut self, pending: PendingAnalysis) -> Result<()> {
        let PendingAnalysis {
            generation,
            kind,
            request,
        } = pending;
        let result = self.api.detect(request).await;
        self.complete_analysis(generation, &kind, result).map(|_| ())
    }

    fn refresh_results_view(&mut self) {
        let results = self.session.results();
        self.view.skeleton_cards = 0;
        self.view.cards = results.cards();
        self.view.has_more = results.has_more();
        if results.total() == 0 {
            self.view.header = EMPTY_STATE_MESSAGE.to_string();
            self.view.empty_message = Some(EMPTY_STATE_MESSAGE.to_string());
        } else {
            self.view.header = HEADER_ITEMS_DETECTED.to_string();
            self.view.empty_message = None;
        }
    }

    fn report_error(&mut self, e: &VisualSearchError) {
        match e.category() {
            ErrorCategory::Validation => warn!("Upload rejected: {}", e),
            ErrorCategory::Authentication => {
                error!("Detection API refused the shop: {}", e);
                self.auth_blocked = true;
            }
            ErrorCategory::Network => error!("Detection failed: {}", e),
            ErrorCategory::Silent => {
                debug!("{}", e);
                return;
            }
        }

        if e.category() != ErrorCategory::Validation {
            self.view.skeleton_cards = 0;
            self.view.cards.clear();
            self.view.has_more = false;
            self.view.header = EMPTY_STATE_MESSAGE.to_string();
            self.view.empty_message = Some(EMPTY_STATE_MESSAGE.to_string());
        }
        if let Some(msg) = e.user_message() {
            self.view.toasts.push(Toast::Error(msg));
        }
    }

    // --- Overlay ---

    /// Take fresh layout metrics of the preview image and re-lay out the overlay.
    pub fn set_image_metrics(&mut self, metrics: &ImageMetrics) -> Result<ImageState> {
        self.ensure_active()?;
        let state = self.session.set_image_metrics(metrics)?;
        self.refresh_overlay();
        Ok(state)
    }

    fn refresh_overlay(&mut self) {
        self.view.overlay = self.overlay();
        self.view.crop_box = self.session.crop_tool().map(|t| t.screen_rect());
    }

    /// Overlay for the current detections, or `None` until the image is laid out.
    pub fn overlay(&self) -> Option<OverlayLayout> {
        let state = self.session.image_state()?;
        Some(show_multiple_detections(
            self.session.detections(),
            self.session.selected_id(),
            state,
        ))
    }

    /// Handle a click on the overlay. Returns whether a marker was hit.
    pub async fn click_overlay(&mut self, x: f32, y: f32) -> Result<bool> {
        let hit = self
            .overlay()
            .and_then(|layout| layout.marker_at(x, y).map(|m| m.box_id.clone()));
        match hit {
            Some(box_id) => self.select_detection(&box_id).await.map(|_| true),
            None => Ok(false),
        }
    }

    /// Highlight a detection and search for the region it covers.
    pub async fn select_detection(&mut self, box_id: &str) -> Result<()> {
        self.ensure_active()?;
        if !self.session.select(box_id) {
            return Err(VisualSearchError::InvalidResponse(format!(
                "unknown detection {box_id}"
            )));
        }
        self.refresh_overlay();
        self.track("detection_selected", json!({ "boxId": box_id }));

        let pending = self.begin_analysis(AnalysisKind::Detection(box_id.to_string()))?;
        self.run_analysis(pending).await
    }

    // --- Crop tool ---

    /// Show the crop box over the selected detection or the whole image.
    pub fn start_crop(&mut self) -> Result<PixelRect> {
        self.ensure_active()?;
        let rect = self
            .session
            .open_crop_tool()
            .map(|t| t.screen_rect())
            .ok_or_else(|| VisualSearchError::InvalidImage("image is not laid out yet".into()))?;
        self.view.crop_box = Some(rect);
        Ok(rect)
    }

    pub fn cancel_crop(&mut self) {
        self.session.close_crop_tool();
        self.crop_debounce.cancel();
        self.view.crop_box = None;
    }

    pub fn crop_pointer_down(&mut self, x: f32, y: f32) -> Option<CropHandle> {
        if self.disposed {
            return None;
        }
        self.session.crop_tool_mut()?.pointer_down(x, y)
    }

    /// Move the grabbed handle. Keeps any pending re-analysis waiting.
    pub fn crop_pointer_move(&mut self, x: f32, y: f32, now: Instant) -> Option<PixelRect> {
        if self.disposed {
            return None;
        }
        let tool = self.session.crop_tool_mut()?;
        tool.pointer_move(x, y)?;
        let rect = tool.screen_rect();
        self.crop_debounce.touch(now);
        self.view.crop_box = Some(rect);
        Some(rect)
    }

    /// End the drag and schedule a re-analysis of the new region.
    pub fn crop_pointer_up(&mut self, now: Instant) -> Option<CropRegion> {
        if self.disposed {
            return None;
        }
        let region = self.session.crop_tool_mut()?.pointer_up()?;
        self.crop_debounce.schedule(region, now);
        Some(region)
    }

    pub fn crop_deadline(&self) -> Option<Instant> {
        self.crop_debounce.deadline()
    }

    /// Run the scheduled crop analysis if its quiet period is over.
    pub async fn poll_crop_debounce(&mut self, now: Instant) -> Result<bool> {
        self.ensure_active()?;
        match self.crop_debounce.take_due(now) {
            Some(region) => self.search_region(region).await.map(|_| true),
            None => Ok(false),
        }
    }

    /// Wait for the scheduled crop analysis and run it.
    pub async fn wait_crop_debounce(&mut self) -> Result<bool> {
        self.ensure_active()?;
        match self.crop_debounce.wait().await {
            Some(region) => self.search_region(region).await.map(|_| true),
            None => Ok(false),
        }
    }

    /// Search for a normalized region of the upload.
    pub async fn search_region(&mut self, region: CropRegion) -> Result<()> {
        self.track(
            "crop_search",
            json!({ "x": region.x, "y": region.y, "width": region.width, "height": region.height }),
        );
        let pending = self.begin_analysis(AnalysisKind::Crop(region))?;
        self.run_analysis(pending).await
    }

    // --- Results ---

    /// Returns `true` if the scroll position starts loading the next page.
    pub fn on_results_scroll(&mut self, metrics: ScrollMetrics) -> bool {
        !self.disposed && self.session.results_mut().on_scroll(metrics)
    }

    /// Append the next page after the pacing delay.
    pub async fn load_more(&mut self) -> Result<Vec<ProductCard>> {
        self.ensure_active()?;
        let added = self.session.results_mut().load_more_paced().await;
        let results = self.session.results();
        self.view.cards.extend(added.iter().cloned());
        self.view.has_more = results.has_more();
        Ok(added)
    }

    // --- Lifecycle ---

    pub fn close(&mut self) {
        if self.disposed || !self.view.open {
            return;
        }
        self.crop_debounce.cancel();
        self.view.open = false;
        self.track("drawer_close", json!({}));
    }

    /// Tear down for good. Every later call is a no-op or returns `Disposed`.
    pub fn dispose(&mut self) {
        self.close();
        self.session.reset();
        self.view = DrawerView {
            open: false,
            ..DrawerView::default()
        };
        self.disposed = true;
    }
}
