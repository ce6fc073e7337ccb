pub mod analytics;
pub mod config;
pub mod constants;
pub mod crop;
pub mod debounce;
pub mod drawer;
pub mod error;
pub mod geometry;
pub mod image_processor;
pub mod overlay;
pub mod response;
pub mod results;
pub mod session;
pub mod upload;

use std::future::Future;

use bytes::Bytes;
use log::debug;
use reqwest::{
    header::{HeaderMap, HeaderValue, USER_AGENT},
    multipart::{Form, Part},
};

use crate::{config::ClientConfig, constants::*, error::Result, response::*};

pub use crate::error::VisualSearchError;

/// One image submitted for detection.
#[derive(Debug, Clone)]
pub struct DetectionRequest {
    pub image: Bytes,
    pub file_name: String,
    pub mime: String,
    /// Whether `image` is a crop of the original upload.
    pub crop: bool,
}

/// The detection backend as seen by the drawer.
pub trait DetectionApi {
    fn detect(&self, request: DetectionRequest)
    -> impl Future<Output = Result<DetectionResponse>>;
}

// --- Client Implementation ---

pub struct SearchClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl SearchClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Shared HTTP client, reused for URL uploads and beacons.
    pub fn http(&self) -> &reqwest::Client {
        &self.client
    }

    pub async fn search_bytes(
        &self,
        bytes: Bytes,
        file_name: &str,
        mime: &str,
    ) -> Result<DetectionResponse> {
        self.send_request(DetectionRequest {
            image: bytes,
            file_name: file_name.to_string(),
            mime: mime.to_string(),
            crop: false,
        })
        .await
    }

    async fn send_request(&self, request: DetectionRequest) -> Result<DetectionResponse> {
        let size = request.image.len();
        let part = Part::stream_with_length(request.image, size as u64)
            .file_name(request.file_name)
            .mime_str(&request.mime)?;

        let form = Form::new()
            .part("file", part)
            .text("crop", if request.crop { "true" } else { "false" });

        debug!(
            "POST {} ({} bytes, crop={})",
            self.config.api_url, size, request.crop
        );

        let response = self
            .client
            .post(self.config.api_url.clone())
            .header(SHOP_DOMAIN_HEADER, &self.config.shop_domain)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_failure(status.as_u16(), &text));
        }

        let body = response.bytes().await?;
        parse_detection_response(&body)
    }
}

impl DetectionApi for SearchClient {
    fn detect(
        &self,
        request: DetectionRequest,
    ) -> impl Future<Output = Result<DetectionResponse>> {
        self.send_request(request)
    }
}
