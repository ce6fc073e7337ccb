use std::io::Cursor;

use bytes::Bytes;
use image::{DynamicImage, ImageReader, codecs::jpeg::JpegEncoder};

use crate::{
    constants::CROP_JPEG_QUALITY,
    error::{Result, VisualSearchError},
    geometry::{CropRegion, PixelRect},
};

#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub bytes: Bytes,
    pub width: u32,
    pub height: u32,
    pub mime: &'static str,
}

/// Read the pixel size from the image header without decoding pixels.
///
/// Returns `None` for formats the decoder does not know (HEIC among them).
pub fn probe_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    let img = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()?;
    Ok(img)
}

/// Crop a natural-pixel rect out of the source and encode it as JPEG.
pub fn crop_rect_to_jpeg(bytes: &[u8], rect: &PixelRect) -> Result<ProcessedImage> {
    let img = decode(bytes)?;
    let (w, h) = (img.width(), img.height());
    if rect.width <= 0.0 || rect.height <= 0.0 {
        return Err(VisualSearchError::InvalidImage(format!(
            "crop {}x{} has no area",
            rect.width, rect.height
        )));
    }
    let region = CropRegion {
        x: rect.left / w as f32,
        y: rect.top / h as f32,
        width: rect.width / w as f32,
        height: rect.height / h as f32,
    };
    crop_image(&img, &region)
}

/// Crop a normalized region out of the source and encode it as JPEG.
pub fn crop_region_to_jpeg(bytes: &[u8], region: &CropRegion) -> Result<ProcessedImage> {
    let img = decode(bytes)?;
    crop_image(&img, region)
}

fn crop_image(img: &DynamicImage, region: &CropRegion) -> Result<ProcessedImage> {
    let (x, y, w, h) = region.to_pixel_bounds(img.width(), img.height());
    let cropped = img.crop_imm(x, y, w, h).to_rgb8();

    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, CROP_JPEG_QUALITY).encode_image(&cropped)?;

    Ok(ProcessedImage {
        bytes: Bytes::from(buf),
        width: w,
        height: h,
        mime: "image/jpeg",
    })
}
