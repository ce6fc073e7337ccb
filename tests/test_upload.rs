use std::io::Write;

use bytes::Bytes;
use tempfile::Builder;

use visual_search::constants::MAX_UPLOAD_BYTES;
use visual_search::error::{ErrorCategory, VisualSearchError};
use visual_search::upload::{self, UploadSource, resolve_mime, validate};

const MB: u64 = 1024 * 1024;

#[test]
fn test_six_megabyte_jpeg_rejected() {
    let err = validate("photo.jpg", Some("image/jpeg"), 6 * MB).unwrap_err();
    assert!(matches!(
        err,
        VisualSearchError::FileTooLarge { size, max } if size == 6 * MB && max == MAX_UPLOAD_BYTES
    ));
    assert_eq!(err.category(), ErrorCategory::Validation);
    assert!(err.user_message().unwrap().contains("5MB"));
}

#[test]
fn test_four_megabyte_jpeg_accepted() {
    assert_eq!(
        validate("photo.jpg", Some("image/jpeg"), 4 * MB).unwrap(),
        "image/jpeg"
    );
}

#[test]
fn test_exactly_five_megabytes_accepted() {
    assert!(validate("photo.png", None, 5 * MB).is_ok());
}

#[test]
fn test_text_file_rejected() {
    let err = validate("notes.txt", None, 100).unwrap_err();
    assert!(matches!(err, VisualSearchError::UnsupportedType(ref m) if m == "text/plain"));

    let err = validate("notes.txt", Some("text/plain"), 100).unwrap_err();
    assert!(matches!(err, VisualSearchError::UnsupportedType(_)));
}

#[test]
fn test_unsupported_type_message_lists_every_accepted_format() {
    let message = validate("notes.txt", None, 100)
        .unwrap_err()
        .user_message()
        .unwrap();
    for format in ["JPEG", "PNG", "WEBP", "GIF", "HEIC", "HEIF", "AVIF", "BMP"] {
        assert!(message.contains(format), "{format} missing from {message}");
    }
    assert!(!message.contains("JPG,"));
}

#[test]
fn test_heic_accepted() {
    assert_eq!(validate("IMG_0001.HEIC", None, 3 * MB).unwrap(), "image/heic");
    assert_eq!(
        validate("IMG_0001.heic", Some("image/heic"), MB).unwrap(),
        "image/heic"
    );
}

#[test]
fn test_unknown_extension_without_type_rejected() {
    assert!(matches!(
        validate("archive", None, 10),
        Err(VisualSearchError::UnsupportedType(_))
    ));
}

#[test]
fn test_declared_type_wins_over_extension() {
    assert_eq!(
        resolve_mime("image.bin", Some("Image/PNG; charset=binary")).as_deref(),
        Some("image/png")
    );
    // Octet-stream says nothing, so the extension decides.
    assert_eq!(
        resolve_mime("shoe.webp", Some("application/octet-stream")).as_deref(),
        Some("image/webp")
    );
}

#[tokio::test]
async fn test_load_bytes_source() {
    let client = reqwest::Client::new();
    let file = upload::load(
        UploadSource::Bytes {
            name: "capture.jpg".into(),
            mime: Some("image/jpeg".into()),
            bytes: Bytes::from(vec![0u8; 1024]),
        },
        &client,
    )
    .await
    .unwrap();
    assert_eq!(file.mime, "image/jpeg");
    assert_eq!(file.size(), 1024);
}

#[tokio::test]
async fn test_load_path_source() {
    let mut tmp = Builder::new().suffix(".png").tempfile().unwrap();
    tmp.write_all(&[1, 2, 3, 4]).unwrap();
    tmp.flush().unwrap();

    let client = reqwest::Client::new();
    let file = upload::load(UploadSource::Path(tmp.path().to_path_buf()), &client)
        .await
        .unwrap();
    assert_eq!(file.mime, "image/png");
    assert_eq!(&file.bytes[..], &[1, 2, 3, 4]);
}

#[tokio::test]
async fn test_load_oversized_path_rejected() {
    let tmp = Builder::new().suffix(".jpg").tempfile().unwrap();
    tmp.as_file().set_len(6 * MB).unwrap();

    let client = reqwest::Client::new();
    let err = upload::load(UploadSource::Path(tmp.path().to_path_buf()), &client)
        .await
        .unwrap_err();
    assert!(matches!(err, VisualSearchError::FileTooLarge { .. }));
}
