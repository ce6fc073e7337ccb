use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; visual-search-widget/0.3)";

/// Header carrying the storefront hostname on every detection request.
pub const SHOP_DOMAIN_HEADER: &str = "shopDomainURL";

pub const BEACON_PATH: &str = "/api/cleanup-notification";

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

// Upload validation
pub const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/webp",
    "image/gif",
    "image/heic",
    "image/heif",
    "image/avif",
    "image/bmp",
];

// Crop tool
pub const MIN_CROP_SIZE_PX: f32 = 50.0;
pub const HANDLE_HIT_RADIUS_PX: f32 = 12.0;
pub const CROP_DEBOUNCE: Duration = Duration::from_millis(500);
pub const CROP_JPEG_QUALITY: u8 = 90;

// Overlay
pub const MARKER_RADIUS_PX: f32 = 8.0;

// Results
pub const RESULTS_PAGE_SIZE: usize = 20;
pub const SCROLL_LOAD_THRESHOLD_PX: f32 = 100.0;
pub const LOAD_MORE_DELAY: Duration = Duration::from_millis(500);
pub const SKELETON_CARD_COUNT: usize = 6;

// Drawer copy
pub const HEADER_SEARCHING: &str = "Searching...";
pub const HEADER_ITEMS_DETECTED: &str = "Items detected!";
pub const HEADER_UPLOAD_PROMPT: &str = "Search by image";
pub const EMPTY_STATE_MESSAGE: &str = "No matching products found";
pub const REINSTALL_MESSAGE: &str =
    "Visual search is not connected to this store. Please reinstall the app from the Shopify admin.";
pub const GENERIC_RETRY_MESSAGE: &str = "Something went wrong while searching. Please try again.";
