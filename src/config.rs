use std::{collections::HashMap, fmt, str::FromStr, time::Duration};

use log::warn;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    constants::REQUEST_TIMEOUT,
    error::{Result, VisualSearchError},
};

/// Where the detection API lives and which shop the requests are for.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: Url,
    /// Bare hostname, e.g. `example.myshopify.com`.
    pub shop_domain: String,
    /// Origin of the admin app receiving analytics beacons.
    pub admin_origin: Option<Url>,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(api_url: &str, shop: &str) -> Result<Self> {
        Ok(Self {
            api_url: Url::parse(api_url)?,
            shop_domain: normalize_shop_domain(shop)?,
            admin_origin: None,
            timeout: REQUEST_TIMEOUT,
        })
    }

    pub fn with_admin_origin(mut self, origin: &str) -> Result<Self> {
        self.admin_origin = Some(Url::parse(origin)?);
        Ok(self)
    }
}

/// Reduce `https://shop.example.com/collections/all` and friends to the hostname.
pub fn normalize_shop_domain(shop: &str) -> Result<String> {
    let trimmed = shop.trim();
    if trimmed.is_empty() {
        return Err(VisualSearchError::Config("shop domain is empty".into()));
    }
    let url = if trimmed.contains("://") {
        Url::parse(trimmed)?
    } else {
        Url::parse(&format!("https://{trimmed}"))?
    };
    url.host_str()
        .map(|h| h.to_ascii_lowercase())
        .ok_or_else(|| VisualSearchError::Config(format!("no host in shop domain {shop}")))
}

/// App block the widget was mounted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockKind {
    HeaderBlock,
    FloatingBlock,
    InputEmbed,
}

impl FromStr for BlockKind {
    type Err = VisualSearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "header-block" => Ok(Self::HeaderBlock),
            "floating-block" => Ok(Self::FloatingBlock),
            "input-embed" => Ok(Self::InputEmbed),
            other => Err(VisualSearchError::Config(format!("unknown block kind {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IconPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
}

impl FromStr for IconPosition {
    type Err = VisualSearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "top-left" => Ok(Self::TopLeft),
            "top-right" => Ok(Self::TopRight),
            "bottom-left" => Ok(Self::BottomLeft),
            "bottom-right" => Ok(Self::BottomRight),
            other => Err(VisualSearchError::Config(format!("unknown icon position {other}"))),
        }
    }
}

impl fmt::Display for IconPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::TopLeft => "top-left",
            Self::TopRight => "top-right",
            Self::BottomLeft => "bottom-left",
            Self::BottomRight => "bottom-right",
        };
        write!(f, "{s}")
    }
}

/// Shop styling, resolved once per drawer open and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThemeConfig {
    pub icon_color: String,
    pub icon_size: f32,
    pub position: IconPosition,
    pub offset_x: f32,
    pub offset_y: f32,
    pub block_kind: Option<BlockKind>,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            icon_color: "#000000".to_string(),
            icon_size: 24.0,
            position: IconPosition::default(),
            offset_x: 20.0,
            offset_y: 20.0,
            block_kind: None,
        }
    }
}

/// Raw inputs the theme is read from.
#[derive(Debug, Clone, Default)]
pub struct ThemeSource {
    /// The `VISUAL_SEARCH_CONFIG` JSON injected for the shop.
    pub injected_json: Option<String>,
    /// Value of the `data-visual-search-block` attribute.
    pub block_attribute: Option<String>,
    /// Computed `--vs-*` custom properties of the block element.
    pub css_properties: HashMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct InjectedConfig {
    icon_color: Option<String>,
    icon_size: Option<f32>,
    icon_position: Option<String>,
    offset_x: Option<f32>,
    offset_y: Option<f32>,
}

impl ThemeConfig {
    /// Resolve the theme: CSS properties win over the injected config, which
    /// wins over defaults. Unreadable values are logged and skipped.
    pub fn read(source: &ThemeSource) -> Self {
        let mut theme = Self::default();

        if let Some(json) = source.injected_json.as_deref() {
            match serde_json::from_str::<InjectedConfig>(json) {
                Ok(cfg) => theme.apply_injected(cfg),
                Err(e) => warn!("Ignoring unreadable VISUAL_SEARCH_CONFIG: {}", e),
            }
        }

        theme.apply_css(&source.css_properties);

        if let Some(attr) = source.block_attribute.as_deref() {
            match attr.parse() {
                Ok(kind) => theme.block_kind = Some(kind),
                Err(e) => warn!("{}", e),
            }
        }

        theme
    }

    fn apply_injected(&mut self, cfg: InjectedConfig) {
        if let Some(color) = cfg.icon_color.filter(|c| !c.trim().is_empty()) {
            self.icon_color = color;
        }
        if let Some(size) = cfg.icon_size.filter(|s| *s > 0.0) {
            self.icon_size = size;
        }
        if let Some(pos) = cfg.icon_position {
            match pos.parse() {
                Ok(p) => self.position = p,
                Err(e) => warn!("{}", e),
            }
        }
        if let Some(x) = cfg.offset_x {
            self.offset_x = x;
        }
        if let Some(y) = cfg.offset_y {
            self.offset_y = y;
        }
    }

    fn apply_css(&mut self, props: &HashMap<String, String>) {
        if let Some(color) = props
            .get("--vs-icon-color")
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
        {
            self.icon_color = color.to_string();
        }
        if let Some(v) = props.get("--vs-icon-size") {
            match parse_px(v) {
                Some(size) if size > 0.0 => self.icon_size = size,
                _ => warn!("Ignoring --vs-icon-size: {}", v),
            }
        }
        if let Some(v) = props.get("--vs-icon-position") {
            match v.parse() {
                Ok(p) => self.position = p,
                Err(e) => warn!("{}", e),
            }
        }
        if let Some(v) = props.get("--vs-offset-x") {
            match parse_px(v) {
                Some(x) => self.offset_x = x,
                None => warn!("Ignoring --vs-offset-x: {}", v),
            }
        }
        if let Some(v) = props.get("--vs-offset-y") {
            match parse_px(v) {
                Some(y) => self.offset_y = y,
                None => warn!("Ignoring --vs-offset-y: {}", v),
            }
        }
    }
}

/// Parse `"12px"` or `"12"` into a number.
fn parse_px(value: &str) -> Option<f32> {
    let v = value.trim();
    v.strip_suffix("px").unwrap_or(v).trim().parse().ok()
}
