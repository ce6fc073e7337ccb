use std::collections::HashMap;

use log::warn;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{AuthCode, Result, VisualSearchError};
use crate::geometry::NormalizedBox;

/// A product returned by the detection API.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Product {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    #[serde(alias = "image_url", alias = "imageUrl")]
    pub image: Option<String>,
    #[serde(deserialize_with = "price")]
    pub price: f64,
    pub currency: Option<String>,
    pub handle: String,
    pub vendor: Option<String>,
    pub available: bool,
    pub variants: Vec<Variant>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Variant {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    #[serde(deserialize_with = "price")]
    pub price: f64,
    pub available: bool,
}

/// One candidate item found in the uploaded image.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub box_id: String,
    pub bbox: NormalizedBox,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DetectionResponse {
    pub products: Vec<Product>,
    pub largest_bounding_box_id: Option<String>,
    pub detections: Vec<Detection>,
}

impl DetectionResponse {
    /// The detection to highlight first: the largest box if the API named one
    /// that exists, otherwise the first detection.
    pub fn initial_selection(&self) -> Option<&str> {
        self.largest_bounding_box_id
            .as_deref()
            .filter(|id| self.detections.iter().any(|d| d.box_id == *id))
            .or_else(|| self.detections.first().map(|d| d.box_id.as_str()))
    }
}

/// Parse a successful detection response body.
///
/// The body may be a bare product array, `{products: [...]}` or
/// `{detectedItems: [...]}`, with optional box metadata alongside.
pub fn parse_detection_response(body: &[u8]) -> Result<DetectionResponse> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| VisualSearchError::InvalidResponse(format!("body is not JSON: {e}")))?;

    match value {
        Value::Array(items) => Ok(DetectionResponse {
            products: parse_products(items),
            ..Default::default()
        }),
        Value::Object(mut obj) => {
            let items = match obj.remove("products").or_else(|| obj.remove("detectedItems")) {
                Some(Value::Array(items)) => items,
                Some(Value::Null) | None => Vec::new(),
                Some(other) => {
                    return Err(VisualSearchError::InvalidResponse(format!(
                        "expected product array, got {other}"
                    )));
                }
            };

            let largest_bounding_box_id = obj
                .get("largest_bounding_box_id")
                .and_then(value_as_id);

            let labels = obj
                .get("labels")
                .map(parse_labels)
                .unwrap_or_default();

            let detections = obj
                .get("all_bounding_box")
                .map(|boxes| parse_boxes(boxes, &labels))
                .unwrap_or_default();

            Ok(DetectionResponse {
                products: parse_products(items),
                largest_bounding_box_id,
                detections,
            })
        }
        other => Err(VisualSearchError::InvalidResponse(format!(
            "unexpected top-level value: {other}"
        ))),
    }
}

/// Map a non-success response to an error, recognizing the auth codes on 401.
pub fn classify_failure(status: u16, body: &str) -> VisualSearchError {
    if status == 401 {
        let code = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v.get("code").and_then(Value::as_str).and_then(AuthCode::from_code));
        if let Some(code) = code {
            return VisualSearchError::Auth(code);
        }
    }
    VisualSearchError::Api {
        status,
        body: body.to_string(),
    }
}

fn parse_products(items: Vec<Value>) -> Vec<Product> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<Product>(item) {
            Ok(p) => Some(p),
            Err(e) => {
                warn!("Skipping malformed product: {}", e);
                None
            }
        })
        .collect()
}

fn parse_labels(value: &Value) -> HashMap<String, String> {
    let mut labels = HashMap::new();
    if let Some(entries) = value.as_array() {
        for entry in entries {
            if let Some(obj) = entry.as_object() {
                for (id, text) in obj {
                    if let Some(text) = text.as_str() {
                        labels.insert(id.clone(), text.to_string());
                    }
                }
            }
        }
    }
    labels
}

fn parse_boxes(value: &Value, labels: &HashMap<String, String>) -> Vec<Detection> {
    let mut detections = Vec::new();
    let Some(entries) = value.as_array() else {
        warn!("all_bounding_box is not an array, ignoring");
        return detections;
    };

    for entry in entries {
        let Some(obj) = entry.as_object() else {
            continue;
        };
        for (id, coords) in obj {
            let bbox = coords
                .as_array()
                .filter(|c| c.len() == 4)
                .and_then(|c| {
                    let mut out = [0f32; 4];
                    for (slot, v) in out.iter_mut().zip(c) {
                        *slot = v.as_f64()? as f32;
                    }
                    Some(out)
                })
                .and_then(NormalizedBox::from_coords);

            match bbox {
                Some(bbox) => detections.push(Detection {
                    box_id: id.clone(),
                    bbox,
                    label: labels.get(id).cloned(),
                }),
                None => warn!("Dropping invalid bounding box {}: {}", id, coords),
            }
        }
    }
    detections
}

fn value_as_id(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    let v = Value::deserialize(d)?;
    Ok(value_as_id(&v).unwrap_or_default())
}

fn price<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<f64, D::Error> {
    let v = Value::deserialize(d)?;
    Ok(match v {
        Value::Number(n) => n.as_f64().unwrap_or_default(),
        Value::String(s) => s.trim().parse().unwrap_or_default(),
        _ => 0.0,
    })
}
