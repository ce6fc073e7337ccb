use chrono::{DateTime, Utc};
use log::debug;
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinHandle;
use url::Url;

use crate::{config::ClientConfig, constants::{BEACON_PATH, DEFAULT_USER_AGENT}};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Beacon {
    pub shop: String,
    pub action: String,
    pub url: String,
    pub user_agent: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: Value,
}

/// Fire-and-forget tracking to the admin app. Failures never reach the caller.
#[derive(Debug, Clone)]
pub struct AnalyticsSink {
    client: Option<reqwest::Client>,
    endpoint: Option<Url>,
    shop: String,
}

impl AnalyticsSink {
    pub fn new(client: reqwest::Client, config: &ClientConfig) -> Self {
        let endpoint = config
            .admin_origin
            .as_ref()
            .and_then(|origin| origin.join(BEACON_PATH).ok());
        Self {
            client: Some(client),
            endpoint,
            shop: config.shop_domain.clone(),
        }
    }

    pub fn disabled() -> Self {
        Self {
            client: None,
            endpoint: None,
            shop: String::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some() && self.endpoint.is_some()
    }

    pub fn beacon(&self, action: &str, url: &str, metadata: Value) -> Beacon {
        Beacon {
            shop: self.shop.clone(),
            action: action.to_string(),
            url: url.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timestamp: Utc::now(),
            metadata,
        }
    }

    /// Send a beacon on a background task. Must be called inside a tokio runtime.
    pub fn track(&self, action: &str, url: &str, metadata: Value) -> Option<JoinHandle<()>> {
        let client = self.client.clone()?;
        let endpoint = self.endpoint.clone()?;
        let beacon = self.beacon(action, url, metadata);

        Some(tokio::spawn(async move {
            match client.post(endpoint).json(&beacon).send().await {
                Ok(resp) => debug!("Beacon {} -> {}", beacon.action, resp.status()),
                Err(e) => debug!("Beacon {} failed: {}", beacon.action, e),
            }
        }))
    }
}
