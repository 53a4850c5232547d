//! Client for the Helium blockchain API.

use crate::source::ChainSource;
use async_trait::async_trait;
use heartbeat_core::config::ApiConfig;
use heartbeat_core::{FetchError, Hotspot};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

/// Hard stop for cursor loops on the wallet listing.
const MAX_LISTING_PAGES: usize = 100;

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
    #[serde(default)]
    cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiHotspot {
    address: String,
    name: String,
    #[serde(default)]
    block: Option<u64>,
    #[serde(default)]
    status: Option<ApiHotspotStatus>,
}

#[derive(Debug, Deserialize)]
struct ApiHotspotStatus {
    #[serde(default)]
    listen_addrs: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct ActivityRecord {
    #[serde(default)]
    height: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct HeightResponse {
    data: HeightData,
}

#[derive(Debug, Deserialize)]
struct HeightData {
    height: u64,
}

impl From<ApiHotspot> for Hotspot {
    fn from(api: ApiHotspot) -> Self {
        let listen_addr = api
            .status
            .and_then(|s| s.listen_addrs)
            .and_then(|addrs| addrs.into_iter().next());
        Hotspot {
            address: api.address,
            name: api.name,
            block: api.block,
            listen_addr,
        }
    }
}

#[derive(Clone)]
pub struct HeliumClient {
    base_url: String,
    http_client: reqwest::Client,
    timeout_secs: u64,
    activity_max_pages: usize,
    max_listing_pages: usize,
}

impl HeliumClient {
    pub fn new(config: &ApiConfig) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("heartbeat/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http_client,
            timeout_secs: config.timeout_secs,
            activity_max_pages: config.activity_max_pages.max(1),
            max_listing_pages: MAX_LISTING_PAGES,
        })
    }

    fn request_error(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.timeout_secs)
        } else {
            FetchError::Http(e)
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        cursor: Option<&str>,
    ) -> Result<T, FetchError> {
        let mut request = self.http_client.get(url);
        if let Some(cursor) = cursor {
            request = request.query(&[("cursor", cursor)]);
        }

        let response = request.send().await.map_err(|e| self.request_error(e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| self.request_error(e))?;
        serde_json::from_str(&body).map_err(|e| FetchError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl ChainSource for HeliumClient {
    async fn wallet_hotspots(&self, wallet: &str) -> Result<Vec<Hotspot>, FetchError> {
        let url = format!("{}/v1/accounts/{}/hotspots", self.base_url, wallet);
        let mut hotspots = Vec::new();
        let mut cursor = String::new();

        for _ in 0..self.max_listing_pages {
            let page: Page<ApiHotspot> = self.get_json(&url, Some(&cursor)).await?;
            hotspots.extend(page.data.into_iter().map(Hotspot::from));

            match page.cursor {
                Some(next) if !next.is_empty() && next != cursor => cursor = next,
                _ => {
                    debug!(wallet = %wallet, count = hotspots.len(), "Fetched wallet hotspots");
                    return Ok(hotspots);
                }
            }
        }

        // A partial listing would prune the hotspots on the pages never read.
        warn!(
            wallet = %wallet,
            "Hotspot listing still paginating after {} pages",
            self.max_listing_pages
        );
        Err(FetchError::Decode {
            url,
            reason: format!(
                "listing still paginating after {} pages",
                self.max_listing_pages
            ),
        })
    }

    async fn chain_height(&self) -> Result<u64, FetchError> {
        let url = format!("{}/v1/blocks/height", self.base_url);
        let response: HeightResponse = self.get_json(&url, None).await?;
        Ok(response.data.height)
    }

    async fn latest_activity_height(&self, hotspot: &Hotspot) -> Result<Option<u64>, FetchError> {
        let url = format!("{}/v1/hotspots/{}/roles", self.base_url, hotspot.address);
        let mut cursor = String::new();

        // Recent pages are frequently empty, so look a few pages deep for
        // the newest record.
        for _ in 0..self.activity_max_pages {
            let page: Page<ActivityRecord> = self.get_json(&url, Some(&cursor)).await?;
            if let Some(height) = page.data.iter().find_map(|r| r.height) {
                return Ok(Some(height));
            }
            match page.cursor {
                Some(next) if !next.is_empty() && next != cursor => cursor = next,
                _ => break,
            }
        }

        Ok(None)
    }
}
