use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const GIPHY_API_BASE: &str = "https://api.giphy.com";

#[derive(Error, Debug)]
pub enum GiphyError {
    #[error("Giphy returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Unexpected response shape: {0}")]
    Malformed(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, GiphyError>;

pub struct GiphyClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GiphyClient {
    pub fn new(api_key: String) -> Result<Self> {
        Self::with_base_url(api_key, GIPHY_API_BASE.to_string())
    }

    /// Point the client at a different host (proxies, test servers)
    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("Grippy/0.1.0"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Search GIFs. One request, no retries.
    pub async fn search(&self, query: &str, limit: u32, offset: u32) -> Result<GiphySearchResponse> {
        let url = format!("{}/v1/gifs/search", self.base_url);
        let params = search_params(&self.api_key, query, limit, offset);

        debug!("GET {} q={} limit={} offset={}", url, query, limit, offset);

        let response = self.client.get(&url).query(&params).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        parse_search_response(status, &body)
    }
}

/// Query string for the search endpoint
pub fn search_params(api_key: &str, query: &str, limit: u32, offset: u32) -> Vec<(&'static str, String)> {
    vec![
        ("api_key", api_key.to_string()),
        ("q", query.to_string()),
        ("limit", limit.to_string()),
        ("offset", offset.to_string()),
    ]
}

/// Validate a search response body before anything downstream touches it.
///
/// The provider reports failures two ways: an HTTP error status, or a 200 with
/// `meta.status` set to something else. Both become `GiphyError::Status`.
/// Bodies that parse but lack `data` or `pagination` are `Malformed`.
pub fn parse_search_response(http_status: u16, body: &str) -> Result<GiphySearchResponse> {
    let envelope: RawEnvelope = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(e) => {
            if !(200..300).contains(&http_status) {
                return Err(GiphyError::Status {
                    status: http_status,
                    message: body.chars().take(200).collect(),
                });
            }
            return Err(GiphyError::Malformed(e.to_string()));
        }
    };

    if let Some(meta) = &envelope.meta {
        if meta.status != 200 {
            return Err(GiphyError::Status {
                status: meta.status,
                message: meta.msg.clone(),
            });
        }
    }

    if !(200..300).contains(&http_status) {
        return Err(GiphyError::Status {
            status: http_status,
            message: envelope.meta.map(|m| m.msg).unwrap_or_default(),
        });
    }

    let data = envelope
        .data
        .ok_or_else(|| GiphyError::Malformed("missing `data` array".into()))?;
    let pagination = envelope
        .pagination
        .ok_or_else(|| GiphyError::Malformed("missing `pagination` object".into()))?;

    Ok(GiphySearchResponse { data, pagination })
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    data: Option<Vec<GiphyGif>>,
    pagination: Option<GiphyPagination>,
    meta: Option<GiphyMeta>,
}

#[derive(Debug, Deserialize)]
struct GiphyMeta {
    status: u16,
    #[serde(default)]
    msg: String,
}

/// Validated search response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiphySearchResponse {
    pub data: Vec<GiphyGif>,
    pub pagination: GiphyPagination,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiphyGif {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub images: GiphyImages,
}

/// Renditions vary per GIF; any of them may be missing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GiphyImages {
    #[serde(default)]
    pub fixed_width: Option<GiphyRendition>,
}

impl GiphyGif {
    pub fn preview_url(&self) -> Option<&str> {
        self.images.fixed_width.as_ref().map(|r| r.url.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiphyRendition {
    pub url: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GiphyPagination {
    pub total_count: u32,
    pub count: u32,
    pub offset: u32,
}
