use thiserror::Error;

pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("invalid base url {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl CatalogError {
    pub fn invalid_base_url(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidBaseUrl {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}
