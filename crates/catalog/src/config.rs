use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://streamed.pk/api";

/// Catalog client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// API root, without a trailing slash.
    pub base_url: String,
    /// Request timeout in seconds; 0 disables it.
    pub timeout_secs: u64,
    /// Overrides the default browser user agent.
    pub user_agent: Option<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 10,
            user_agent: None,
        }
    }
}

impl CatalogConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Merge another config into this one, with the other config taking precedence.
    pub fn merge(&self, other: &Self) -> Self {
        let defaults = Self::default();
        Self {
            base_url: if other.base_url != defaults.base_url {
                other.base_url.clone()
            } else {
                self.base_url.clone()
            },
            timeout_secs: if other.timeout_secs != defaults.timeout_secs {
                other.timeout_secs
            } else {
                self.timeout_secs
            },
            user_agent: other.user_agent.clone().or_else(|| self.user_agent.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_prefers_explicit_values() {
        let base = CatalogConfig {
            base_url: "http://local/api".to_string(),
            timeout_secs: 3,
            user_agent: Some("base".to_string()),
        };
        let merged = base.merge(&CatalogConfig {
            timeout_secs: 20,
            ..Default::default()
        });
        assert_eq!(merged.base_url, "http://local/api");
        assert_eq!(merged.timeout_secs, 20);
        assert_eq!(merged.user_agent.as_deref(), Some("base"));
    }
}
