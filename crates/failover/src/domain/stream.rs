use serde::{Deserialize, Serialize};
use std::fmt;

/// A single candidate endpoint for a match.
///
/// Produced by the metadata collaborator and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Stream {
    /// Plain playable url.
    pub url: String,
    /// Embed url, preferred over `url` when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed_url: Option<String>,
    /// Language tag, e.g. "en".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Free-form quality tag, e.g. "HD" or "720p".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    /// Source label of the provider that served this stream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Stream {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_embed_url(mut self, embed_url: impl Into<String>) -> Self {
        self.embed_url = Some(embed_url.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = Some(quality.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// The url a player should mount: the embed url when non-empty, else the plain url.
    pub fn playable_url(&self) -> &str {
        match self.embed_url.as_deref() {
            Some(embed) if !embed.is_empty() => embed,
            _ => &self.url,
        }
    }

    /// Source label, `"unknown"` when the collaborator did not provide one.
    pub fn source_label(&self) -> &str {
        match self.source.as_deref() {
            Some(source) if !source.is_empty() => source,
            _ => "unknown",
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source_label())?;
        if let Some(language) = &self.language {
            write!(f, " [{}]", language)?;
        }
        if let Some(quality) = &self.quality {
            write!(f, " {}", quality)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playable_url_prefers_embed() {
        let stream = Stream::new("https://a/plain").with_embed_url("https://a/embed");
        assert_eq!(stream.playable_url(), "https://a/embed");
    }

    #[test]
    fn test_playable_url_ignores_empty_embed() {
        let stream = Stream::new("https://a/plain").with_embed_url("");
        assert_eq!(stream.playable_url(), "https://a/plain");
    }

    #[test]
    fn test_source_label_defaults_to_unknown() {
        assert_eq!(Stream::new("u").source_label(), "unknown");
        assert_eq!(Stream::new("u").with_source("alpha").source_label(), "alpha");
    }

    #[test]
    fn test_display() {
        let stream = Stream::new("u")
            .with_source("alpha")
            .with_language("en")
            .with_quality("HD");
        assert_eq!(stream.to_string(), "alpha [en] HD");
    }

    #[test]
    fn test_deserialize_camel_case() {
        let stream: Stream =
            serde_json::from_str(r#"{"url":"u","embedUrl":"e","language":"en"}"#).unwrap();
        assert_eq!(stream.embed_url.as_deref(), Some("e"));
        assert_eq!(stream.quality, None);
    }
}
