//! services/api/src/adapters/extraction/mod.rs
//!
//! The content extractor: classifies a URL as a video or a generic web page and
//! dispatches to the matching strategy. Implements the `ContentExtractor` port.

pub mod video;
pub mod web_page;

use async_trait::async_trait;
use idea_farm_core::ports::{ContentExtractor, ExtractionFailure};
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

use self::{video::TranscriptFetcher, web_page::WebPageExtractor};

/// What a URL points at.
#[derive(Debug, PartialEq, Eq)]
pub enum ContentReference {
    Video(String),
    WebPage(Url),
}

/// Adds `https://` to scheme-less input, then classifies it.
pub fn classify(reference: &str) -> Result<ContentReference, ExtractionFailure> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return Err(ExtractionFailure::InvalidUrl(reference.to_string()));
    }
    let normalized = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let url = Url::parse(&normalized)
        .map_err(|_| ExtractionFailure::InvalidUrl(reference.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ExtractionFailure::InvalidUrl(reference.to_string()));
    }

    Ok(match video::video_id(&url) {
        Some(id) => ContentReference::Video(id),
        None => ContentReference::WebPage(url),
    })
}

pub struct UrlContentExtractor {
    web: WebPageExtractor,
    video: TranscriptFetcher,
}

impl UrlContentExtractor {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let transcript_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(web_page::BROWSER_USER_AGENT)
            .build()?;
        Ok(Self {
            web: WebPageExtractor::new(timeout)?,
            video: TranscriptFetcher::new(transcript_client),
        })
    }
}

#[async_trait]
impl ContentExtractor for UrlContentExtractor {
    async fn extract(&self, reference: &str) -> Result<String, ExtractionFailure> {
        let result = match classify(reference)? {
            ContentReference::Video(video_id) => {
                info!(video_id = %video_id, "Detected YouTube video");
                self.video.fetch_transcript(&video_id).await
            }
            ContentReference::WebPage(url) => {
                info!(url = %url, "Extracting web page");
                self.web.extract(url.as_str()).await
            }
        };
        if let Err(e) = &result {
            warn!(reference = %reference, "Extraction failed: {}", e);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_videos_and_pages() {
        assert_eq!(
            classify("https://youtu.be/dQw4w9WgXcQ").unwrap(),
            ContentReference::Video("dQw4w9WgXcQ".to_string())
        );
        match classify("example.com/post").unwrap() {
            ContentReference::WebPage(url) => assert_eq!(url.as_str(), "https://example.com/post"),
            other => panic!("expected a web page, got {:?}", other),
        }
    }

    #[test]
    fn rejects_unusable_references() {
        assert!(matches!(classify(""), Err(ExtractionFailure::InvalidUrl(_))));
        assert!(matches!(
            classify("ftp://example.com/file"),
            Err(ExtractionFailure::InvalidUrl(_))
        ));
        assert!(matches!(
            classify("not a url at all"),
            Err(ExtractionFailure::InvalidUrl(_))
        ));
    }
}
