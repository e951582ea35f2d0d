//! Link preview metadata extraction
//!
//! Best-effort fetcher for og: tags and platform detection. Failures
//! never propagate: a fetch that errors, times out, or returns non-HTML
//! degrades to a generic preview. Used only on the plain item-create
//! path, never inside a sync transaction.

use std::time::Duration;

use lol_html::{element, rewrite_str, RewriteStrSettings};
use serde::{Deserialize, Serialize};

use crate::config::MetadataConfig;

/// Extracted preview for a URL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkPreview {
    pub url: String,
    pub platform: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
}

impl LinkPreview {
    /// Fallback preview when extraction fails
    fn generic(url: &str) -> Self {
        Self {
            url: url.to_string(),
            platform: detect_platform(url).to_string(),
            title: None,
            description: None,
            thumbnail_url: None,
        }
    }
}

/// Fetches preview metadata with a bounded timeout
#[derive(Clone)]
pub struct LinkPreviewFetcher {
    client: reqwest::Client,
}

impl LinkPreviewFetcher {
    pub fn new(config: &MetadataConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { client }
    }

    /// Fetch a preview, degrading to a generic fallback on any failure
    pub async fn fetch(&self, url: &str) -> LinkPreview {
        match self.try_fetch(url).await {
            Ok(preview) => preview,
            Err(e) => {
                tracing::debug!("Preview fetch failed for {}: {}", url, e);
                LinkPreview::generic(url)
            }
        }
    }

    async fn try_fetch(&self, url: &str) -> anyhow::Result<LinkPreview> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("unexpected status {}", response.status());
        }

        let html = response.text().await?;
        let tags = extract_og_tags(&html)?;

        Ok(LinkPreview {
            url: url.to_string(),
            platform: detect_platform(url).to_string(),
            title: tags.title,
            description: tags.description,
            thumbnail_url: tags.image,
        })
    }
}

#[derive(Debug, Default)]
struct OgTags {
    title: Option<String>,
    description: Option<String>,
    image: Option<String>,
}

/// Pull og:title / og:description / og:image out of an HTML document
fn extract_og_tags(html: &str) -> anyhow::Result<OgTags> {
    let mut tags = OgTags::default();

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("meta", |el| {
                if let Some(property) = el.get_attribute("property") {
                    let content = el.get_attribute("content");
                    match property.as_str() {
                        "og:title" => tags.title = content,
                        "og:description" => tags.description = content,
                        "og:image" => tags.image = content,
                        _ => {}
                    }
                }
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    )?;

    Ok(tags)
}

/// Identify the platform a link points at from its URL
pub fn detect_platform(url: &str) -> &'static str {
    if url.contains("instagram.com") {
        "instagram"
    } else if url.contains("tiktok.com") {
        "tiktok"
    } else if url.contains("youtube.com") || url.contains("youtu.be") {
        "youtube"
    } else if url.contains("pinterest.com") {
        "pinterest"
    } else if url.contains("twitter.com") || url.contains("x.com") {
        "twitter"
    } else {
        "generic"
    }
}
