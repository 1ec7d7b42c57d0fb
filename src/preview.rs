// Fetch a page and pull its social-preview metadata out.

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("invalid url '{0}'")]
    InvalidUrl(String),

    #[error("fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),
}

/// Metadata extracted for one URL. Every field except `url` is best-effort.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkPreview {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub url: String,
}

impl LinkPreview {
    /// A preview that carries only the source URL.
    pub fn bare(url: &str) -> Self {
        Self {
            url: url.to_string(),
            ..Default::default()
        }
    }
}

// --- Extraction ---

fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

static OG_TITLE: LazyLock<Selector> = LazyLock::new(|| selector(r#"meta[property="og:title"]"#));
static OG_DESCRIPTION: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"meta[property="og:description"]"#));
static OG_IMAGE: LazyLock<Selector> = LazyLock::new(|| selector(r#"meta[property="og:image"]"#));
static META_DESCRIPTION: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"meta[name="description"]"#));
static TITLE: LazyLock<Selector> = LazyLock::new(|| selector("title"));

// Content of the first element matching `sel`; an empty attribute counts as absent.
fn meta_content(doc: &Html, sel: &Selector) -> Option<String> {
    doc.select(sel)
        .next()
        .and_then(|el| el.value().attr("content"))
        .filter(|content| !content.is_empty())
        .map(str::to_string)
}

fn title_text(doc: &Html) -> Option<String> {
    let text: String = doc.select(&TITLE).next()?.text().collect();
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Extract title, description and image from `html`.
///
/// - title: `og:title` content, else the text of the document `<title>`
/// - description: `og:description` content, else `<meta name="description">`
/// - image: `og:image` content
pub fn extract_metadata(html: &str, url: &str) -> LinkPreview {
    let doc = Html::parse_document(html);

    LinkPreview {
        title: meta_content(&doc, &OG_TITLE).or_else(|| title_text(&doc)),
        description: meta_content(&doc, &OG_DESCRIPTION)
            .or_else(|| meta_content(&doc, &META_DESCRIPTION)),
        image: meta_content(&doc, &OG_IMAGE),
        url: url.to_string(),
    }
}

// --- Fetching ---

/// Outbound fetch plus extraction. One GET per call, no retries and no caching.
#[derive(Debug, Clone)]
pub struct LinkPreviewService {
    client: reqwest::Client,
}

impl LinkPreviewService {
    /// `timeout` of `None` keeps the HTTP client's defaults.
    pub fn new(timeout: Option<Duration>) -> Result<Self, PreviewError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    pub async fn fetch(&self, url: &str) -> Result<LinkPreview, PreviewError> {
        let parsed = Url::parse(url).map_err(|e| PreviewError::InvalidUrl(format!("{url}: {e}")))?;

        // The status code is not inspected: error pages still carry metadata.
        let response = self.client.get(parsed).send().await?;
        let status = response.status();
        let body = response.text().await?;
        tracing::debug!(%url, %status, bytes = body.len(), "fetched preview page");

        Ok(extract_metadata(&body, url))
    }
}
