//! Generic web page extraction: browser-like fetch with one fallback attempt,
//! then main-content text extraction with `scraper`.

use idea_farm_core::ports::ExtractionFailure;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER};
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Browser-like User-Agent to get past trivial bot filters.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const FALLBACK_USER_AGENT: &str = "Mozilla/5.0 (compatible; IdeaFarm/0.1; +https://github.com/idea-farm)";

const FALLBACK_TIMEOUT: Duration = Duration::from_secs(30);
/// Bytes of a page body read before the rest is discarded.
pub const MAX_PAGE_BYTES: usize = 5 * 1024 * 1024;

/// Candidate containers for the main content, most specific first.
const CONTENT_ROOTS: &[&str] = &[
    "article",
    "main",
    "[role='main']",
    "#content",
    "#main",
    ".post-content",
    ".entry-content",
    ".article-body",
    ".content",
];

const BLOCK_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "li", "blockquote", "pre", "td",
];

const SKIPPED_TAGS: &[&str] = &[
    "nav", "header", "footer", "aside", "form", "script", "style", "noscript", "iframe",
    "svg", "button", "template",
];

/// Class/id fragments that mark boilerplate anywhere inside a token.
const SKIPPED_FRAGMENTS: &[&str] = &[
    "comment", "advert", "sidebar", "cookie", "newsletter", "promo", "breadcrumb",
];

/// Class/id tokens that mark boilerplate only as whole tokens.
const SKIPPED_TOKENS: &[&str] = &[
    "ad", "ads", "menu", "nav", "navbar", "share", "social", "related",
];

pub struct WebPageExtractor {
    primary: reqwest::Client,
    fallback: reqwest::Client,
}

impl WebPageExtractor {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
        headers.insert(REFERER, HeaderValue::from_static("https://www.google.com/"));

        let primary = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        // Second attempt: plain identification, longer timeout, more redirects.
        let fallback = reqwest::Client::builder()
            .timeout(FALLBACK_TIMEOUT)
            .user_agent(FALLBACK_USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self { primary, fallback })
    }

    async fn fetch_with(client: &reqwest::Client, url: &str) -> Result<String, reqwest::Error> {
        let mut response = client.get(url).send().await?.error_for_status()?;
        debug!(url = %url, status = %response.status(), "Fetched page");
        if response
            .content_length()
            .is_some_and(|len| len > MAX_PAGE_BYTES as u64)
        {
            warn!(url = %url, "Page body exceeds {} bytes; truncating", MAX_PAGE_BYTES);
        }

        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            let room = MAX_PAGE_BYTES - body.len();
            if chunk.len() >= room {
                body.extend_from_slice(&chunk[..room]);
                break;
            }
            body.extend_from_slice(&chunk);
        }
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    /// Downloads the page, retrying once through the fallback client on any error.
    pub async fn fetch(&self, url: &str) -> Result<String, ExtractionFailure> {
        match Self::fetch_with(&self.primary, url).await {
            Ok(html) => Ok(html),
            Err(e) => {
                warn!(url = %url, "Primary fetch failed: {}. Retrying with fallback fetcher...", e);
                Self::fetch_with(&self.fallback, url)
                    .await
                    .map_err(|e| ExtractionFailure::Fetch(e.to_string()))
            }
        }
    }

    pub async fn extract(&self, url: &str) -> Result<String, ExtractionFailure> {
        let html = self.fetch(url).await?;
        if html.trim().is_empty() {
            return Err(ExtractionFailure::Fetch("empty response body".to_string()));
        }
        info!(url = %url, bytes = html.len(), "Downloaded page");

        let text = extract_main_text(&html).ok_or(ExtractionFailure::Empty)?;
        let preview: String = text.chars().take(500).collect();
        info!(url = %url, chars = text.chars().count(), "Extracted text preview: {}", preview);
        Ok(text)
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn marks_boilerplate(attr: Option<&str>) -> bool {
    attr.map(|value| {
        value.split_whitespace().any(|token| {
            let token = token.to_ascii_lowercase();
            SKIPPED_TOKENS.contains(&token.as_str())
                || SKIPPED_FRAGMENTS.iter().any(|f| token.contains(f))
        })
    })
    .unwrap_or(false)
}

fn is_skipped(element: ElementRef) -> bool {
    let value = element.value();
    SKIPPED_TAGS.contains(&value.name())
        || marks_boilerplate(value.attr("class"))
        || marks_boilerplate(value.id())
}

fn is_block(element: ElementRef) -> bool {
    BLOCK_TAGS.contains(&element.value().name())
}

/// Ancestors of `element` strictly below `root`.
fn ancestors_within<'a>(
    element: ElementRef<'a>,
    root: ElementRef<'a>,
) -> impl Iterator<Item = ElementRef<'a>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .take_while(move |ancestor| ancestor.id() != root.id())
}

/// Text of every top-level block element under `root`, skipping boilerplate subtrees.
fn block_texts(root: ElementRef, blocks: &Selector) -> Vec<String> {
    root.select(blocks)
        .filter(|block| !is_skipped(*block))
        .filter(|block| {
            !ancestors_within(*block, root).any(|ancestor| is_skipped(ancestor) || is_block(ancestor))
        })
        .map(|block| collapse_whitespace(&block.text().collect::<String>()))
        .filter(|text| !text.is_empty())
        .collect()
}

/// All text under `root` outside boilerplate, for pages without block markup.
fn loose_text(root: ElementRef) -> String {
    let mut parts = Vec::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let inside_boilerplate = node
            .ancestors()
            .filter_map(ElementRef::wrap)
            .take_while(|ancestor| ancestor.id() != root.id())
            .any(is_skipped);
        if !inside_boilerplate && !text.trim().is_empty() {
            parts.push(text.trim().to_string());
        }
    }
    collapse_whitespace(&parts.join(" "))
}

/// Extracts the main readable text of an HTML page, or `None` if nothing is left.
pub fn extract_main_text(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let blocks = Selector::parse(&BLOCK_TAGS.join(", ")).ok()?;
    let body = Selector::parse("body").ok()?;

    let candidates: Vec<ElementRef> = CONTENT_ROOTS
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .filter_map(|selector| document.select(&selector).next())
        .filter(|root| !is_skipped(*root))
        .chain(document.select(&body).next())
        .collect();

    for root in &candidates {
        let texts = block_texts(*root, &blocks);
        if !texts.is_empty() {
            return Some(texts.join("\n\n"));
        }
    }

    candidates
        .last()
        .map(|root| loose_text(*root))
        .or_else(|| Some(loose_text(document.root_element())))
        .filter(|text| !text.is_empty())
}
