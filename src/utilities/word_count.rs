//! Webpage fetch and word counting.
//!
//! # Design Decisions
//! - The client resolves names through [`GuardedResolver`] and checks every
//!   redirect against the egress policy
//! - Bodies are read chunk by chunk and abandoned past the byte ceiling,
//!   whether or not the server sent a Content-Length

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use scraper::{Html, Node};
use serde::Serialize;
use url::Url;

use crate::config::{FetchConfig, TimeoutConfig};
use crate::security::egress::{EgressPolicy, GuardedResolver};
use crate::utilities::error::UtilityError;

const EXCLUDED_ELEMENTS: &[&str] = &["script", "style", "nav", "footer", "header", "noscript"];
const MAX_TITLE_CHARS: usize = 200;
const NO_TITLE: &str = "No title found";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PageReport {
    pub url: String,
    pub word_count: usize,
    pub char_count: usize,
    pub title: String,
    pub status_code: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageStats {
    pub word_count: usize,
    pub char_count: usize,
    pub title: String,
}

#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: StatusCode,
    pub body: String,
}

/// HTTP client for user-supplied URLs.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
    max_bytes: usize,
}

impl PageFetcher {
    pub fn new(fetch: &FetchConfig, timeouts: &TimeoutConfig) -> Result<Self, UtilityError> {
        let policy = EgressPolicy::new(fetch.allow_private_networks);
        let timeout = Duration::from_secs(timeouts.upstream_secs);

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(fetch.user_agent.clone())
            .redirect(policy.redirect_policy(fetch.max_redirects))
            .dns_resolver(Arc::new(GuardedResolver::new(policy)))
            .build()
            .map_err(|e| UtilityError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, max_bytes: fetch.max_response_bytes })
    }

    pub async fn fetch(&self, url: &Url) -> Result<FetchedPage, UtilityError> {
        let mut response = self.client.get(url.clone()).send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(UtilityError::Upstream(format!(
                "HTTP error {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        if response.content_length().is_some_and(|len| len > self.max_bytes as u64) {
            return Err(too_large());
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(map_reqwest_error)? {
            if body.len() + chunk.len() > self.max_bytes {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }

        Ok(FetchedPage {
            status,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}

fn too_large() -> UtilityError {
    UtilityError::Upstream("Content too large to process".to_string())
}

fn map_reqwest_error(e: reqwest::Error) -> UtilityError {
    tracing::warn!(error = %e, "Upstream fetch failed");
    if e.is_timeout() {
        UtilityError::UpstreamTimeout
    } else if e.is_redirect() {
        UtilityError::Upstream("Redirect target not allowed".to_string())
    } else if e.is_connect() {
        UtilityError::Upstream("Could not connect to the provided URL".to_string())
    } else {
        UtilityError::Upstream("Could not fetch URL".to_string())
    }
}

/// Count visible words and characters and pull out the title.
pub fn analyze_html(html: &str) -> PageStats {
    let document = Html::parse_document(html);
    let root = document.tree.root();

    let mut words: Vec<&str> = Vec::new();
    let mut title: Option<String> = None;

    for node in root.descendants() {
        match node.value() {
            Node::Text(text) => {
                let hidden = node.ancestors().any(|a| {
                    a.value()
                        .as_element()
                        .is_some_and(|e| EXCLUDED_ELEMENTS.iter().any(|x| *x == e.name()))
                });
                if !hidden {
                    words.extend(text.split_whitespace());
                }
            }
            Node::Element(el) if title.is_none() && el.name() == "title" => {
                let text: String = node
                    .descendants()
                    .filter_map(|n| n.value().as_text().map(|t| &**t))
                    .collect();
                title = Some(text.trim().chars().take(MAX_TITLE_CHARS).collect());
            }
            _ => {}
        }
    }

    let clean = words.join(" ");
    PageStats {
        word_count: words.len(),
        char_count: clean.chars().count(),
        title: title.unwrap_or_else(|| NO_TITLE.to_string()),
    }
}

pub async fn count_words(fetcher: &PageFetcher, url: &Url) -> Result<PageReport, UtilityError> {
    let page = fetcher.fetch(url).await?;
    let stats = analyze_html(&page.body);

    tracing::info!(url = %url, words = stats.word_count, "Word count completed");

    Ok(PageReport {
        url: url.to_string(),
        word_count: stats.word_count,
        char_count: stats.char_count,
        title: stats.title,
        status_code: page.status.as_u16(),
    })
}
