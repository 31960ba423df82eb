//! Utility endpoints.
//!
//! Each utility takes an already validated [`TypedPayload`] and returns a
//! serializable body. CPU-heavy work runs on the blocking pool; the only
//! network I/O (the word counter's fetch) runs under a deadline.

pub mod error;
pub mod image;
pub mod markdown;
pub mod qr;
pub mod regex_tester;
pub mod summarize;
pub mod word_count;

use std::time::Duration;

use serde::Serialize;

use crate::config::VaultConfig;
use crate::resilience::with_deadline;
use crate::validation::TypedPayload;

pub use error::UtilityError;
pub use word_count::PageFetcher;

/// Response body of any utility.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum UtilityOutput {
    Html(markdown::HtmlOutput),
    Qr(qr::QrOutput),
    Image(image::ImageEncoding),
    Regex(regex_tester::RegexMatches),
    WordCount(word_count::PageReport),
    Summary(summarize::Summary),
}

#[derive(Debug, Clone)]
pub struct Toolkit {
    fetcher: PageFetcher,
    upstream_deadline: Duration,
    regex_deadline: Duration,
}

impl Toolkit {
    pub fn new(config: &VaultConfig) -> Result<Self, UtilityError> {
        Ok(Self {
            fetcher: PageFetcher::new(&config.fetch, &config.timeouts)?,
            upstream_deadline: Duration::from_secs(config.timeouts.upstream_secs),
            regex_deadline: Duration::from_millis(config.timeouts.regex_millis),
        })
    }

    pub async fn execute(&self, payload: TypedPayload) -> Result<UtilityOutput, UtilityError> {
        match payload {
            TypedPayload::Markdown { markdown_text } => {
                markdown::render(&markdown_text).map(UtilityOutput::Html)
            }
            TypedPayload::QrCode { data, box_size, border, error_correction } => {
                tokio::task::spawn_blocking(move || qr::generate(&data, box_size, border, &error_correction))
                    .await?
                    .map(UtilityOutput::Qr)
            }
            TypedPayload::Image(file) => Ok(UtilityOutput::Image(image::encode(file))),
            TypedPayload::Regex { pattern, text } => regex_tester::run(pattern, text, self.regex_deadline)
                .await
                .map(UtilityOutput::Regex),
            TypedPayload::WordCount { url } => {
                with_deadline(self.upstream_deadline, word_count::count_words(&self.fetcher, &url))
                    .await?
                    .map(UtilityOutput::WordCount)
            }
            TypedPayload::Summarize { text, sentence_count } => {
                tokio::task::spawn_blocking(move || summarize::summarize(&text, sentence_count))
                    .await
                    .map(UtilityOutput::Summary)
                    .map_err(UtilityError::from)
            }
        }
    }
}
