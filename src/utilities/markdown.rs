//! Markdown rendering.

use markdown::{to_html_with_options, Options};
use serde::Serialize;

use crate::utilities::error::UtilityError;

#[derive(Debug, Clone, Serialize)]
pub struct HtmlOutput {
    pub html_content: String,
}

/// Render GitHub-flavoured markdown. Raw HTML in the input is escaped.
pub fn render(markdown_text: &str) -> Result<HtmlOutput, UtilityError> {
    let html_content = to_html_with_options(markdown_text, &Options::gfm())
        .map_err(|e| UtilityError::Internal(format!("markdown rendering failed: {e}")))?;
    Ok(HtmlOutput { html_content })
}
