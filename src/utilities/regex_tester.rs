//! Regular expression testing.
//!
//! A pattern with exactly one capture group reports that group's text for
//! each match; any other pattern reports the whole match.

use std::time::Duration;

use regex::Regex;
use serde::Serialize;

use crate::resilience::with_deadline;
use crate::utilities::error::UtilityError;

pub const MAX_MATCHES: usize = 1000;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RegexMatches {
    pub matches: Vec<String>,
    pub match_count: usize,
    pub truncated: bool,
}

/// Every non-overlapping match of `pattern` in `text`, capped at [`MAX_MATCHES`].
pub fn find_matches(pattern: &Regex, text: &str) -> RegexMatches {
    // captures_len counts the implicit whole-match group.
    let mut matches: Vec<String> = if pattern.captures_len() == 2 {
        pattern
            .captures_iter(text)
            .take(MAX_MATCHES + 1)
            .map(|caps| caps.get(1).map_or_else(String::new, |g| g.as_str().to_string()))
            .collect()
    } else {
        pattern
            .find_iter(text)
            .take(MAX_MATCHES + 1)
            .map(|m| m.as_str().to_string())
            .collect()
    };

    let truncated = matches.len() > MAX_MATCHES;
    if truncated {
        matches.truncate(MAX_MATCHES);
        tracing::warn!(limit = MAX_MATCHES, "Regex matches truncated");
    }

    RegexMatches { match_count: matches.len(), matches, truncated }
}

/// [`find_matches`] on the blocking pool, abandoned after `deadline`.
pub async fn run(pattern: Regex, text: String, deadline: Duration) -> Result<RegexMatches, UtilityError> {
    let task = tokio::task::spawn_blocking(move || find_matches(&pattern, &text));
    match with_deadline(deadline, task).await {
        Ok(joined) => Ok(joined?),
        Err(_) => Err(UtilityError::ExecutionTimeout(deadline.as_millis() as u64)),
    }
}
