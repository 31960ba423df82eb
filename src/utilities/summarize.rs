//! Extractive summarization by word frequency.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

#[rustfmt::skip]
const STOP_WORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your", "yours",
    "yourself", "yourselves", "he", "him", "his", "himself", "she", "her", "hers", "herself",
    "it", "its", "itself", "they", "them", "their", "theirs", "themselves", "what", "which",
    "who", "whom", "this", "that", "these", "those", "am", "is", "are", "was", "were", "be",
    "been", "being", "have", "has", "had", "having", "do", "does", "did", "doing", "a", "an",
    "the", "and", "but", "if", "or", "because", "as", "until", "while", "of", "at", "by",
    "for", "with", "about", "against", "between", "into", "through", "during", "before",
    "after", "above", "below", "to", "from", "up", "down", "in", "out", "on", "off", "over",
    "under", "again", "further", "then", "once", "here", "there", "when", "where", "why",
    "how", "all", "any", "both", "each", "few", "more", "most", "other", "some", "such", "no",
    "nor", "not", "only", "own", "same", "so", "than", "too", "very", "s", "t", "can", "will",
    "just", "don", "should", "now", "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren",
    "couldn", "didn", "doesn", "hadn", "hasn", "haven", "isn", "ma", "mightn", "mustn",
    "needn", "shan", "shouldn", "wasn", "weren", "won", "wouldn",
];

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Summary {
    pub original_sentence_count: usize,
    pub summary: String,
    pub summary_sentence_count: usize,
}

/// Split on `.`, `!` or `?` followed by whitespace or end of text.
/// Closing quotes and brackets stay with their sentence.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let mut end = i + c.len_utf8();
        while let Some(&(j, next)) = chars.peek() {
            if matches!(next, '.' | '!' | '?' | '"' | '\'' | ')' | ']' | '\u{201d}' | '\u{2019}') {
                end = j + next.len_utf8();
                chars.next();
            } else {
                break;
            }
        }
        let at_boundary = chars.peek().map_or(true, |&(_, next)| next.is_whitespace());
        if at_boundary {
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = end;
        }
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

/// Pick the `sentence_count` highest-scoring sentences, kept in original order.
pub fn summarize(text: &str, sentence_count: usize) -> Summary {
    let sentences = split_sentences(text);
    let original_sentence_count = sentences.len();

    if original_sentence_count <= sentence_count {
        return Summary {
            original_sentence_count,
            summary: text.trim().to_string(),
            summary_sentence_count: original_sentence_count,
        };
    }

    let stop_words: HashSet<&str> = STOP_WORDS.iter().copied().collect();
    let mut frequencies: HashMap<String, f64> = HashMap::new();
    for word in words(text).filter(|w| !stop_words.contains(w.as_str())) {
        *frequencies.entry(word).or_insert(0.0) += 1.0;
    }

    let chosen: Vec<usize> = if frequencies.is_empty() {
        (0..sentence_count).collect()
    } else {
        let max = frequencies.values().copied().fold(0.0_f64, f64::max);
        for freq in frequencies.values_mut() {
            *freq /= max;
        }

        let mut scored: Vec<(usize, f64)> = sentences
            .iter()
            .enumerate()
            .map(|(i, sentence)| {
                let (total, count) = words(sentence)
                    .filter_map(|w| frequencies.get(&w))
                    .fold((0.0, 0usize), |(sum, n), f| (sum + f, n + 1));
                let score = if count > 0 { total / count as f64 } else { 0.0 };
                (i, score)
            })
            .collect();

        // Highest score first; earlier sentence wins a tie.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        let mut top: Vec<usize> = scored.into_iter().take(sentence_count).map(|(i, _)| i).collect();
        top.sort_unstable();
        top
    };

    let summary = chosen.iter().map(|&i| sentences[i]).collect::<Vec<_>>().join(" ");
    tracing::debug!(from = original_sentence_count, to = chosen.len(), "Summarized text");

    Summary {
        original_sentence_count,
        summary,
        summary_sentence_count: chosen.len(),
    }
}
