//! Per-endpoint input declarations.

use std::fmt;

/// Gated utility endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointId {
    MarkdownToHtml,
    QrCode,
    ImageToBase64,
    RegexTester,
    WordCounter,
    Summarize,
}

impl EndpointId {
    pub const ALL: [EndpointId; 6] = [
        EndpointId::MarkdownToHtml,
        EndpointId::QrCode,
        EndpointId::ImageToBase64,
        EndpointId::RegexTester,
        EndpointId::WordCounter,
        EndpointId::Summarize,
    ];

    pub fn path(self) -> &'static str {
        match self {
            EndpointId::MarkdownToHtml => "/api/v1/markdown-to-html",
            EndpointId::QrCode => "/api/v1/qr-code",
            EndpointId::ImageToBase64 => "/api/v1/image-to-base64",
            EndpointId::RegexTester => "/api/v1/regex-tester",
            EndpointId::WordCounter => "/api/v1/word-counter",
            EndpointId::Summarize => "/api/v1/summarize",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        let path = path.strip_suffix('/').unwrap_or(path);
        Self::ALL.into_iter().find(|e| e.path() == path)
    }

    /// Short label for logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            EndpointId::MarkdownToHtml => "markdown_to_html",
            EndpointId::QrCode => "qr_code",
            EndpointId::ImageToBase64 => "image_to_base64",
            EndpointId::RegexTester => "regex_tester",
            EndpointId::WordCounter => "word_counter",
            EndpointId::Summarize => "summarize",
        }
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub const IMAGE_CONTENT_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/jpg",
    "image/gif",
    "image/webp",
];

pub const ERROR_CORRECTION_LEVELS: &[&str] = &["L", "M", "Q", "H"];

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Free text. Control characters are stripped before the bounds are checked.
    Text {
        min_chars: usize,
        max_chars: usize,
        non_blank: bool,
        min_words: usize,
    },
    Integer {
        min: i64,
        max: i64,
        default: Option<i64>,
    },
    /// Case-insensitive member of `allowed`, normalised to upper case.
    Choice {
        allowed: &'static [&'static str],
        default: Option<&'static str>,
    },
    /// http(s) URL subject to the egress policy.
    Url { max_chars: usize },
    /// Regular expression subject to the pattern budget.
    Pattern { max_chars: usize },
    File {
        max_bytes: usize,
        content_types: &'static [&'static str],
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub required: bool,
    pub kind: FieldKind,
}

impl FieldSpec {
    fn required(name: &'static str, kind: FieldKind) -> Self {
        Self { name, required: true, kind }
    }

    fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self { name, required: false, kind }
    }
}

/// Ordered field declarations for one endpoint. Validation walks them in order.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointSchema {
    pub endpoint: EndpointId,
    pub fields: Vec<FieldSpec>,
}

impl EndpointSchema {
    pub fn for_endpoint(endpoint: EndpointId) -> Self {
        let fields = match endpoint {
            EndpointId::MarkdownToHtml => vec![FieldSpec::required(
                "markdown_text",
                FieldKind::Text { min_chars: 1, max_chars: 10_000, non_blank: true, min_words: 0 },
            )],
            EndpointId::QrCode => vec![
                FieldSpec::required(
                    "data",
                    FieldKind::Text { min_chars: 1, max_chars: 2_000, non_blank: false, min_words: 0 },
                ),
                FieldSpec::optional(
                    "box_size",
                    FieldKind::Integer { min: 1, max: 50, default: Some(10) },
                ),
                FieldSpec::optional(
                    "border",
                    FieldKind::Integer { min: 0, max: 20, default: Some(4) },
                ),
                FieldSpec::optional(
                    "error_correction",
                    FieldKind::Choice { allowed: ERROR_CORRECTION_LEVELS, default: Some("L") },
                ),
            ],
            EndpointId::ImageToBase64 => vec![FieldSpec::required(
                "file",
                FieldKind::File { max_bytes: MAX_UPLOAD_BYTES, content_types: IMAGE_CONTENT_TYPES },
            )],
            EndpointId::RegexTester => vec![
                FieldSpec::required("pattern", FieldKind::Pattern { max_chars: 1_000 }),
                FieldSpec::required(
                    "text",
                    FieldKind::Text { min_chars: 0, max_chars: 50_000, non_blank: false, min_words: 0 },
                ),
            ],
            EndpointId::WordCounter => {
                vec![FieldSpec::required("url", FieldKind::Url { max_chars: 2_048 })]
            }
            EndpointId::Summarize => vec![
                FieldSpec::required(
                    "text",
                    FieldKind::Text { min_chars: 50, max_chars: 100_000, non_blank: true, min_words: 10 },
                ),
                FieldSpec::optional(
                    "sentence_count",
                    FieldKind::Integer { min: 1, max: 20, default: Some(3) },
                ),
            ],
        };

        Self { endpoint, fields }
    }
}
