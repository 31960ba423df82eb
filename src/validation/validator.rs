//! Schema-driven validation from raw request payloads to typed inputs.

use std::collections::HashMap;

use axum::body::Bytes;
use regex::Regex;
use serde_json::{Map, Value};
use url::Url;

use crate::security::egress::EgressPolicy;
use crate::security::pattern::PatternBudget;
use crate::validation::sanitize::{sanitize_filename, strip_control_chars};
use crate::validation::schema::{EndpointId, EndpointSchema, FieldKind, FieldSpec};

/// One failing field. Validation stops at the first one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }

    fn missing(field: &str) -> Self {
        Self::new(field, "Field required")
    }
}

/// One part of a multipart body.
#[derive(Debug, Clone)]
pub struct Upload {
    pub field: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Request input as read off the wire, before any checks.
#[derive(Debug, Clone)]
pub enum RawPayload {
    Json(Bytes),
    Query(HashMap<String, String>),
    Multipart(Vec<Upload>),
}

#[derive(Debug, Clone)]
pub struct ValidatedFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// Endpoint input that passed its schema.
#[derive(Debug, Clone)]
pub enum TypedPayload {
    Markdown {
        markdown_text: String,
    },
    QrCode {
        data: String,
        box_size: u32,
        border: u32,
        error_correction: String,
    },
    Image(ValidatedFile),
    Regex {
        pattern: Regex,
        text: String,
    },
    WordCount {
        url: Url,
    },
    Summarize {
        text: String,
        sentence_count: usize,
    },
}

impl TypedPayload {
    pub fn endpoint(&self) -> EndpointId {
        match self {
            TypedPayload::Markdown { .. } => EndpointId::MarkdownToHtml,
            TypedPayload::QrCode { .. } => EndpointId::QrCode,
            TypedPayload::Image(_) => EndpointId::ImageToBase64,
            TypedPayload::Regex { .. } => EndpointId::RegexTester,
            TypedPayload::WordCount { .. } => EndpointId::WordCounter,
            TypedPayload::Summarize { .. } => EndpointId::Summarize,
        }
    }
}

#[derive(Debug)]
enum FieldValue {
    Text(String),
    Integer(i64),
    Url(Url),
    Pattern(Regex),
    File(ValidatedFile),
}

/// Field lookup over whichever payload shape arrived.
enum Source<'a> {
    Json(Map<String, Value>),
    Query(&'a HashMap<String, String>),
    Multipart(&'a [Upload]),
}

enum Input<'a> {
    Json(&'a Value),
    Str(&'a str),
    File(&'a Upload),
}

impl<'a> Source<'a> {
    fn from_raw(raw: &'a RawPayload) -> Result<Self, FieldError> {
        match raw {
            RawPayload::Json(bytes) => {
                if bytes.is_empty() {
                    return Err(FieldError::new("body", "Request body is required"));
                }
                match serde_json::from_slice::<Value>(bytes) {
                    Ok(Value::Object(map)) => Ok(Source::Json(map)),
                    Ok(_) => Err(FieldError::new("body", "Input should be a valid JSON object")),
                    Err(_) => Err(FieldError::new("body", "Request body is not valid JSON")),
                }
            }
            RawPayload::Query(map) => Ok(Source::Query(map)),
            RawPayload::Multipart(parts) => Ok(Source::Multipart(parts)),
        }
    }

    fn get(&self, name: &str) -> Option<Input<'_>> {
        match self {
            Source::Json(map) => map.get(name).map(Input::Json),
            Source::Query(map) => map.get(name).map(|s| Input::Str(s.as_str())),
            Source::Multipart(parts) => parts.iter().find(|p| p.field == name).map(Input::File),
        }
    }
}

/// Applies [`EndpointSchema`]s plus the egress and pattern policies.
#[derive(Debug, Clone)]
pub struct InputValidator {
    schemas: HashMap<EndpointId, EndpointSchema>,
    egress: EgressPolicy,
    patterns: PatternBudget,
}

impl InputValidator {
    pub fn new(egress: EgressPolicy, patterns: PatternBudget) -> Self {
        let schemas = EndpointId::ALL
            .into_iter()
            .map(|e| (e, EndpointSchema::for_endpoint(e)))
            .collect();
        Self { schemas, egress, patterns }
    }

    pub fn schema(&self, endpoint: EndpointId) -> Option<&EndpointSchema> {
        self.schemas.get(&endpoint)
    }

    /// Check every declared field in order and build the typed input.
    pub fn validate(&self, endpoint: EndpointId, raw: &RawPayload) -> Result<TypedPayload, FieldError> {
        let schema = self
            .schemas
            .get(&endpoint)
            .ok_or_else(|| FieldError::new("endpoint", "Unknown endpoint"))?;
        let source = Source::from_raw(raw)?;

        let mut values = HashMap::with_capacity(schema.fields.len());
        for spec in &schema.fields {
            if let Some(value) = self.check_field(spec, source.get(spec.name))? {
                values.insert(spec.name, value);
            }
        }

        build_payload(endpoint, values)
    }

    fn check_field(&self, spec: &FieldSpec, input: Option<Input<'_>>) -> Result<Option<FieldValue>, FieldError> {
        let name = spec.name;
        let input = match input {
            Some(Input::Json(Value::Null)) | None => {
                return match default_for(&spec.kind) {
                    Some(value) => Ok(Some(value)),
                    None if spec.required => Err(FieldError::missing(name)),
                    None => Ok(None),
                };
            }
            Some(input) => input,
        };

        let value = match &spec.kind {
            FieldKind::Text { min_chars, max_chars, non_blank, min_words } => {
                let text = strip_control_chars(string_input(name, &input)?);
                let len = text.chars().count();
                if len < *min_chars {
                    return Err(FieldError::new(name, length_message("at least", *min_chars)));
                }
                if len > *max_chars {
                    return Err(FieldError::new(name, length_message("at most", *max_chars)));
                }
                if *non_blank && text.trim().is_empty() {
                    return Err(FieldError::new(name, "Text cannot be empty or only whitespace"));
                }
                if text.split_whitespace().count() < *min_words {
                    return Err(FieldError::new(name, format!("Text must contain at least {min_words} words")));
                }
                FieldValue::Text(text)
            }
            FieldKind::Integer { min, max, .. } => {
                let n = integer_input(name, &input)?;
                if n < *min {
                    return Err(FieldError::new(name, format!("Input should be greater than or equal to {min}")));
                }
                if n > *max {
                    return Err(FieldError::new(name, format!("Input should be less than or equal to {max}")));
                }
                FieldValue::Integer(n)
            }
            FieldKind::Choice { allowed, .. } => {
                let choice = string_input(name, &input)?.trim().to_ascii_uppercase();
                if !allowed.iter().any(|a| *a == choice) {
                    return Err(FieldError::new(name, format!("Input should be one of: {}", allowed.join(", "))));
                }
                FieldValue::Text(choice)
            }
            FieldKind::Url { max_chars } => {
                let raw = string_input(name, &input)?;
                if raw.chars().count() > *max_chars {
                    return Err(FieldError::new(name, format!("URL should have at most {max_chars} characters")));
                }
                let url = self
                    .egress
                    .check_url(raw)
                    .map_err(|v| FieldError::new(name, v.to_string()))?;
                FieldValue::Url(url)
            }
            FieldKind::Pattern { max_chars } => {
                let raw = string_input(name, &input)?;
                if raw.is_empty() {
                    return Err(FieldError::new(name, length_message("at least", 1)));
                }
                if raw.chars().count() > *max_chars {
                    return Err(FieldError::new(name, length_message("at most", *max_chars)));
                }
                let regex = self
                    .patterns
                    .compile(raw)
                    .map_err(|v| FieldError::new(name, v.to_string()))?;
                FieldValue::Pattern(regex)
            }
            FieldKind::File { max_bytes, content_types } => {
                let Input::File(upload) = input else {
                    return Err(FieldError::new(name, "Expected a file upload"));
                };
                let content_type = upload
                    .content_type
                    .as_deref()
                    .and_then(|ct| ct.split(';').next())
                    .map(|ct| ct.trim().to_ascii_lowercase())
                    .unwrap_or_default();
                if !content_types.iter().any(|t| *t == content_type) {
                    return Err(FieldError::new(
                        name,
                        format!("Unsupported file type '{content_type}'. Allowed: {}", content_types.join(", ")),
                    ));
                }
                if upload.bytes.is_empty() {
                    return Err(FieldError::new(name, "Uploaded file is empty"));
                }
                if upload.bytes.len() > *max_bytes {
                    return Err(FieldError::new(name, format!("File exceeds the {max_bytes} byte limit")));
                }
                FieldValue::File(ValidatedFile {
                    filename: sanitize_filename(upload.filename.as_deref().unwrap_or_default()),
                    content_type,
                    bytes: upload.bytes.clone(),
                })
            }
        };

        Ok(Some(value))
    }
}

fn length_message(bound: &str, n: usize) -> String {
    let unit = if n == 1 { "character" } else { "characters" };
    format!("String should have {bound} {n} {unit}")
}

fn default_for(kind: &FieldKind) -> Option<FieldValue> {
    match kind {
        FieldKind::Integer { default: Some(n), .. } => Some(FieldValue::Integer(*n)),
        FieldKind::Choice { default: Some(c), .. } => Some(FieldValue::Text((*c).to_string())),
        _ => None,
    }
}

fn string_input<'a>(name: &str, input: &'a Input<'a>) -> Result<&'a str, FieldError> {
    match input {
        Input::Json(Value::String(s)) => Ok(s.as_str()),
        Input::Str(s) => Ok(*s),
        Input::File(upload) if upload.filename.is_none() => std::str::from_utf8(&upload.bytes)
            .map_err(|_| FieldError::new(name, "Input should be a valid string")),
        _ => Err(FieldError::new(name, "Input should be a valid string")),
    }
}

fn integer_input(name: &str, input: &Input<'_>) -> Result<i64, FieldError> {
    let parsed = match input {
        Input::Json(Value::Number(n)) => n.as_i64(),
        Input::Json(Value::String(s)) => s.trim().parse().ok(),
        Input::Str(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| FieldError::new(name, "Input should be a valid integer"))
}

fn build_payload(endpoint: EndpointId, mut values: HashMap<&'static str, FieldValue>) -> Result<TypedPayload, FieldError> {
    Ok(match endpoint {
        EndpointId::MarkdownToHtml => TypedPayload::Markdown { markdown_text: take_text(&mut values, "markdown_text")? },
        EndpointId::QrCode => {
            let data = take_text(&mut values, "data")?;
            let error_correction = take_text(&mut values, "error_correction")?;
            TypedPayload::QrCode {
                data,
                box_size: take_integer(&mut values, "box_size")? as u32,
                border: take_integer(&mut values, "border")? as u32,
                error_correction,
            }
        }
        EndpointId::ImageToBase64 => match values.remove("file") {
            Some(FieldValue::File(file)) => TypedPayload::Image(file),
            _ => return Err(FieldError::missing("file")),
        },
        EndpointId::RegexTester => {
            let text = take_text(&mut values, "text")?;
            match values.remove("pattern") {
                Some(FieldValue::Pattern(pattern)) => TypedPayload::Regex { pattern, text },
                _ => return Err(FieldError::missing("pattern")),
            }
        }
        EndpointId::WordCounter => match values.remove("url") {
            Some(FieldValue::Url(url)) => TypedPayload::WordCount { url },
            _ => return Err(FieldError::missing("url")),
        },
        EndpointId::Summarize => {
            let text = take_text(&mut values, "text")?;
            TypedPayload::Summarize {
                text,
                sentence_count: take_integer(&mut values, "sentence_count")? as usize,
            }
        }
    })
}

fn take_text(values: &mut HashMap<&'static str, FieldValue>, name: &'static str) -> Result<String, FieldError> {
    match values.remove(name) {
        Some(FieldValue::Text(s)) => Ok(s),
        _ => Err(FieldError::missing(name)),
    }
}

fn take_integer(values: &mut HashMap<&'static str, FieldValue>, name: &'static str) -> Result<i64, FieldError> {
    match values.remove(name) {
        Some(FieldValue::Integer(n)) => Ok(n),
        _ => Err(FieldError::missing(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validator() -> InputValidator {
        InputValidator::new(EgressPolicy::new(false), PatternBudget::default())
    }

    fn json_payload(value: Value) -> RawPayload {
        RawPayload::Json(Bytes::from(value.to_string()))
    }

    fn err(endpoint: EndpointId, value: Value) -> FieldError {
        validator().validate(endpoint, &json_payload(value)).unwrap_err()
    }

    #[test]
    fn test_markdown_valid_and_sanitized() {
        let payload = validator()
            .validate(EndpointId::MarkdownToHtml, &json_payload(json!({"markdown_text": "# Hi\u{0}\n"})))
            .unwrap();
        match payload {
            TypedPayload::Markdown { markdown_text } => assert_eq!(markdown_text, "# Hi\n"),
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn test_markdown_blank_and_oversize() {
        assert_eq!(err(EndpointId::MarkdownToHtml, json!({"markdown_text": "   "})).field, "markdown_text");
        let e = err(EndpointId::MarkdownToHtml, json!({"markdown_text": "a".repeat(10_001)}));
        assert_eq!(e.message, "String should have at most 10000 characters");
        assert_eq!(err(EndpointId::MarkdownToHtml, json!({})).message, "Field required");
    }

    #[test]
    fn test_body_shape_errors() {
        let v = validator();
        let e = v.validate(EndpointId::QrCode, &RawPayload::Json(Bytes::from_static(b"{nope"))).unwrap_err();
        assert_eq!(e.field, "body");
        let e = v.validate(EndpointId::QrCode, &json_payload(json!([1, 2]))).unwrap_err();
        assert_eq!(e.message, "Input should be a valid JSON object");
        let e = v.validate(EndpointId::QrCode, &RawPayload::Json(Bytes::new())).unwrap_err();
        assert_eq!(e.field, "body");
    }

    #[test]
    fn test_qr_defaults_and_bounds() {
        let payload = validator()
            .validate(EndpointId::QrCode, &json_payload(json!({"data": "hello", "error_correction": "h"})))
            .unwrap();
        match payload {
            TypedPayload::QrCode { data, box_size, border, error_correction } => {
                assert_eq!(data, "hello");
                assert_eq!(box_size, 10);
                assert_eq!(border, 4);
                assert_eq!(error_correction, "H");
            }
            other => panic!("unexpected payload: {other:?}"),
        }

        let e = err(EndpointId::QrCode, json!({"data": "x", "box_size": 0}));
        assert_eq!(e.field, "box_size");
        assert_eq!(e.message, "Input should be greater than or equal to 1");
        let e = err(EndpointId::QrCode, json!({"data": "x", "border": 21}));
        assert_eq!(e.message, "Input should be less than or equal to 20");
        let e = err(EndpointId::QrCode, json!({"data": "x", "box_size": 2.5}));
        assert_eq!(e.message, "Input should be a valid integer");
        let e = err(EndpointId::QrCode, json!({"data": "x", "error_correction": "Z"}));
        assert_eq!(e.message, "Input should be one of: L, M, Q, H");
    }

    #[test]
    fn test_first_failing_field_wins() {
        let e = err(EndpointId::QrCode, json!({"box_size": 0, "border": 99}));
        assert_eq!(e.field, "data");
    }

    #[test]
    fn test_unknown_fields_ignored() {
        assert!(validator()
            .validate(EndpointId::QrCode, &json_payload(json!({"data": "x", "extra": true})))
            .is_ok());
    }

    #[test]
    fn test_regex_pattern_checks() {
        let ok = validator()
            .validate(EndpointId::RegexTester, &json_payload(json!({"pattern": "\\d+", "text": ""})))
            .unwrap();
        assert!(matches!(ok, TypedPayload::Regex { .. }));

        assert_eq!(err(EndpointId::RegexTester, json!({"pattern": "(a+)+", "text": "aaa"})).field, "pattern");
        let e = err(EndpointId::RegexTester, json!({"pattern": "[", "text": "x"}));
        assert!(e.message.starts_with("Invalid regex pattern"));
        assert_eq!(err(EndpointId::RegexTester, json!({"pattern": "", "text": "x"})).field, "pattern");
    }

    #[test]
    fn test_url_rejects_internal_targets() {
        for url in ["http://127.0.0.1/", "https://169.254.1.1/", "http://10.1.2.3", "http://192.168.0.1/x", "ftp://example.com"] {
            assert_eq!(err(EndpointId::WordCounter, json!({"url": url})).field, "url", "{url}");
        }
        let long = format!("https://example.com/{}", "a".repeat(2_100));
        assert_eq!(err(EndpointId::WordCounter, json!({"url": long})).message, "URL should have at most 2048 characters");
    }

    #[test]
    fn test_query_payload_for_word_counter() {
        let mut q = HashMap::new();
        q.insert("url".to_string(), "https://example.com".to_string());
        let payload = validator().validate(EndpointId::WordCounter, &RawPayload::Query(q)).unwrap();
        match payload {
            TypedPayload::WordCount { url } => assert_eq!(url.as_str(), "https://example.com/"),
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn test_summarize_word_floor() {
        let short_words = "x".repeat(60);
        let e = err(EndpointId::Summarize, json!({"text": short_words}));
        assert_eq!(e.message, "Text must contain at least 10 words");

        let e = err(EndpointId::Summarize, json!({"text": "too short"}));
        assert_eq!(e.message, "String should have at least 50 characters");

        let text = "One two three four five six seven eight nine ten eleven twelve thirteen.";
        let ok = validator()
            .validate(EndpointId::Summarize, &json_payload(json!({"text": text, "sentence_count": "2"})))
            .unwrap();
        assert!(matches!(ok, TypedPayload::Summarize { sentence_count: 2, .. }));
    }

    fn upload(content_type: &str, bytes: &'static [u8]) -> RawPayload {
        RawPayload::Multipart(vec![Upload {
            field: "file".into(),
            filename: Some("../secret/photo.png".into()),
            content_type: Some(content_type.into()),
            bytes: Bytes::from_static(bytes),
        }])
    }

    #[test]
    fn test_image_upload_checks() {
        let v = validator();
        match v.validate(EndpointId::ImageToBase64, &upload("image/PNG; charset=binary", b"\x89PNG")).unwrap() {
            TypedPayload::Image(file) => {
                assert_eq!(file.filename, "photo.png");
                assert_eq!(file.content_type, "image/png");
            }
            other => panic!("unexpected payload: {other:?}"),
        }

        let e = v.validate(EndpointId::ImageToBase64, &upload("text/plain", b"hi")).unwrap_err();
        assert!(e.message.starts_with("Unsupported file type 'text/plain'"));
        let e = v.validate(EndpointId::ImageToBase64, &upload("image/png", b"")).unwrap_err();
        assert_eq!(e.message, "Uploaded file is empty");
        let e = v.validate(EndpointId::ImageToBase64, &RawPayload::Multipart(vec![])).unwrap_err();
        assert_eq!(e.message, "Field required");
    }
}
