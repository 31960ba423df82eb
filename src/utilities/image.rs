//! Uploaded image to base64.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;

use crate::validation::ValidatedFile;

#[derive(Debug, Clone, Serialize)]
pub struct ImageEncoding {
    pub filename: String,
    pub base64_string: String,
    pub file_size: usize,
    pub content_type: String,
}

pub fn encode(file: ValidatedFile) -> ImageEncoding {
    ImageEncoding {
        base64_string: STANDARD.encode(&file.bytes),
        file_size: file.bytes.len(),
        filename: file.filename,
        content_type: file.content_type,
    }
}
