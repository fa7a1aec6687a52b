//! RFC 822/MIME email loader.
//!
//! Extraction is a two-step attempt: prefer the `text/html` body (many
//! mail clients put the real content there and leave a stub plain part),
//! and fall back to `text/plain` when the message has no HTML body. Any
//! other failure is reported with the originating file path.

use std::fmt;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use super::checked_path;
use super::html;
use crate::document::{DEFAULT_MAX_FILE_SIZE, DocumentLoader, LoadFuture};
use crate::error::RagError;
use crate::types::{ContentType, Document, DocumentMetadata};

pub struct EmailLoader {
    pub max_file_size: u64,
}

impl Default for EmailLoader {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl DocumentLoader for EmailLoader {
    fn load(&self, path: &Path) -> LoadFuture<'_> {
        let path = path.to_path_buf();
        let max_size = self.max_file_size;
        Box::pin(async move {
            let path = checked_path(&path, max_size).await?;

            let raw = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| RagError::load(&path, e))?;

            let content = match extract_body(&raw, "text/html") {
                Ok(markup) => html::extract_text(&markup),
                Err(ExtractError::PartNotFound) => extract_body(&raw, "text/plain")
                    .map_err(|e| RagError::load(&path, e))?,
                Err(e) => return Err(RagError::load(&path, e)),
            };

            Ok(Document {
                content,
                metadata: DocumentMetadata {
                    source: path.display().to_string(),
                    content_type: ContentType::Email,
                },
            })
        })
    }

    fn supported_extensions(&self) -> &[&str] {
        &["eml"]
    }
}

#[derive(Debug)]
enum ExtractError {
    /// The message has no body of the requested media type.
    PartNotFound,
    Malformed(String),
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PartNotFound => write!(f, "no matching MIME part"),
            Self::Malformed(msg) => write!(f, "malformed message: {msg}"),
        }
    }
}

/// Find the decoded body of the first part with the given media type,
/// descending into nested `multipart/*` containers.
fn extract_body(raw: &str, media_type: &str) -> Result<String, ExtractError> {
    let (headers, body) = split_message(raw)
        .ok_or_else(|| ExtractError::Malformed("missing header/body separator".into()))?;

    let content_type = header_value(headers, "content-type")
        .unwrap_or_else(|| "text/plain".to_owned());

    if let Some(boundary) = boundary_of(&content_type) {
        for part in split_parts(body, &boundary) {
            if let Ok(found) = extract_body(part, media_type) {
                return Ok(found);
            }
        }
        return Err(ExtractError::PartNotFound);
    }

    if !content_type
        .to_ascii_lowercase()
        .starts_with(media_type)
    {
        return Err(ExtractError::PartNotFound);
    }

    let encoding = header_value(headers, "content-transfer-encoding")
        .unwrap_or_else(|| "7bit".to_owned())
        .to_ascii_lowercase();
    decode_body(body, encoding.trim())
}

/// Split a message (or MIME part) into its header block and body.
fn split_message(raw: &str) -> Option<(&str, &str)> {
    for sep in ["\r\n\r\n", "\n\n"] {
        if let Some(pos) = raw.find(sep) {
            return Some((&raw[..pos], &raw[pos + sep.len()..]));
        }
    }
    None
}

/// Case-insensitive header lookup with RFC 822 continuation unfolding.
fn header_value(headers: &str, name: &str) -> Option<String> {
    let mut value: Option<String> = None;
    for line in headers.lines() {
        if let Some(v) = &mut value {
            if line.starts_with(' ') || line.starts_with('\t') {
                v.push(' ');
                v.push_str(line.trim());
                continue;
            }
            break;
        }
        if let Some((key, rest)) = line.split_once(':')
            && key.trim().eq_ignore_ascii_case(name)
        {
            value = Some(rest.trim().to_owned());
        }
    }
    value
}

fn boundary_of(content_type: &str) -> Option<String> {
    let lower = content_type.to_ascii_lowercase();
    if !lower.starts_with("multipart/") {
        return None;
    }
    let idx = lower.find("boundary=")?;
    let rest = &content_type[idx + "boundary=".len()..];
    let boundary = rest
        .split(';')
        .next()
        .unwrap_or(rest)
        .trim()
        .trim_matches('"');
    Some(boundary.to_owned())
}

fn split_parts<'a>(body: &'a str, boundary: &str) -> Vec<&'a str> {
    let delimiter = format!("--{boundary}");
    let mut parts = Vec::new();
    for segment in body.split(delimiter.as_str()).skip(1) {
        let segment = segment.trim_start_matches(['\r', '\n']);
        if segment.starts_with("--") {
            break;
        }
        if !segment.trim().is_empty() {
            parts.push(segment);
        }
    }
    parts
}

fn decode_body(body: &str, encoding: &str) -> Result<String, ExtractError> {
    match encoding {
        "" | "7bit" | "8bit" | "binary" => Ok(body.to_owned()),
        "quoted-printable" => Ok(decode_quoted_printable(body)),
        "base64" => {
            let compact: String = body.chars().filter(|c| !c.is_whitespace()).collect();
            let bytes = STANDARD
                .decode(compact)
                .map_err(|e| ExtractError::Malformed(format!("bad base64 body: {e}")))?;
            String::from_utf8(bytes)
                .map_err(|e| ExtractError::Malformed(format!("base64 body is not UTF-8: {e}")))
        }
        other => Err(ExtractError::Malformed(format!(
            "unsupported transfer encoding: {other}"
        ))),
    }
}

fn decode_quoted_printable(body: &str) -> String {
    let raw = body.as_bytes();
    let mut bytes = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'=' {
            // Soft line break
            if raw.get(i + 1) == Some(&b'\r') && raw.get(i + 2) == Some(&b'\n') {
                i += 3;
                continue;
            }
            if raw.get(i + 1) == Some(&b'\n') {
                i += 2;
                continue;
            }
            if let (Some(hi), Some(lo)) = (
                raw.get(i + 1).copied().and_then(hex_digit),
                raw.get(i + 2).copied().and_then(hex_digit),
            ) {
                bytes.push((hi << 4) | lo);
                i += 3;
                continue;
            }
            // Anything else after '=' passes through literally, even a
            // multi-byte character.
        }
        bytes.push(raw[i]);
        i += 1;
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
