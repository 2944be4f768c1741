//! Text Normalizer (§4.A): turn raw uploaded bytes into the text the rest
//! of the pipeline reasons over.
//!
//! Text-family inputs pass through unchanged and keep their raw bytes as
//! `raw_text` for storage. PDFs are extracted with `pdf-extract`; a PDF
//! that fails to yield extractable text (scanned image, malformed stream)
//! degrades to a placeholder rather than failing the whole upload, since a
//! failed extraction still has a perfectly good raw file worth keeping on
//! record. Other binary formats are rejected outright — there is no
//! generic byte-soup to reason over.

use crate::error::{NormalizerError, Result};

/// Output of normalizing one uploaded file.
pub struct NormalizedText {
    /// Text retained verbatim for storage/citation excerpting. Equal to
    /// `processed_text` for text-family inputs; empty for PDFs.
    pub raw_for_storage: String,
    /// Text the rest of the pipeline (embedding, extraction, retrieval)
    /// operates over.
    pub processed_text: String,
}

const PLACEHOLDER: &str = "[document content unavailable]";

fn is_text_family(mime: &str, filename: &str) -> bool {
    if mime.starts_with("text/") || mime == "application/json" || mime == "application/xml" {
        return true;
    }
    let lower = filename.to_ascii_lowercase();
    [".txt", ".md", ".csv", ".json", ".xml", ".log"]
        .iter()
        .any(|ext| lower.ends_with(ext))
}

fn is_pdf(mime: &str, filename: &str) -> bool {
    mime == "application/pdf" || filename.to_ascii_lowercase().ends_with(".pdf")
}

/// Normalize `bytes` named `filename` with declared `mime` into text.
///
/// Returns [`NormalizerError::UnsupportedFormat`] for binary formats with
/// no known extraction path.
pub fn normalize(bytes: &[u8], filename: &str, mime: &str) -> Result<NormalizedText> {
    if is_text_family(mime, filename) {
        let text = String::from_utf8(bytes.to_vec())
            .map_err(|e| NormalizerError::DecodeFailure(e.to_string()))?;
        return Ok(NormalizedText {
            raw_for_storage: text.clone(),
            processed_text: text,
        });
    }

    if is_pdf(mime, filename) {
        let processed_text = match pdf_extract::extract_text_from_mem(bytes) {
            Ok(text) if !text.trim().is_empty() => text,
            _ => PLACEHOLDER.to_string(),
        };
        return Ok(NormalizedText {
            raw_for_storage: String::new(),
            processed_text,
        });
    }

    Err(NormalizerError::UnsupportedFormat(mime.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_family_passes_through_unchanged() {
        let out = normalize(b"inspection notes", "report.txt", "text/plain").unwrap();
        assert_eq!(out.processed_text, "inspection notes");
        assert_eq!(out.raw_for_storage, "inspection notes");
    }

    #[test]
    fn unsupported_binary_format_is_rejected() {
        let err = normalize(&[0xFF, 0xD8, 0xFF], "photo.jpg", "image/jpeg");
        assert!(err.is_err());
    }

    #[test]
    fn malformed_pdf_degrades_to_placeholder_instead_of_failing() {
        let out = normalize(b"not actually a pdf", "scan.pdf", "application/pdf").unwrap();
        assert_eq!(out.processed_text, PLACEHOLDER);
        assert_eq!(out.raw_for_storage, "");
    }
}
