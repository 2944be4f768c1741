//! Ingestion Pipeline (§4.G): Upload and Process operations, orchestrating
//! the Text Normalizer, Fingerprinter, Embedder Client, and Action
//! Extractor around the Document state machine.

use chrono::{DateTime, NaiveDate, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::{CoreError, IngestionError, Result};
use crate::pipeline::action_extractor::extract_actions;
use crate::pipeline::fingerprint::fingerprint;
use crate::pipeline::normalizer::normalize;
use crate::traits::{CompletionClient, EmbedderClient, Store};
use crate::types::{Document, DocumentKind};

lazy_static! {
    // Matches "2026-01-15", "2026_01_15", and bare "20260115" anywhere in a filename.
    static ref FILENAME_DATE: Regex =
        Regex::new(r"(\d{4})[-_]?(\d{2})[-_]?(\d{2})").expect("filename date pattern must compile");
}

/// Infer a document date from its filename (§4.G Upload step 5: "inferred
/// from filename when possible else now"). Falls back to the current time
/// when no date-shaped substring is found or it doesn't parse.
fn infer_document_date(filename: &str) -> DateTime<Utc> {
    FILENAME_DATE
        .captures(filename)
        .and_then(|caps| {
            let year: i32 = caps.get(1)?.as_str().parse().ok()?;
            let month: u32 = caps.get(2)?.as_str().parse().ok()?;
            let day: u32 = caps.get(3)?.as_str().parse().ok()?;
            NaiveDate::from_ymd_opt(year, month, day)
        })
        .map(|date| date.and_hms_opt(0, 0, 0).unwrap().and_utc())
        .unwrap_or_else(Utc::now)
}

/// Options for an upload call (§4.G Upload).
pub struct UploadRequest<'a> {
    pub site_id: Uuid,
    pub bytes: &'a [u8],
    pub filename: &'a str,
    pub mime: &'a str,
    pub kind: DocumentKind,
    pub max_size: usize,
}

/// Upload a document (§4.G Upload, steps 1-6). Idempotent on content_hash
/// within a site.
#[instrument(skip(store, req), fields(site_id = %req.site_id, filename = %req.filename))]
pub async fn upload<S: Store + ?Sized>(store: &S, req: UploadRequest<'_>) -> Result<Document> {
    if store.get_site(req.site_id).await?.is_none() {
        return Err(IngestionError::SiteNotFound(req.site_id).into());
    }

    if req.bytes.is_empty() {
        return Err(IngestionError::EmptyUpload.into());
    }
    if req.bytes.len() > req.max_size {
        return Err(IngestionError::FileTooLarge { size: req.bytes.len(), max: req.max_size }.into());
    }

    let content_hash = fingerprint(req.bytes);

    if let Some(existing) = store.get_document_by_content_hash(req.site_id, &content_hash).await? {
        info!(document_id = %existing.id, "dedup hit, returning existing document");
        return Ok(existing);
    }

    let mut document = Document::new(
        req.site_id,
        req.kind,
        req.filename,
        content_hash,
        req.bytes.len(),
        req.mime,
    );
    document.document_date = infer_document_date(req.filename);

    match normalize(req.bytes, req.filename, req.mime) {
        Ok(normalized) => {
            document.raw_text = normalized.raw_for_storage;
            document.processed_text = normalized.processed_text;
        }
        Err(CoreError::Normalizer(_)) => {
            warn!(document_id = %document.id, "unsupported format on upload, recording with empty text");
        }
        Err(other) => return Err(other),
    }

    store.upsert_document(&document).await?;
    Ok(document)
}

/// Process a document (§4.G Process, steps 1-5): embed, extract actions,
/// mark completed. Re-entrancy safe via CAS on processing_state.
#[instrument(skip(store, embedder, completion, cancel), fields(document_id = %document_id))]
pub async fn process<S: Store + ?Sized, E: EmbedderClient + ?Sized, C: CompletionClient + ?Sized>(
    store: &S,
    embedder: &E,
    completion: &C,
    document_id: Uuid,
    cancel: &CancellationToken,
) -> Result<()> {
    let Some(mut document) = store.get_document(document_id).await? else {
        return Err(IngestionError::DocumentNotFound(document_id).into());
    };

    if !document.try_begin_processing(Utc::now()) {
        info!("document not pending, skipping (re-entrancy no-op)");
        return Ok(());
    }
    store.upsert_document(&document).await?;

    let embedding = match embedder.embed(&document.processed_text, cancel).await {
        Ok(vector) => vector,
        Err(err) => {
            document.mark_failed(err.to_string());
            store.upsert_document(&document).await?;
            return Ok(());
        }
    };

    let components = store.list_components(document.site_id).await?;
    match extract_actions(completion, &document, &components, cancel).await {
        Ok(actions) => {
            for action in actions {
                if let Err(err) = store.insert_action(&action).await {
                    warn!(error = %err, "failed to persist an extracted action, continuing");
                }
            }
        }
        Err(err) => {
            warn!(error = %err, "action extraction failed, continuing to completion");
        }
    }

    document.mark_completed(embedding, Utc::now());
    store.upsert_document(&document).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::memory::MemoryStore;
    use crate::testing::{MockCompletionClient, MockEmbedderClient};
    use crate::types::Site;

    #[tokio::test]
    async fn upload_is_idempotent_on_content_hash() {
        let store = MemoryStore::new();
        let site = Site::new("CA-1", "Fresno Array");
        store.upsert_site(&site).await.unwrap();

        let req = || UploadRequest {
            site_id: site.id,
            bytes: b"inverter 31 replaced",
            filename: "r.txt",
            mime: "text/plain",
            kind: DocumentKind::FieldServiceReport,
            max_size: 1024,
        };

        let first = upload(&store, req()).await.unwrap();
        let second = upload(&store, req()).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.list_documents(site.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn upload_infers_document_date_from_filename() {
        let store = MemoryStore::new();
        let site = Site::new("CA-1", "Fresno Array");
        store.upsert_site(&site).await.unwrap();

        let document = upload(
            &store,
            UploadRequest {
                site_id: site.id,
                bytes: b"inverter 31 replaced",
                filename: "fsr-2026-01-15.txt",
                mime: "text/plain",
                kind: DocumentKind::FieldServiceReport,
                max_size: 1024,
            },
        )
        .await
        .unwrap();

        assert_eq!(document.document_date.format("%Y-%m-%d").to_string(), "2026-01-15");
    }

    #[tokio::test]
    async fn upload_falls_back_to_now_without_dated_filename() {
        let store = MemoryStore::new();
        let site = Site::new("CA-1", "Fresno Array");
        store.upsert_site(&site).await.unwrap();

        let before = Utc::now();
        let document = upload(
            &store,
            UploadRequest {
                site_id: site.id,
                bytes: b"inverter 31 replaced",
                filename: "field-report.txt",
                mime: "text/plain",
                kind: DocumentKind::FieldServiceReport,
                max_size: 1024,
            },
        )
        .await
        .unwrap();

        assert!(document.document_date >= before);
    }

    #[tokio::test]
    async fn upload_rejects_unknown_site() {
        let store = MemoryStore::new();
        let result = upload(
            &store,
            UploadRequest {
                site_id: Uuid::now_v7(),
                bytes: b"data",
                filename: "r.txt",
                mime: "text/plain",
                kind: DocumentKind::Other,
                max_size: 1024,
            },
        )
        .await;
        assert!(matches!(result, Err(CoreError::Ingestion(IngestionError::SiteNotFound(_)))));
    }

    #[tokio::test]
    async fn process_is_reentrancy_safe_on_non_pending_document() {
        let store = MemoryStore::new();
        let site = Site::new("CA-1", "Fresno Array");
        store.upsert_site(&site).await.unwrap();
        let mut document = Document::new(site.id, DocumentKind::Email, "r.txt", "hash", 4, "text/plain");
        document.try_begin_processing(Utc::now());
        store.upsert_document(&document).await.unwrap();

        let embedder = MockEmbedderClient::new(4);
        let completion = MockCompletionClient::new();
        let cancel = CancellationToken::new();
        process(&store, &embedder, &completion, document.id, &cancel).await.unwrap();

        let reloaded = store.get_document(document.id).await.unwrap().unwrap();
        assert_eq!(reloaded.processing_state, crate::types::ProcessingState::Processing);
    }
}
