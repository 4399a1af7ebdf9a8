//! Result materialization
//!
//! Persists a completed job's primary payload and its embedded binary
//! attachments to an object store, returning the references written back
//! into the ledger. Attachments decode independently: one bad attachment
//! becomes an error marker and never blocks the rest.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::NaiveDate;
use thiserror::Error;
use tracing::warn;

use courier_core::dto::worker::ResultPayload;

use crate::sanitize::sanitize;

/// Errors from the object store
#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("object store write failed for '{name}': {source}")]
    Write {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Durable blob storage for materialized results
pub trait ObjectStore: Send + Sync {
    /// Stores one object, returning its durable reference.
    fn put(&self, name: &str, bytes: &[u8]) -> Result<String, ObjectStoreError>;
}

/// Object store writing into a local directory
pub struct FsObjectStore {
    dir: PathBuf,
}

impl FsObjectStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ObjectStore for FsObjectStore {
    fn put(&self, name: &str, bytes: &[u8]) -> Result<String, ObjectStoreError> {
        let write_err = |source| ObjectStoreError::Write {
            name: name.to_string(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(write_err)?;
        let path = self.dir.join(name);
        fs::write(&path, bytes).map_err(write_err)?;

        Ok(path.to_string_lossy().into_owned())
    }
}

/// References produced by one materialization
#[derive(Debug, Clone, Default)]
pub struct MaterializationOutcome {
    /// Reference of the stored primary payload
    pub primary_ref: Option<String>,
    /// One reference or error marker per attachment, in payload order
    pub attachment_refs: Vec<String>,
    /// How many attachments ended up as error markers
    pub decode_failures: usize,
}

impl MaterializationOutcome {
    /// AttachmentRefs cell value for the ledger
    pub fn attachment_cell(&self) -> String {
        self.attachment_refs.join(", ")
    }
}

/// Persists completed job results to the object store
pub struct ResultMaterializer {
    store: Arc<dyn ObjectStore>,
}

impl ResultMaterializer {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Persists the primary payload and every attachment.
    ///
    /// Object names derive from the date stamp and the sanitized
    /// `name_hint` (an identifying field of the original request). Only a
    /// failure to store the primary payload is an error; attachment
    /// failures are recorded as `decode-error:` markers in the outcome.
    pub fn persist(
        &self,
        name_hint: &str,
        payload: &ResultPayload,
        stamp: NaiveDate,
    ) -> Result<MaterializationOutcome, ObjectStoreError> {
        let base = format!("{}_{}", stamp.format("%Y-%m-%d"), sanitize(name_hint));

        let primary_ref = Some(self.persist_primary(&base, payload)?);

        let mut outcome = MaterializationOutcome {
            primary_ref,
            ..Default::default()
        };

        for file in &payload.downloaded_files {
            match self.persist_attachment(&base, &file.filename, file.content_base64.as_deref()) {
                Ok(reference) => outcome.attachment_refs.push(reference),
                Err(detail) => {
                    warn!(filename = %file.filename, detail, "attachment not materialized");
                    outcome
                        .attachment_refs
                        .push(format!("decode-error:{}", file.filename));
                    outcome.decode_failures += 1;
                }
            }
        }

        Ok(outcome)
    }

    fn persist_primary(
        &self,
        base: &str,
        payload: &ResultPayload,
    ) -> Result<String, ObjectStoreError> {
        // Text payloads go out verbatim; anything else is stored as the
        // result document minus the attachment bodies, which get their own
        // objects below.
        if let Some(text) = &payload.text {
            return self.store.put(&format!("{base}.txt"), text.as_bytes());
        }

        let mut document = payload.clone();
        document.downloaded_files.clear();
        let body = serde_json::to_vec_pretty(&document).unwrap_or_default();
        self.store.put(&format!("{base}.json"), &body)
    }

    fn persist_attachment(
        &self,
        base: &str,
        filename: &str,
        content_base64: Option<&str>,
    ) -> Result<String, String> {
        let encoded = content_base64.ok_or_else(|| "attachment has no content".to_string())?;

        // Worker payloads sometimes wrap the encoding; strip whitespace
        // before decoding.
        let compact: String = encoded.split_whitespace().collect();
        let bytes = BASE64
            .decode(compact.as_bytes())
            .map_err(|e| format!("base64 decode failed: {e}"))?;

        self.store
            .put(&format!("{}_{}", base, sanitize(filename)), &bytes)
            .map_err(|e| e.to_string())
    }
}
