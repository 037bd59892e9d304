//! crates/curriculum_chat_core/src/registry.rs
//!
//! The curriculum registry: maps each course to its single attached
//! document. Validation happens here, before any mutation.

use std::collections::HashMap;

use bytes::Bytes;
use uuid::Uuid;

use crate::domain::{CurriculumDocument, DocumentRef};

/// The single accepted upload media type.
pub const ACCEPTED_MEDIA_TYPE: &str = "application/pdf";

/// Upload size ceiling: 200 MiB.
pub const MAX_DOCUMENT_BYTES: u64 = 200 * 1024 * 1024;

/// Why an upload was refused. No registry mutation happens on any variant.
#[derive(Debug, thiserror::Error)]
pub enum AttachError {
    /// The declared media type is not the accepted one.
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),
    /// The payload exceeds the fixed upload ceiling.
    #[error("document of {size_bytes} bytes exceeds the 209715200 byte limit")]
    SizeLimitExceeded { size_bytes: u64 },
}

impl AttachError {
    /// The user-facing rejection text rendered by the presentation layer.
    pub fn user_notice(&self) -> String {
        match self {
            AttachError::UnsupportedMediaType(_) => "يرجى رفع ملف PDF فقط".to_string(),
            AttachError::SizeLimitExceeded { size_bytes } => {
                let mib = *size_bytes as f64 / (1024.0 * 1024.0);
                format!(
                    "⚠️ حجم الملف كبير جداً ({mib:.1}MB). الحد الأقصى المسموح به حالياً هو 200MB."
                )
            }
        }
    }
}

/// Maps a course identifier to its single attached curriculum document.
#[derive(Debug, Default)]
pub struct CurriculumRegistry {
    documents: HashMap<String, CurriculumDocument>,
}

impl CurriculumRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and stores an uploaded document, replacing any document
    /// previously attached to the course. A rejected upload leaves the
    /// registry untouched.
    pub fn attach(
        &mut self,
        course_id: &str,
        bytes: Bytes,
        filename: &str,
        media_type: &str,
    ) -> Result<DocumentRef, AttachError> {
        if media_type != ACCEPTED_MEDIA_TYPE {
            return Err(AttachError::UnsupportedMediaType(media_type.to_string()));
        }
        let size_bytes = bytes.len() as u64;
        if size_bytes > MAX_DOCUMENT_BYTES {
            return Err(AttachError::SizeLimitExceeded { size_bytes });
        }

        let document = CurriculumDocument {
            id: Uuid::new_v4(),
            course_id: course_id.to_string(),
            filename: filename.to_string(),
            bytes,
            media_type: media_type.to_string(),
        };
        let reference = document.to_ref();
        self.documents.insert(course_id.to_string(), document);
        Ok(reference)
    }

    /// Returns the metadata of the document attached to a course, if any.
    pub fn get(&self, course_id: &str) -> Option<DocumentRef> {
        self.documents.get(course_id).map(CurriculumDocument::to_ref)
    }

    /// Full document access, used to build gateway payloads.
    pub fn document(&self, course_id: &str) -> Option<&CurriculumDocument> {
        self.documents.get(course_id)
    }

    /// Detaches the document for one course. Removing a document that does
    /// not exist is a no-op.
    pub fn clear(&mut self, course_id: &str) {
        self.documents.remove(course_id);
    }

    /// Detaches every document.
    pub fn clear_all(&mut self) {
        self.documents.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf(len: usize) -> Bytes {
        Bytes::from(vec![0u8; len])
    }

    #[test]
    fn attach_replaces_never_appends() {
        let mut registry = CurriculumRegistry::new();
        registry
            .attach("mkt", pdf(10), "first.pdf", ACCEPTED_MEDIA_TYPE)
            .unwrap();
        let second = registry
            .attach("mkt", pdf(20), "second.pdf", ACCEPTED_MEDIA_TYPE)
            .unwrap();

        let stored = registry.get("mkt").unwrap();
        assert_eq!(stored, second);
        assert_eq!(stored.filename, "second.pdf");
        assert_eq!(stored.size_bytes, 20);
    }

    #[test]
    fn wrong_media_type_is_rejected_without_mutation() {
        let mut registry = CurriculumRegistry::new();
        let err = registry
            .attach("mkt", pdf(10), "notes.docx", "application/msword")
            .unwrap_err();

        assert!(matches!(err, AttachError::UnsupportedMediaType(_)));
        assert_eq!(err.user_notice(), "يرجى رفع ملف PDF فقط");
        assert!(registry.get("mkt").is_none());
    }

    #[test]
    fn oversize_upload_is_rejected_without_mutation() {
        let mut registry = CurriculumRegistry::new();
        let err = registry
            .attach(
                "mkt",
                pdf((MAX_DOCUMENT_BYTES + 1) as usize),
                "big.pdf",
                ACCEPTED_MEDIA_TYPE,
            )
            .unwrap_err();

        assert!(matches!(
            err,
            AttachError::SizeLimitExceeded { size_bytes } if size_bytes == MAX_DOCUMENT_BYTES + 1
        ));
        assert!(registry.get("mkt").is_none());
    }

    #[test]
    fn oversize_notice_reports_mib_to_one_decimal() {
        let err = AttachError::SizeLimitExceeded {
            size_bytes: 220_000_000,
        };
        // 220,000,000 bytes is 209.8 MiB.
        assert!(err.user_notice().contains("(209.8MB)"), "{}", err.user_notice());
    }

    #[test]
    fn round_trip_preserves_metadata() {
        let mut registry = CurriculumRegistry::new();
        let attached = registry
            .attach("corp-law", pdf(1234), "law.pdf", ACCEPTED_MEDIA_TYPE)
            .unwrap();

        let fetched = registry.get("corp-law").unwrap();
        assert_eq!(fetched.filename, attached.filename);
        assert_eq!(fetched.media_type, attached.media_type);
        assert_eq!(fetched.size_bytes, attached.size_bytes);
        assert_eq!(fetched.id, attached.id);
    }

    #[test]
    fn clear_is_idempotent() {
        let mut registry = CurriculumRegistry::new();
        registry.clear("never-attached");
        registry
            .attach("mkt", pdf(5), "a.pdf", ACCEPTED_MEDIA_TYPE)
            .unwrap();
        registry.clear("mkt");
        registry.clear("mkt");
        assert!(registry.get("mkt").is_none());
    }
}
