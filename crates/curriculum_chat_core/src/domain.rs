//! crates/curriculum_chat_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any transport or provider API.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A course in the static catalog. The catalog is fixed at process start;
/// courses are never created or destroyed at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    pub id: String,
    pub name: String,
    pub english_name: String,
    pub icon: String,
}

/// The curriculum document attached to a course: the original upload bytes
/// plus the metadata declared at upload time. At most one exists per course
/// at any time.
#[derive(Debug, Clone)]
pub struct CurriculumDocument {
    pub id: Uuid,
    pub course_id: String,
    pub filename: String,
    pub bytes: Bytes,
    pub media_type: String,
}

impl CurriculumDocument {
    /// The metadata-only reference handed out to callers.
    pub fn to_ref(&self) -> DocumentRef {
        DocumentRef {
            id: self.id,
            course_id: self.course_id.clone(),
            filename: self.filename.clone(),
            media_type: self.media_type.clone(),
            size_bytes: self.bytes.len() as u64,
        }
    }
}

/// An opaque reference to an attached document. Carries metadata only,
/// never the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    pub id: Uuid,
    pub course_id: String,
    pub filename: String,
    pub media_type: String,
    pub size_bytes: u64,
}

/// A single transcript entry. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// Who authored a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

/// The screen the session is currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    Home,
    CourseDetail,
    Chat,
}

/// What the session is currently busy with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Idle,
    FileProcessing,
    Processing,
    Error,
}
