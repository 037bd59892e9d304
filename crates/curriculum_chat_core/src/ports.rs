//! crates/curriculum_chat_core/src/ports.rs
//!
//! Defines the service contract (trait) for the external answer gateway.
//! This trait forms the boundary of the hexagonal architecture, allowing
//! the core to be independent of the concrete provider API.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{CurriculumDocument, MessageRole};

/// Shown in the transcript when the provider rejects the combined payload
/// as too large for inline analysis.
const OVERSIZE_NOTICE: &str = "⚠️ حجم الملف كبير جداً لعملية التحليل اللحظية (تجاوز 200MB). يرجى محاولة رفع نسخة من الكتاب تحتوي على نصوص أكثر وصور أقل، أو تقسيم الملف.";

/// Shown in the transcript when the gateway call does not resolve within
/// the configured deadline.
const TIMEOUT_NOTICE: &str = "انتهت مهلة معالجة السؤال. يرجى المحاولة مرة أخرى.";

/// A failure surfaced by the answer gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The remote service rejected the combined payload as too large.
    #[error("gateway rejected the payload as too large")]
    PayloadTooLarge,
    /// The request did not resolve within the configured deadline.
    #[error("gateway request timed out after {0:?}")]
    Timeout(Duration),
    /// Any other remote failure. The text is surfaced to the user as-is.
    #[error("{0}")]
    Other(String),
}

impl GatewayError {
    /// The text placed in the transcript when an exchange fails.
    pub fn user_notice(&self) -> String {
        match self {
            GatewayError::PayloadTooLarge => OVERSIZE_NOTICE.to_string(),
            GatewayError::Timeout(_) => TIMEOUT_NOTICE.to_string(),
            GatewayError::Other(message) => message.clone(),
        }
    }
}

/// The external generative service that answers curriculum questions.
///
/// The gateway is stateless across calls: the full prior transcript and the
/// attached document travel with every request. Replies are free text; the
/// two-labeled-sections layout is a convention the provider may or may not
/// honor, so callers pass the returned text through untouched.
#[async_trait]
pub trait AnswerGateway: Send + Sync {
    /// Answers `question` against `document`. `history` is the prior
    /// transcript as ordered role/content pairs; `chapter_focus` narrows
    /// which part of the document to prioritize (empty means the whole
    /// document).
    async fn ask(
        &self,
        question: &str,
        document: &CurriculumDocument,
        history: &[(MessageRole, String)],
        chapter_focus: &str,
    ) -> Result<String, GatewayError>;
}
