//! crates/curriculum_chat_core/src/controller.rs
//!
//! The session controller: a small state machine over the three screens,
//! the per-course stores, and the single in-flight exchange.

use bytes::Bytes;
use tracing::{info, warn};

use crate::domain::{
    Course, CurriculumDocument, DocumentRef, Message, MessageRole, Status, View,
};
use crate::ports::{AnswerGateway, GatewayError};
use crate::registry::{AttachError, CurriculumRegistry};
use crate::transcript::ConversationStore;

/// Which documents an explicit "change document" action removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearScope {
    /// Only the active course's document.
    ActiveCourse,
    /// Every course's document (the behavior observed in production).
    AllCourses,
}

/// Tunable behaviors that are pending a product decision, kept as
/// independent toggles so either answer can ship without code changes.
#[derive(Debug, Clone)]
pub struct SessionPolicy {
    pub document_clear_scope: ClearScope,
    /// Replacing or clearing a document invalidates the context its
    /// transcript was built against; this decides whether the transcript
    /// goes with it.
    pub clear_transcript_on_replace: bool,
    /// Per-course transcript bound; `None` keeps transcripts unbounded.
    pub max_transcript_messages: Option<usize>,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            document_clear_scope: ClearScope::ActiveCourse,
            clear_transcript_on_replace: false,
            max_transcript_messages: None,
        }
    }
}

/// A view-changing input to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    SelectCourse(String),
    Back,
    StartChat,
}

/// The pure view-transition table. Returns the next view, or `None` when
/// the event is not legal from the current view.
pub fn view_transition(
    view: View,
    event: &ViewEvent,
    has_document: bool,
    status: Status,
) -> Option<View> {
    match (view, event) {
        (View::Home, ViewEvent::SelectCourse(_)) => Some(View::CourseDetail),
        (View::CourseDetail, ViewEvent::Back) => Some(View::Home),
        (View::Chat, ViewEvent::Back) => Some(View::CourseDetail),
        (View::CourseDetail, ViewEvent::StartChat) if has_document && status == Status::Idle => {
            Some(View::Chat)
        }
        _ => None,
    }
}

/// Why a question was ignored. Rejected sends leave every store untouched
/// and issue no gateway call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendRejected {
    NotInChat,
    EmptyQuestion,
    Busy,
    NoDocument,
}

/// Why an upload did not produce an attached document.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// Validation refused the payload; the registry is untouched.
    #[error(transparent)]
    Rejected(#[from] AttachError),
    /// The upload ended without a begin phase or was abandoned mid-flight.
    /// Nothing was stored.
    #[error("upload aborted before completion")]
    Aborted,
}

impl UploadError {
    /// The user-facing notice for a failed upload.
    pub fn user_notice(&self) -> String {
        match self {
            UploadError::Rejected(inner) => inner.user_notice(),
            UploadError::Aborted => "حدث خطأ أثناء معالجة الملف.".to_string(),
        }
    }
}

/// Everything the gateway needs for one exchange, captured while the
/// caller still holds the session, so the remote call can run without it.
#[derive(Debug, Clone)]
pub struct QuestionTurn {
    pub course_id: String,
    pub question: String,
    pub document: CurriculumDocument,
    /// The transcript as it stood before this question was recorded.
    pub history: Vec<(MessageRole, String)>,
    pub chapter_focus: String,
}

/// Orchestrates one user's session: the current view, the selected course,
/// the chapter focus, the operation status, and the per-course document and
/// transcript stores. One controller exists per active session; a
/// multi-session server creates one per connection.
pub struct SessionController {
    catalog: Vec<Course>,
    registry: CurriculumRegistry,
    transcripts: ConversationStore,
    policy: SessionPolicy,
    view: View,
    active_course: Option<String>,
    chapter_focus: String,
    status: Status,
}

impl SessionController {
    pub fn new(catalog: Vec<Course>, policy: SessionPolicy) -> Self {
        let transcripts = ConversationStore::new(policy.max_transcript_messages);
        Self {
            catalog,
            registry: CurriculumRegistry::new(),
            transcripts,
            policy,
            view: View::Home,
            active_course: None,
            chapter_focus: String::new(),
            status: Status::Idle,
        }
    }

    // --- Read accessors -----------------------------------------------

    pub fn view(&self) -> View {
        self.view
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn catalog(&self) -> &[Course] {
        &self.catalog
    }

    pub fn active_course_id(&self) -> Option<&str> {
        self.active_course.as_deref()
    }

    pub fn chapter_focus(&self) -> &str {
        &self.chapter_focus
    }

    /// The active course's attached document, if any.
    pub fn document(&self) -> Option<DocumentRef> {
        self.active_course
            .as_deref()
            .and_then(|course_id| self.registry.get(course_id))
    }

    /// The active course's transcript. Empty when no course is selected.
    pub fn transcript(&self) -> &[Message] {
        self.active_course
            .as_deref()
            .map(|course_id| self.transcripts.list(course_id))
            .unwrap_or_default()
    }

    fn has_active_document(&self) -> bool {
        self.document().is_some()
    }

    // --- View transitions ---------------------------------------------

    /// Home → CourseDetail. Unknown courses and other views are ignored.
    pub fn select_course(&mut self, course_id: &str) -> bool {
        if !self.catalog.iter().any(|c| c.id == course_id) {
            warn!("ignoring selection of unknown course '{course_id}'");
            return false;
        }
        let event = ViewEvent::SelectCourse(course_id.to_string());
        match view_transition(self.view, &event, self.has_active_document(), self.status) {
            Some(next) => {
                self.view = next;
                self.active_course = Some(course_id.to_string());
                info!("course '{course_id}' selected");
                true
            }
            None => false,
        }
    }

    /// Chat → CourseDetail, CourseDetail → Home. Returning home clears the
    /// selection and the chapter focus; leaving any screen abandons a
    /// pending upload and drops a lingering error status.
    pub fn back(&mut self) -> bool {
        match view_transition(self.view, &ViewEvent::Back, self.has_active_document(), self.status)
        {
            Some(next) => {
                if matches!(self.status, Status::FileProcessing | Status::Error) {
                    self.status = Status::Idle;
                }
                if next == View::Home {
                    self.active_course = None;
                    self.chapter_focus.clear();
                }
                self.view = next;
                true
            }
            None => false,
        }
    }

    /// CourseDetail → Chat, only when a document is attached and the
    /// session is idle.
    pub fn start_chat(&mut self) -> bool {
        match view_transition(
            self.view,
            &ViewEvent::StartChat,
            self.has_active_document(),
            self.status,
        ) {
            Some(next) => {
                self.view = next;
                true
            }
            None => {
                warn!("start chat ignored: no document attached or session busy");
                false
            }
        }
    }

    /// Sets the chapter-focus hint for gateway calls. Empty means the
    /// whole document. Only meaningful on the course setup screen.
    pub fn set_chapter_focus(&mut self, focus: &str) -> bool {
        if self.view != View::CourseDetail {
            return false;
        }
        self.chapter_focus = focus.to_string();
        true
    }

    // --- Document upload ----------------------------------------------

    /// Marks the start of an upload: status goes idle → file_processing.
    /// Refused unless the course setup screen is showing and the session
    /// is idle.
    pub fn begin_upload(&mut self) -> bool {
        if self.view != View::CourseDetail
            || self.status != Status::Idle
            || self.active_course.is_none()
        {
            return false;
        }
        self.status = Status::FileProcessing;
        true
    }

    /// Validates and stores the received payload, replacing any document
    /// previously attached to the course. The status returns to idle
    /// whether or not the upload is accepted; a rejected upload stores
    /// nothing, and no partial document ever exists.
    pub fn finish_upload(
        &mut self,
        filename: &str,
        media_type: &str,
        bytes: Bytes,
    ) -> Result<DocumentRef, UploadError> {
        if self.status != Status::FileProcessing {
            return Err(UploadError::Aborted);
        }
        self.status = Status::Idle;
        let Some(course_id) = self.active_course.clone() else {
            return Err(UploadError::Aborted);
        };

        let replacing = self.registry.get(&course_id).is_some();
        let reference = self.registry.attach(&course_id, bytes, filename, media_type)?;
        if replacing && self.policy.clear_transcript_on_replace {
            self.transcripts.clear(&course_id);
        }
        info!(
            course = %course_id,
            file = %reference.filename,
            size_bytes = reference.size_bytes,
            "curriculum document attached"
        );
        Ok(reference)
    }

    /// Abandons an upload after a transport or decoding failure. Nothing
    /// is stored and the status returns to idle.
    pub fn abort_upload(&mut self) {
        if self.status == Status::FileProcessing {
            self.status = Status::Idle;
        }
    }

    /// Detaches the current document (the "change" action). Idempotent;
    /// the scope and the transcript side effect follow the session policy.
    pub fn clear_document(&mut self) -> bool {
        if self.view != View::CourseDetail {
            return false;
        }
        let Some(course_id) = self.active_course.clone() else {
            return false;
        };
        match self.policy.document_clear_scope {
            ClearScope::ActiveCourse => {
                self.registry.clear(&course_id);
                if self.policy.clear_transcript_on_replace {
                    self.transcripts.clear(&course_id);
                }
            }
            ClearScope::AllCourses => {
                self.registry.clear_all();
                if self.policy.clear_transcript_on_replace {
                    self.transcripts.clear_all();
                }
            }
        }
        true
    }

    // --- Question exchange --------------------------------------------

    /// First half of an exchange: validates the guards, records the user's
    /// turn, sets status to processing, and captures everything the
    /// gateway call needs. The history snapshot excludes the question
    /// being asked.
    pub fn begin_question(&mut self, text: &str) -> Result<QuestionTurn, SendRejected> {
        if self.view != View::Chat {
            return Err(SendRejected::NotInChat);
        }
        if text.trim().is_empty() {
            return Err(SendRejected::EmptyQuestion);
        }
        if self.status == Status::Processing {
            return Err(SendRejected::Busy);
        }
        let Some(course_id) = self.active_course.clone() else {
            return Err(SendRejected::NotInChat);
        };
        let Some(document) = self.registry.document(&course_id).cloned() else {
            return Err(SendRejected::NoDocument);
        };

        let history = self
            .transcripts
            .list(&course_id)
            .iter()
            .map(|m| (m.role, m.content.clone()))
            .collect();
        self.transcripts.append(&course_id, Message::user(text));
        self.status = Status::Processing;

        Ok(QuestionTurn {
            course_id,
            question: text.to_string(),
            document,
            history,
            chapter_focus: self.chapter_focus.clone(),
        })
    }

    /// Second half of an exchange: records the outcome. The user's turn
    /// stays in the transcript even when the gateway fails.
    pub fn complete_question(&mut self, turn: &QuestionTurn, outcome: Result<String, GatewayError>) {
        match outcome {
            Ok(answer) => {
                self.transcripts
                    .append(&turn.course_id, Message::assistant(answer));
                self.status = Status::Idle;
            }
            Err(error) => {
                warn!(course = %turn.course_id, %error, "answer gateway failed");
                self.transcripts
                    .append(&turn.course_id, Message::assistant(error.user_notice()));
                self.status = Status::Error;
            }
        }
    }

    /// Runs a full exchange against the given gateway. Rejected sends are
    /// no-ops and report why.
    pub async fn send_question(
        &mut self,
        gateway: &dyn AnswerGateway,
        text: &str,
    ) -> Result<(), SendRejected> {
        let turn = self.begin_question(text)?;
        let outcome = gateway
            .ask(
                &turn.question,
                &turn.document,
                &turn.history,
                &turn.chapter_focus,
            )
            .await;
        self.complete_question(&turn, outcome);
        Ok(())
    }
}
