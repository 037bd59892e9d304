//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser client and the API server
//! for the curriculum chat application.

use curriculum_chat_core::domain::{Course, MessageRole, Status, View};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================
// NOTE: The uploaded document's bytes are sent as raw Binary frames between
// `begin_upload` and `end_upload`, not as part of this enum.
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Opens the setup screen for one course from the home screen.
    SelectCourse { course_id: String },

    /// Returns to the previous screen.
    Back,

    /// Sets the chapter-focus hint for subsequent questions. An empty string
    /// means the whole document.
    SetChapterFocus { focus: String },

    /// Announces an upload. The document's bytes follow as Binary frames.
    BeginUpload { filename: String, media_type: String },

    /// Marks the end of the Binary frames; the server validates and stores
    /// the buffered document.
    EndUpload,

    /// Abandons an upload mid-flight (e.g. the client's file read failed).
    AbortUpload,

    /// Detaches the current document (the "change document" action).
    ClearDocument,

    /// Moves from the setup screen to the chat screen.
    StartChat,

    /// Submits a question for the active course.
    SendQuestion { text: String },
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// A catalog entry as exposed to clients.
#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct CourseSummary {
    pub id: String,
    pub name: String,
    pub english_name: String,
    pub icon: String,
}

impl From<&Course> for CourseSummary {
    fn from(course: &Course) -> Self {
        Self {
            id: course.id.clone(),
            name: course.name.clone(),
            english_name: course.english_name.clone(),
            icon: course.icon.clone(),
        }
    }
}

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent once on connect; carries the course catalog for the home screen.
    SessionReady { courses: Vec<CourseSummary> },

    /// The session moved to another screen.
    ViewChanged { view: View },

    /// The session's operation status changed.
    StatusChanged { status: Status },

    /// An upload was validated and stored.
    DocumentAttached { filename: String, size_bytes: u64 },

    /// The current document was detached.
    DocumentCleared,

    /// An upload was refused; the message is ready for display.
    UploadRejected { message: String },

    /// A message was appended to the active course's transcript.
    MessageAppended { role: MessageRole, content: String },

    /// Reports an error to the client, which should display an error message.
    Error { message: String },
}
