//! services/api/src/web/state.rs
//!
//! Defines the application's shared and connection-specific states.

use crate::config::Config;
use curriculum_chat_core::domain::Course;
use curriculum_chat_core::ports::AnswerGateway;
use curriculum_chat_core::SessionController;
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub gateway: Arc<dyn AnswerGateway>,
    pub catalog: Vec<Course>,
}

//=========================================================================================
// ConnectionState (Specific to One WebSocket Connection)
//=========================================================================================

/// A document upload in progress: the declared metadata plus the Binary
/// frames buffered so far.
pub struct PendingUpload {
    pub filename: String,
    pub media_type: String,
    pub buffer: Vec<u8>,
}

/// The state for a single, active WebSocket connection. Each connection owns
/// its own session controller, so sessions are isolated per user.
pub struct ConnectionState {
    pub controller: SessionController,
    pub pending_upload: Option<PendingUpload>,
}

impl ConnectionState {
    pub fn new(app_state: &AppState) -> Self {
        Self {
            controller: SessionController::new(
                app_state.catalog.clone(),
                app_state.config.session_policy(),
            ),
            pending_upload: None,
        }
    }
}
