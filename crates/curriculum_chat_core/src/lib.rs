pub mod catalog;
pub mod controller;
pub mod domain;
pub mod ports;
pub mod registry;
pub mod transcript;

pub use controller::{
    ClearScope, QuestionTurn, SendRejected, SessionController, SessionPolicy, UploadError,
};
pub use domain::{Course, CurriculumDocument, DocumentRef, Message, MessageRole, Status, View};
pub use ports::{AnswerGateway, GatewayError};
pub use registry::{AttachError, CurriculumRegistry};
pub use transcript::ConversationStore;
