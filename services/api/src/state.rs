//! Application state shared across handlers

use crate::email::Mailer;
use crate::jwt::JwtService;
use crate::llm::{CompletionClient, ConversationStore};
use crate::repositories::{ChatRepository, TaskRepository, UserRepository};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub jwt_service: JwtService,
    pub user_repository: UserRepository,
    pub task_repository: TaskRepository,
    pub chat_repository: ChatRepository,
    pub mailer: Mailer,
    pub completion_client: CompletionClient,
    pub conversations: ConversationStore,
}
