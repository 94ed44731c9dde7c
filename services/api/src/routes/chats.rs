//! Support-chat routes: per-user admin chats, messages, read marking,
//! unread counts, and admin presence

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
};
use serde_json::{Map, json};

use crate::{
    error::{ApiError, ApiResult},
    middleware::authenticate,
    models::chat::{AdminStatusUpdate, ChatPayload, ChatWithMessages, MessagePayload},
    models::user::User,
    policy::{Action, authorize},
    state::AppState,
};

/// Get or create the caller's admin chat
pub async fn create_admin_chat(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<ChatPayload>,
) -> ApiResult<impl IntoResponse> {
    let chat = state
        .chat_repository
        .get_or_create_admin_chat(user.id, &payload.title)
        .await?;

    let messages = state.chat_repository.messages(chat.id).await?;

    Ok(Json(ChatWithMessages::new(chat, messages)))
}

/// The caller's admin chat with its messages in timestamp order
pub async fn get_admin_chat(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> ApiResult<impl IntoResponse> {
    let chat = state
        .chat_repository
        .find_admin_chat(user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("No active admin chat found".to_string()))?;

    let messages = state.chat_repository.messages(chat.id).await?;

    Ok(Json(ChatWithMessages::new(chat, messages)))
}

/// Post a user-side message, creating the admin chat on first contact
pub async fn send_message(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<MessagePayload>,
) -> ApiResult<impl IntoResponse> {
    let chat = state
        .chat_repository
        .get_or_create_admin_chat(user.id, &format!("Support Chat - {}", user.username))
        .await?;

    let message = state
        .chat_repository
        .add_message(chat.id, user.id, &payload.content, false)
        .await?;

    Ok(Json(message))
}

/// Post an admin-side reply into any chat (admin only)
pub async fn admin_reply(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(chat_id): Path<i64>,
    Json(payload): Json<MessagePayload>,
) -> ApiResult<impl IntoResponse> {
    authorize(&user, Action::ReplyAdminChat)?;

    let chat = state
        .chat_repository
        .find(chat_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Chat not found".to_string()))?;

    let message = state
        .chat_repository
        .add_message(chat.id, user.id, &payload.content, true)
        .await?;

    Ok(Json(message))
}

/// Every admin chat with its full message list (admin only)
pub async fn list_admin_chats(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> ApiResult<impl IntoResponse> {
    authorize(&user, Action::ListAdminChats)?;

    let chats = state.chat_repository.list_admin_chats().await?;

    let mut result = Vec::with_capacity(chats.len());
    for chat in chats {
        let messages = state.chat_repository.messages(chat.id).await?;
        result.push(ChatWithMessages::new(chat, messages));
    }

    Ok(Json(result))
}

/// Mark the other side's messages read.
///
/// An admin caller marks user-authored messages, a user caller marks
/// admin-authored ones; nobody ever flips their own side.
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(chat_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let chat = state
        .chat_repository
        .find(chat_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Chat not found".to_string()))?;

    authorize(&user, Action::MarkChatRead(&chat))?;

    let authored_by_admin = !user.role.is_admin();
    let marked = state
        .chat_repository
        .mark_read(chat.id, authored_by_admin)
        .await?;

    Ok(Json(json!({
        "message": format!("Marked {marked} messages as read")
    })))
}

/// Read the admin presence record (public)
pub async fn get_status(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let status = state.chat_repository.admin_status().await?;
    Ok(Json(status))
}

/// Update the admin presence record (admin only)
///
/// This handler authenticates itself because it shares its path with
/// the public presence read.
pub async fn set_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<AdminStatusUpdate>,
) -> ApiResult<impl IntoResponse> {
    let user = authenticate(&state, &headers).await?;
    authorize(&user, Action::SetAdminStatus)?;

    let status = state
        .chat_repository
        .set_admin_status(payload.is_online)
        .await?;

    Ok(Json(status))
}

/// Unread counts. Admins get a system-wide total plus a per-username
/// breakdown; regular users get the unread admin-authored count in
/// their own chat.
pub async fn unread_counts(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> ApiResult<impl IntoResponse> {
    if user.role.is_admin() {
        let total = state.chat_repository.unread_user_authored_total().await?;
        let breakdown = state.chat_repository.unread_user_authored_by_user().await?;

        let mut by_user = Map::new();
        for (username, count) in breakdown {
            by_user.insert(username, json!(count));
        }

        return Ok(Json(json!({
            "total_unread": total,
            "by_user": by_user,
        })));
    }

    let unread = match state.chat_repository.find_admin_chat(user.id).await? {
        Some(chat) => {
            state
                .chat_repository
                .unread_admin_authored_in(chat.id)
                .await?
        }
        None => 0,
    };

    Ok(Json(json!({ "unread_count": unread })))
}
