//! API service routes

pub mod chats;
pub mod generate;
pub mod tasks;
pub mod users;

use axum::{
    Json, Router, middleware,
    response::IntoResponse,
    routing::{get, patch, post, put},
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::{middleware::auth_middleware, state::AppState};

/// Create the router for the API service
///
/// Registration, login, the admin presence read, the conversation
/// proxy, and the root greeting are public; everything else sits behind
/// the authentication middleware.
pub fn create_router(state: AppState, cors: CorsLayer) -> Router {
    let protected_routes = Router::new()
        .route("/users/me", get(users::me))
        .route("/users/all", get(users::list_all))
        .route("/users/:id", get(users::get_user))
        .route("/tasks", post(tasks::create_task).get(tasks::list_tasks))
        .route("/tasks/summary", get(tasks::task_summary))
        .route(
            "/tasks/:id",
            put(tasks::update_task).delete(tasks::delete_task),
        )
        .route("/tasks/:id/assign/:user_id", put(tasks::assign_task))
        .route("/tasks/:id/complete", patch(tasks::complete_task))
        .route(
            "/chats/admin",
            post(chats::create_admin_chat).get(chats::get_admin_chat),
        )
        .route("/chats/admin/message", post(chats::send_message))
        .route("/chats/admin/reply/:chat_id", post(chats::admin_reply))
        .route("/chats/admin/all", get(chats::list_admin_chats))
        .route("/chats/admin/read/:chat_id", put(chats::mark_read))
        .route("/chats/admin/unread", get(chats::unread_counts))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/", get(home))
        .route("/users/register", post(users::register))
        .route("/users/token", post(users::login))
        // Presence read is public; the write authenticates inside the
        // handler because it shares the path with the public read
        .route(
            "/chats/admin/status",
            get(chats::get_status).put(chats::set_status),
        )
        .route("/generate", post(generate::generate))
        .merge(protected_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Root greeting
pub async fn home() -> impl IntoResponse {
    Json(json!({
        "message": "Welcome to the Task Management API!"
    }))
}
