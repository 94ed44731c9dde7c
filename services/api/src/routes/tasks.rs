//! Task routes: CRUD, assignment, completion, listing, and the summary
//! report
//!
//! Every mutation may trigger email notifications; those are dispatched
//! fire-and-forget and never affect the response.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    error::{ApiError, ApiResult},
    models::task::{TaskFilter, TaskListQuery, TaskPayload, TaskScope, summarize},
    models::user::User,
    policy::{Action, authorize},
    state::AppState,
};

fn scope_for(user: &User) -> TaskScope {
    if user.role.is_admin() {
        TaskScope::All
    } else {
        TaskScope::User(user.id)
    }
}

/// Create a task (admin only), owned by the creator
pub async fn create_task(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<TaskPayload>,
) -> ApiResult<impl IntoResponse> {
    authorize(&user, Action::CreateTask)?;

    let task = state.task_repository.create(user.id, &payload).await?;

    state.mailer.spawn_send(
        &user.email,
        "Task Created",
        &format!("Your task '{}' has been created.", task.title),
    );

    Ok(Json(task))
}

/// Assign a task to another user (admin only)
pub async fn assign_task(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path((task_id, user_id)): Path<(i64, i64)>,
) -> ApiResult<impl IntoResponse> {
    authorize(&user, Action::AssignTask)?;

    let task = state
        .task_repository
        .find(task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    let assignee = state
        .user_repository
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let task = state.task_repository.assign(task.id, assignee.id).await?;

    state.mailer.spawn_send(
        &assignee.email,
        "New Task Assigned",
        &format!("You have been assigned a new task: '{}'.", task.title),
    );

    Ok(Json(json!({
        "message": format!(
            "Task '{}' assigned to user {} successfully!",
            task.title, assignee.username
        )
    })))
}

/// Full replace of a task's mutable fields (owner or admin)
pub async fn update_task(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(task_id): Path<i64>,
    Json(payload): Json<TaskPayload>,
) -> ApiResult<impl IntoResponse> {
    let task = state
        .task_repository
        .find(task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    authorize(&user, Action::UpdateTask(&task))?;

    let task = state.task_repository.update(task.id, &payload).await?;

    Ok(Json(task))
}

/// Delete a task (owner or admin)
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(task_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let task = state
        .task_repository
        .find(task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    authorize(&user, Action::DeleteTask(&task))?;

    state.task_repository.delete(task.id).await?;

    // Notify the owner when their row still resolves
    if let Some(owner) = state.user_repository.find_by_id(task.owner_id).await? {
        state.mailer.spawn_send(
            &owner.email,
            "Task Deleted",
            &format!("Your task '{}' has been deleted.", task.title),
        );
    }

    Ok(Json(json!({"message": "Task deleted successfully"})))
}

/// Mark a task completed (owner or assignee)
pub async fn complete_task(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(task_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let task = state
        .task_repository
        .find(task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    authorize(&user, Action::CompleteTask(&task))?;

    state.task_repository.set_completed(task.id).await?;

    if let Some(owner) = state.user_repository.find_by_id(task.owner_id).await? {
        state.mailer.spawn_send(
            &owner.email,
            "Task Completed",
            &format!("Your task '{}' has been completed.", task.title),
        );
    }

    if let Some(assignee_id) = task.assigned_to_id {
        if let Some(assignee) = state.user_repository.find_by_id(assignee_id).await? {
            state.mailer.spawn_send(
                &assignee.email,
                "Task Marked as Completed",
                &format!("The task '{}' assigned to you has been completed.", task.title),
            );
        }
    }

    Ok(Json(json!({"message": "Task marked as completed"})))
}

/// List tasks with filtering and sorting. Admins see everything, other
/// callers see the tasks they own or are assigned to.
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(query): Query<TaskListQuery>,
) -> ApiResult<impl IntoResponse> {
    let filter = TaskFilter::from_query(query).map_err(ApiError::Validation)?;

    let tasks = state
        .task_repository
        .list(scope_for(&user), &filter)
        .await?;

    Ok(Json(tasks))
}

/// Task statistics with the same visibility scoping as listing
pub async fn task_summary(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> ApiResult<impl IntoResponse> {
    let tasks = state
        .task_repository
        .list(scope_for(&user), &TaskFilter::default())
        .await?;

    Ok(Json(summarize(&tasks)))
}
