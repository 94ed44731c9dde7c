//! Centralized authorization policy
//!
//! Every protected operation maps to an [`Action`]; handlers call
//! [`authorize`] instead of re-implementing role and ownership checks
//! inline. The table below is the single place that decides who may do
//! what:
//!
//! | Action                     | Allowed callers          |
//! |----------------------------|--------------------------|
//! | create/assign task         | admin                    |
//! | update/delete task         | task owner or admin      |
//! | complete task              | task owner or assignee   |
//! | list/read users            | admin                    |
//! | reply / list admin chats   | admin                    |
//! | mark chat messages read    | chat owner or admin      |
//! | set admin presence         | admin                    |

use crate::error::ApiError;
use crate::models::chat::Chat;
use crate::models::task::Task;
use crate::models::user::User;

/// Protected operation to authorize
#[derive(Debug, Clone, Copy)]
pub enum Action<'a> {
    CreateTask,
    AssignTask,
    UpdateTask(&'a Task),
    DeleteTask(&'a Task),
    CompleteTask(&'a Task),
    ListUsers,
    ReadUser,
    ReplyAdminChat,
    ListAdminChats,
    MarkChatRead(&'a Chat),
    SetAdminStatus,
}

/// Check whether `caller` may perform `action`
pub fn authorize(caller: &User, action: Action<'_>) -> Result<(), ApiError> {
    let allowed = match action {
        Action::CreateTask
        | Action::AssignTask
        | Action::ListUsers
        | Action::ReadUser
        | Action::ReplyAdminChat
        | Action::ListAdminChats
        | Action::SetAdminStatus => caller.role.is_admin(),
        Action::UpdateTask(task) | Action::DeleteTask(task) => {
            task.owner_id == caller.id || caller.role.is_admin()
        }
        Action::CompleteTask(task) => {
            task.owner_id == caller.id || task.assigned_to_id == Some(caller.id)
        }
        Action::MarkChatRead(chat) => chat.user_id == caller.id || caller.role.is_admin(),
    };

    if allowed {
        Ok(())
    } else {
        Err(ApiError::Forbidden(denial_message(action)))
    }
}

fn denial_message(action: Action<'_>) -> String {
    let msg = match action {
        Action::CreateTask => "Only admins can create tasks",
        Action::AssignTask => "Only admins can assign tasks",
        Action::UpdateTask(_) => "Not authorized to update this task",
        Action::DeleteTask(_) => "Not authorized to delete this task",
        Action::CompleteTask(_) => "Not authorized to complete this task",
        Action::ListUsers => "Only admins can view all users",
        Action::ReadUser => "Only admins can access user information",
        Action::ReplyAdminChat => "Only admins can send replies",
        Action::ListAdminChats => "Only admins can view all chats",
        Action::MarkChatRead(_) => "Not authorized to access this chat",
        Action::SetAdminStatus => "Only admins can update status",
    };
    msg.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;
    use chrono::Utc;

    fn user(id: i64, role: Role) -> User {
        User {
            id,
            username: format!("user{id}"),
            email: format!("user{id}@example.com"),
            password_hash: "hash".to_string(),
            role,
        }
    }

    fn task(owner_id: i64, assigned_to_id: Option<i64>) -> Task {
        Task {
            id: 1,
            title: "t".to_string(),
            description: None,
            completed: false,
            priority: 3,
            due_date: None,
            owner_id,
            assigned_to_id,
        }
    }

    fn chat(user_id: i64) -> Chat {
        Chat {
            id: 1,
            user_id,
            title: None,
            is_admin_chat: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn only_admins_create_and_assign_tasks() {
        let admin = user(1, Role::Admin);
        let regular = user(2, Role::User);

        assert!(authorize(&admin, Action::CreateTask).is_ok());
        assert!(authorize(&admin, Action::AssignTask).is_ok());
        assert!(authorize(&regular, Action::CreateTask).is_err());
        assert!(authorize(&regular, Action::AssignTask).is_err());
    }

    #[test]
    fn owner_or_admin_may_update_and_delete() {
        let admin = user(1, Role::Admin);
        let owner = user(2, Role::User);
        let stranger = user(3, Role::User);
        let t = task(owner.id, None);

        assert!(authorize(&owner, Action::UpdateTask(&t)).is_ok());
        assert!(authorize(&admin, Action::DeleteTask(&t)).is_ok());
        assert!(authorize(&stranger, Action::UpdateTask(&t)).is_err());
        assert!(authorize(&stranger, Action::DeleteTask(&t)).is_err());
    }

    #[test]
    fn complete_requires_owner_or_assignee_even_for_admin() {
        let admin = user(1, Role::Admin);
        let owner = user(2, Role::User);
        let assignee = user(3, Role::User);
        let stranger = user(4, Role::User);
        let t = task(owner.id, Some(assignee.id));

        assert!(authorize(&owner, Action::CompleteTask(&t)).is_ok());
        assert!(authorize(&assignee, Action::CompleteTask(&t)).is_ok());
        assert!(authorize(&stranger, Action::CompleteTask(&t)).is_err());
        // Admin role alone does not grant completion
        assert!(authorize(&admin, Action::CompleteTask(&t)).is_err());
    }

    #[test]
    fn chat_read_marking_needs_ownership_or_admin() {
        let admin = user(1, Role::Admin);
        let owner = user(2, Role::User);
        let stranger = user(3, Role::User);
        let c = chat(owner.id);

        assert!(authorize(&owner, Action::MarkChatRead(&c)).is_ok());
        assert!(authorize(&admin, Action::MarkChatRead(&c)).is_ok());
        assert!(authorize(&stranger, Action::MarkChatRead(&c)).is_err());
    }

    #[test]
    fn admin_only_surfaces_forbidden_with_reason() {
        let regular = user(2, Role::User);
        let err = authorize(&regular, Action::SetAdminStatus).unwrap_err();
        match err {
            ApiError::Forbidden(msg) => assert!(msg.contains("admins")),
            other => panic!("expected Forbidden, got {other:?}"),
        }
    }
}
