//! Task repository for database operations

use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::info;

use crate::models::task::{Task, TaskFilter, TaskPayload, TaskScope};

const TASK_COLUMNS: &str =
    "id, title, description, completed, priority, due_date, owner_id, assigned_to_id";

fn task_from_row(row: &PgRow) -> Task {
    Task {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        completed: row.get("completed"),
        priority: row.get("priority"),
        due_date: row.get("due_date"),
        owner_id: row.get("owner_id"),
        assigned_to_id: row.get("assigned_to_id"),
    }
}

/// Task repository
#[derive(Clone)]
pub struct TaskRepository {
    pool: PgPool,
}

impl TaskRepository {
    /// Create a new task repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a task owned by `owner_id`
    pub async fn create(&self, owner_id: i64, payload: &TaskPayload) -> Result<Task> {
        info!("Creating task '{}' for owner {}", payload.title, owner_id);

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO tasks (title, description, completed, priority, due_date, owner_id, assigned_to_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(&payload.title)
        .bind(&payload.description)
        .bind(payload.completed)
        .bind(payload.priority)
        .bind(payload.due_date)
        .bind(owner_id)
        .bind(payload.assigned_to_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(task_from_row(&row))
    }

    /// Find a task by ID
    pub async fn find(&self, id: i64) -> Result<Option<Task>> {
        let row = sqlx::query(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(task_from_row))
    }

    /// Set the assignee of a task. Never touches the owner.
    pub async fn assign(&self, task_id: i64, assignee_id: i64) -> Result<Task> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE tasks SET assigned_to_id = $2
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(task_id)
        .bind(assignee_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(task_from_row(&row))
    }

    /// Full replace of the mutable fields. Ownership and assignment are
    /// untouched.
    pub async fn update(&self, task_id: i64, payload: &TaskPayload) -> Result<Task> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE tasks
            SET title = $2, description = $3, completed = $4, priority = $5, due_date = $6
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(task_id)
        .bind(&payload.title)
        .bind(&payload.description)
        .bind(payload.completed)
        .bind(payload.priority)
        .bind(payload.due_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(task_from_row(&row))
    }

    /// Delete a task by ID
    pub async fn delete(&self, task_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(task_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Mark a task completed
    pub async fn set_completed(&self, task_id: i64) -> Result<()> {
        sqlx::query("UPDATE tasks SET completed = TRUE WHERE id = $1")
            .bind(task_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// List tasks visible within `scope`, filtered and sorted
    ///
    /// The sort column and direction come from a fixed whitelist in
    /// [`TaskFilter`], so interpolating them into the statement is safe.
    pub async fn list(&self, scope: TaskScope, filter: &TaskFilter) -> Result<Vec<Task>> {
        let (see_all, user_id) = match scope {
            TaskScope::All => (true, 0),
            TaskScope::User(id) => (false, id),
        };

        let sql = format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks
            WHERE ($1 OR owner_id = $2 OR assigned_to_id = $2)
              AND ($3::boolean IS NULL OR completed = $3)
              AND ($4::integer IS NULL OR priority = $4)
              AND ($5::timestamptz IS NULL OR due_date = $5)
            ORDER BY {} {}
            "#,
            filter.sort_by.as_sql(),
            filter.sort_order.as_sql(),
        );

        let rows = sqlx::query(&sql)
            .bind(see_all)
            .bind(user_id)
            .bind(filter.completed)
            .bind(filter.priority)
            .bind(filter.due_date)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(task_from_row).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::{SortField, SortOrder};
    use crate::repositories::UserRepository;
    use crate::repositories::test_support::{test_pool, unique_suffix};
    use sqlx::PgPool;

    async fn make_user(pool: &PgPool, name: &str) -> i64 {
        let suffix = unique_suffix();
        let username = format!("{name}_{suffix}");
        UserRepository::new(pool.clone())
            .create(&username, &format!("{username}@example.com"), "hunter2abc")
            .await
            .expect("create user")
            .id
    }

    fn payload(title: &str, priority: i32) -> TaskPayload {
        TaskPayload {
            title: title.to_string(),
            description: None,
            completed: false,
            priority,
            due_date: None,
            assigned_to_id: None,
        }
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL"]
    async fn owner_is_immutable_across_assign_and_update() {
        let pool = test_pool().await;
        let repo = TaskRepository::new(pool.clone());
        let owner = make_user(&pool, "owner").await;
        let assignee = make_user(&pool, "assignee").await;

        let task = repo.create(owner, &payload("Ship", 2)).await.expect("create");
        assert_eq!(task.owner_id, owner);
        assert_eq!(task.assigned_to_id, None);

        let task = repo.assign(task.id, assignee).await.expect("assign");
        assert_eq!(task.owner_id, owner);
        assert_eq!(task.assigned_to_id, Some(assignee));

        let task = repo
            .update(task.id, &payload("Ship v2", 1))
            .await
            .expect("update");
        assert_eq!(task.owner_id, owner);
        assert_eq!(task.assigned_to_id, Some(assignee));
        assert_eq!(task.title, "Ship v2");
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL"]
    async fn scope_hides_tasks_from_strangers() {
        let pool = test_pool().await;
        let repo = TaskRepository::new(pool.clone());
        let owner = make_user(&pool, "owner").await;
        let stranger = make_user(&pool, "stranger").await;
        let assignee = make_user(&pool, "assignee").await;

        let task = repo.create(owner, &payload("Scoped", 3)).await.expect("create");

        let filter = TaskFilter::default();
        let visible = repo
            .list(TaskScope::User(stranger), &filter)
            .await
            .expect("list");
        assert!(visible.iter().all(|t| t.id != task.id));

        repo.assign(task.id, assignee).await.expect("assign");
        let visible = repo
            .list(TaskScope::User(assignee), &filter)
            .await
            .expect("list");
        assert!(visible.iter().any(|t| t.id == task.id));
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL"]
    async fn list_filters_by_priority_and_sorts() {
        let pool = test_pool().await;
        let repo = TaskRepository::new(pool.clone());
        let owner = make_user(&pool, "owner").await;

        repo.create(owner, &payload("a", 1)).await.expect("create");
        repo.create(owner, &payload("b", 4)).await.expect("create");
        repo.create(owner, &payload("c", 4)).await.expect("create");

        let filter = TaskFilter {
            priority: Some(4),
            sort_by: SortField::Title,
            sort_order: SortOrder::Desc,
            ..Default::default()
        };
        let tasks = repo
            .list(TaskScope::User(owner), &filter)
            .await
            .expect("list");

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].title, "c");
        assert_eq!(tasks[1].title, "b");
    }
}
