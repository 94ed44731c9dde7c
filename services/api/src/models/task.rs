//! Task model, list filters, and the summary report

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Task entity
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub priority: i32,
    pub due_date: Option<DateTime<Utc>>,
    pub owner_id: i64,
    pub assigned_to_id: Option<i64>,
}

fn default_priority() -> i32 {
    3
}

/// Payload for task creation and full-replace updates
#[derive(Debug, Clone, Deserialize)]
pub struct TaskPayload {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    /// Only honored at creation; updates never touch the assignment.
    #[serde(default)]
    pub assigned_to_id: Option<i64>,
}

/// Raw query parameters for task listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskListQuery {
    pub completed: Option<bool>,
    pub priority: Option<i32>,
    pub due_date: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

/// Sort column for task listing, restricted to a fixed set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    DueDate,
    Priority,
    Title,
}

impl SortField {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortField::DueDate => "due_date",
            SortField::Priority => "priority",
            SortField::Title => "title",
        }
    }

    fn parse(value: &str) -> Result<Self, String> {
        match value {
            "due_date" => Ok(SortField::DueDate),
            "priority" => Ok(SortField::Priority),
            "title" => Ok(SortField::Title),
            other => Err(format!("Invalid sort_by value: {other}")),
        }
    }
}

/// Sort direction for task listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    fn parse(value: &str) -> Result<Self, String> {
        match value {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(format!("Invalid sort_order value: {other}")),
        }
    }
}

/// Validated task listing filter
#[derive(Debug, Clone)]
pub struct TaskFilter {
    pub completed: Option<bool>,
    pub priority: Option<i32>,
    pub due_date: Option<DateTime<Utc>>,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
}

impl Default for TaskFilter {
    fn default() -> Self {
        Self {
            completed: None,
            priority: None,
            due_date: None,
            sort_by: SortField::DueDate,
            sort_order: SortOrder::Asc,
        }
    }
}

impl TaskFilter {
    /// Validate raw query parameters.
    ///
    /// The 1..=5 priority range is only enforced here, at the filter
    /// layer; writes accept any integer. See DESIGN.md for the open
    /// product question around the priority domain.
    pub fn from_query(query: TaskListQuery) -> Result<Self, String> {
        if let Some(priority) = query.priority {
            if !(1..=5).contains(&priority) {
                return Err(format!("Priority must be between 1 and 5, got {priority}"));
            }
        }

        let due_date = match query.due_date.as_deref() {
            Some(raw) => {
                let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .map_err(|_| format!("Invalid due_date value: {raw}, expected YYYY-MM-DD"))?;
                let midnight = date
                    .and_hms_opt(0, 0, 0)
                    .ok_or_else(|| format!("Invalid due_date value: {raw}"))?;
                Some(midnight.and_utc())
            }
            None => None,
        };

        let sort_by = match query.sort_by.as_deref() {
            Some(raw) => SortField::parse(raw)?,
            None => SortField::DueDate,
        };

        let sort_order = match query.sort_order.as_deref() {
            Some(raw) => SortOrder::parse(raw)?,
            None => SortOrder::Asc,
        };

        Ok(Self {
            completed: query.completed,
            priority: query.priority,
            due_date,
            sort_by,
            sort_order,
        })
    }
}

/// Visibility scope for task queries: admins see everything, everyone
/// else sees only tasks they own or are assigned to.
#[derive(Debug, Clone, Copy)]
pub enum TaskScope {
    All,
    User(i64),
}

/// Task statistics report.
///
/// The priority buckets cover values 1 to 3 only, as shipped. Tasks with
/// priority 4 or 5 count toward the totals but no bucket.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TaskSummary {
    #[serde(rename = "totalTasks")]
    pub total_tasks: usize,
    #[serde(rename = "completedTasks")]
    pub completed_tasks: usize,
    #[serde(rename = "pendingTasks")]
    pub pending_tasks: usize,
    #[serde(rename = "highPriority")]
    pub high_priority: usize,
    #[serde(rename = "mediumPriority")]
    pub medium_priority: usize,
    #[serde(rename = "lowPriority")]
    pub low_priority: usize,
}

/// Compute the summary report over an already-scoped task list
pub fn summarize(tasks: &[Task]) -> TaskSummary {
    TaskSummary {
        total_tasks: tasks.len(),
        completed_tasks: tasks.iter().filter(|t| t.completed).count(),
        pending_tasks: tasks.iter().filter(|t| !t.completed).count(),
        high_priority: tasks.iter().filter(|t| t.priority == 1).count(),
        medium_priority: tasks.iter().filter(|t| t.priority == 2).count(),
        low_priority: tasks.iter().filter(|t| t.priority == 3).count(),
    }
}
