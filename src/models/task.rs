use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use validator::{Validate, ValidationError};

use crate::error::AppError;
use crate::models::patch::Patch;
use crate::models::user::validate_not_blank;
use crate::models::user::UserSummary;

/// Represents the priority of a task.
/// Corresponds to the `task_priority` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    /// Low priority.
    Low,
    /// Medium priority.
    #[default]
    Medium,
    /// High priority.
    High,
    /// Critical priority.
    Critical,
}

/// Represents the status of a task.
/// Corresponds to the `task_status` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task is yet to be started.
    #[default]
    Todo,
    /// Task is currently being worked on.
    InProgress,
    /// Task is completed.
    Done,
}

/// Input structure for creating a task.
/// Contains validation rules for its fields.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TaskInput {
    /// The project the task belongs to. It must exist.
    pub project_id: i32,

    /// The title of the task.
    /// Must be between 1 and 200 characters.
    #[validate(length(min = 1, max = 200), custom = "validate_not_blank")]
    pub title: String,

    /// An optional description for the task.
    /// Maximum length of 2000 characters if provided.
    #[validate(length(max = 2000))]
    pub description: Option<String>,

    /// Defaults to `medium`.
    pub priority: Option<TaskPriority>,

    /// Defaults to `todo`.
    pub status: Option<TaskStatus>,

    /// Optional due date for the task.
    pub due_date: Option<NaiveDate>,
}

fn validate_update_description(update: &TaskUpdate) -> Result<(), ValidationError> {
    match &update.description {
        Patch::Value(text) if text.chars().count() > 2000 => {
            let mut error = ValidationError::new("length");
            error.message = Some("description must be at most 2000 characters".into());
            Err(error)
        }
        _ => Ok(()),
    }
}

/// Partial update of a task. Absent fields are left unchanged; `description` and
/// `due_date` may be cleared with an explicit `null`.
#[derive(Debug, Default, Deserialize, Validate)]
#[validate(schema(function = "validate_update_description"))]
pub struct TaskUpdate {
    #[validate(length(min = 1, max = 200), custom = "validate_not_blank")]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Patch<String>,
    #[serde(default)]
    pub due_date: Patch<NaiveDate>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    /// Moves the task to another project.
    pub project_id: Option<i32>,
}

impl TaskUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_unset()
            && self.due_date.is_unset()
            && self.status.is_none()
            && self.priority.is_none()
            && self.project_id.is_none()
    }
}

/// Represents a task entity as stored in the database and returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    /// Unique identifier for the task.
    pub id: i32,
    /// The project the task belongs to.
    pub project_id: i32,
    /// The title of the task.
    pub title: String,
    /// An optional description for the task.
    pub description: Option<String>,
    /// The current status of the task.
    pub status: TaskStatus,
    /// The priority of the task.
    pub priority: TaskPriority,
    /// Optional due date for the task.
    pub due_date: Option<NaiveDate>,
    /// Timestamp of when the task was created.
    pub created_at: DateTime<Utc>,
}

/// A task together with the users assigned to it.
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskWithAssignees {
    #[serde(flatten)]
    pub task: Task,
    pub users: Vec<UserSummary>,
}

/// Represents query parameters for filtering tasks when listing them.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TaskQuery {
    /// Filter tasks by status.
    pub status: Option<TaskStatus>,
    /// Filter tasks by priority.
    pub priority: Option<TaskPriority>,
    /// Search term to filter tasks by title or description (case-insensitive).
    pub search: Option<String>,
}

/// Replaces the full set of users assigned to a task.
#[derive(Debug, Deserialize)]
pub struct AssignUsersRequest {
    pub user_ids: Vec<i32>,
}

impl AssignUsersRequest {
    /// The requested user ids, sorted and without duplicates.
    pub fn distinct_user_ids(&self) -> Vec<i32> {
        let mut ids = self.user_ids.clone();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

#[derive(FromRow)]
struct AssigneeRow {
    task_id: i32,
    id: i32,
    name: String,
    email: String,
}

const TASK_COLUMNS: &str =
    "t.id, t.project_id, t.title, t.description, t.status, t.priority, t.due_date, t.created_at";

impl Task {
    pub async fn create(pool: &PgPool, input: &TaskInput) -> Result<Task, AppError> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "INSERT INTO tasks AS t (project_id, title, description, status, priority, due_date) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            TASK_COLUMNS
        ))
        .bind(input.project_id)
        .bind(input.title.trim())
        .bind(&input.description)
        .bind(input.status.unwrap_or_default())
        .bind(input.priority.unwrap_or_default())
        .bind(input.due_date)
        .fetch_one(pool)
        .await?;
        Ok(task)
    }

    pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Task>, AppError> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks t WHERE t.id = $1",
            TASK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(task)
    }

    /// Tasks in every project the user owns or is a member of, filtered by `query`.
    /// Ordered by creation date, newest first.
    pub async fn list_visible_to(
        pool: &PgPool,
        user_id: i32,
        query: &TaskQuery,
    ) -> Result<Vec<Task>, AppError> {
        let mut builder = sqlx::QueryBuilder::<sqlx::Postgres>::new(format!(
            "SELECT {} FROM tasks t JOIN projects p ON p.id = t.project_id \
             WHERE (p.owner_id = ",
            TASK_COLUMNS
        ));
        builder
            .push_bind(user_id)
            .push(
                " OR EXISTS (SELECT 1 FROM project_members pm \
                 WHERE pm.project_id = p.id AND pm.user_id = ",
            )
            .push_bind(user_id)
            .push("))");

        if let Some(status) = query.status {
            builder.push(" AND t.status = ").push_bind(status);
        }
        if let Some(priority) = query.priority {
            builder.push(" AND t.priority = ").push_bind(priority);
        }
        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", escape_like(search));
            builder
                .push(" AND (t.title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR t.description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        builder.push(" ORDER BY t.created_at DESC, t.id DESC");

        let tasks = builder.build_query_as::<Task>().fetch_all(pool).await?;
        Ok(tasks)
    }

    pub async fn list_by_project(
        pool: &PgPool,
        project_id: i32,
    ) -> Result<Vec<TaskWithAssignees>, AppError> {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks t WHERE t.project_id = $1 ORDER BY t.created_at, t.id",
            TASK_COLUMNS
        ))
        .bind(project_id)
        .fetch_all(pool)
        .await?;

        let task_ids: Vec<i32> = tasks.iter().map(|task| task.id).collect();
        let rows = sqlx::query_as::<_, AssigneeRow>(
            "SELECT ta.task_id, u.id, u.name, u.email FROM task_assignments ta \
             JOIN users u ON u.id = ta.user_id \
             WHERE ta.task_id = ANY($1) ORDER BY u.id",
        )
        .bind(task_ids)
        .fetch_all(pool)
        .await?;

        let mut assignees: HashMap<i32, Vec<UserSummary>> = HashMap::new();
        for row in rows {
            assignees.entry(row.task_id).or_default().push(UserSummary {
                id: row.id,
                name: row.name,
                email: row.email,
            });
        }

        Ok(tasks
            .into_iter()
            .map(|task| {
                let users = assignees.remove(&task.id).unwrap_or_default();
                TaskWithAssignees { task, users }
            })
            .collect())
    }

    /// Tasks the user is assigned to.
    pub async fn list_assigned_to(pool: &PgPool, user_id: i32) -> Result<Vec<Task>, AppError> {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks t JOIN task_assignments ta ON ta.task_id = t.id \
             WHERE ta.user_id = $1 ORDER BY t.due_date NULLS LAST, t.id",
            TASK_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(tasks)
    }

    pub async fn update(pool: &PgPool, id: i32, changes: &TaskUpdate) -> Result<Task, AppError> {
        let mut builder = sqlx::QueryBuilder::<sqlx::Postgres>::new("UPDATE tasks AS t SET ");
        let mut fields = builder.separated(", ");

        if let Some(title) = &changes.title {
            fields.push("title = ").push_bind_unseparated(title.trim().to_string());
        }
        if let Some(description) = changes.description.as_change() {
            fields
                .push("description = ")
                .push_bind_unseparated(description.cloned());
        }
        if let Some(due_date) = changes.due_date.as_change() {
            fields
                .push("due_date = ")
                .push_bind_unseparated(due_date.copied());
        }
        if let Some(status) = changes.status {
            fields.push("status = ").push_bind_unseparated(status);
        }
        if let Some(priority) = changes.priority {
            fields.push("priority = ").push_bind_unseparated(priority);
        }
        if let Some(project_id) = changes.project_id {
            fields.push("project_id = ").push_bind_unseparated(project_id);
        }

        builder.push(" WHERE t.id = ").push_bind(id);
        builder.push(format!(" RETURNING {}", TASK_COLUMNS));

        let task = builder.build_query_as::<Task>().fetch_one(pool).await?;
        Ok(task)
    }

    pub async fn delete(pool: &PgPool, id: i32) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn assignees(pool: &PgPool, task_id: i32) -> Result<Vec<UserSummary>, AppError> {
        let users = sqlx::query_as::<_, UserSummary>(
            "SELECT u.id, u.name, u.email FROM users u \
             JOIN task_assignments ta ON ta.user_id = u.id \
             WHERE ta.task_id = $1 ORDER BY u.id",
        )
        .bind(task_id)
        .fetch_all(pool)
        .await?;
        Ok(users)
    }

    /// Replaces the task's assignees with `user_ids` in one transaction. An unknown
    /// user id aborts the whole replacement.
    pub async fn replace_assignees(
        pool: &PgPool,
        task_id: i32,
        user_ids: &[i32],
    ) -> Result<(), AppError> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM task_assignments WHERE task_id = $1")
            .bind(task_id)
            .execute(&mut *tx)
            .await?;

        if !user_ids.is_empty() {
            sqlx::query(
                "INSERT INTO task_assignments (task_id, user_id) \
                 SELECT $1, UNNEST($2::int4[])",
            )
            .bind(task_id)
            .bind(user_ids)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

/// Escapes `LIKE` wildcards so a search term matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn input(title: &str, description: Option<String>) -> TaskInput {
        TaskInput {
            project_id: 1,
            title: title.to_string(),
            description,
            priority: Some(TaskPriority::High),
            status: None,
            due_date: None,
        }
    }

    #[test]
    fn test_task_input_validation() {
        assert!(input("Valid Title", Some("Test Description".into()))
            .validate()
            .is_ok());
        assert!(input("", None).validate().is_err(), "empty title");
        assert!(input("   ", None).validate().is_err(), "whitespace title");
        assert!(input(&"a".repeat(201), None).validate().is_err(), "long title");
        assert!(
            input("Valid", Some("b".repeat(2001))).validate().is_err(),
            "long description"
        );
    }

    #[test]
    fn test_task_input_defaults() {
        let parsed: TaskInput =
            serde_json::from_str(r#"{"project_id": 3, "title": "Write report"}"#).unwrap();
        assert_eq!(parsed.status.unwrap_or_default(), TaskStatus::Todo);
        assert_eq!(parsed.priority.unwrap_or_default(), TaskPriority::Medium);
        assert!(serde_json::from_str::<TaskInput>(r#"{"title": "No project"}"#).is_err());
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(
            serde_json::to_value(TaskStatus::InProgress).unwrap(),
            serde_json::json!("in_progress")
        );
        assert_eq!(
            serde_json::to_value(TaskPriority::Critical).unwrap(),
            serde_json::json!("critical")
        );
    }

    #[test]
    fn test_task_update() {
        let update: TaskUpdate =
            serde_json::from_str(r#"{"due_date": null, "status": "done"}"#).unwrap();
        assert_eq!(update.due_date, Patch::Null);
        assert_eq!(update.status, Some(TaskStatus::Done));
        assert!(!update.is_empty());
        assert!(TaskUpdate::default().is_empty());

        let blank_title = TaskUpdate {
            title: Some(String::new()),
            ..Default::default()
        };
        assert!(blank_title.validate().is_err());

        let whitespace_title = TaskUpdate {
            title: Some(" \t ".to_string()),
            ..Default::default()
        };
        assert!(whitespace_title.validate().is_err());
    }

    #[test]
    fn test_task_update_description_length() {
        let long = TaskUpdate {
            description: Patch::Value("d".repeat(2001)),
            ..Default::default()
        };
        assert!(long.validate().is_err());

        let at_limit = TaskUpdate {
            description: Patch::Value("d".repeat(2000)),
            ..Default::default()
        };
        assert!(at_limit.validate().is_ok());

        let cleared = TaskUpdate {
            description: Patch::Null,
            ..Default::default()
        };
        assert!(cleared.validate().is_ok());
    }

    #[test]
    fn test_distinct_user_ids() {
        let request = AssignUsersRequest {
            user_ids: vec![3, 1, 3, 2, 1],
        };
        assert_eq!(request.distinct_user_ids(), vec![1, 2, 3]);
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn test_task_with_assignees_flattens() {
        let task = Task {
            id: 1,
            project_id: 2,
            title: "Write report".into(),
            description: None,
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            due_date: None,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(TaskWithAssignees {
            task,
            users: vec![UserSummary {
                id: 4,
                name: "Ada".into(),
                email: "ada@example.com".into(),
            }],
        })
        .unwrap();

        assert_eq!(json["title"], "Write report");
        assert_eq!(json["users"][0]["id"], 4);
    }
}
