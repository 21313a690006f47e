use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use validator::{Validate, ValidationError};

use crate::error::AppError;
use crate::models::patch::Patch;
use crate::models::user::validate_not_blank;

/// Lifecycle status of a project.
/// Corresponds to the `project_status` SQL enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    #[default]
    Active,
    Archived,
}

/// Represents a project as stored in the database and returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Project {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: ProjectStatus,
    /// The owner has full control. Null once the owning user is deleted.
    pub owner_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

fn check_date_range(
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> Result<(), ValidationError> {
    match (start_date, end_date) {
        (Some(start), Some(end)) if end < start => {
            let mut error = ValidationError::new("date_range");
            error.message = Some("end_date must not be before start_date".into());
            Err(error)
        }
        _ => Ok(()),
    }
}

fn validate_input_dates(input: &ProjectInput) -> Result<(), ValidationError> {
    check_date_range(input.start_date, input.end_date)
}

/// Input structure for creating a project. The creator becomes its owner.
#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "validate_input_dates", skip_on_field_errors = false))]
pub struct ProjectInput {
    #[validate(length(min = 1, max = 200), custom = "validate_not_blank")]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<ProjectStatus>,
}

fn validate_update_description(update: &ProjectUpdate) -> Result<(), ValidationError> {
    match &update.description {
        Patch::Value(text) if text.chars().count() > 2000 => {
            let mut error = ValidationError::new("length");
            error.message = Some("description must be at most 2000 characters".into());
            Err(error)
        }
        _ => Ok(()),
    }
}

/// Partial update of a project.
///
/// `description`, the dates and `owner_id` are nullable columns and use [`Patch`] so
/// that an explicit `null` clears them.
#[derive(Debug, Default, Deserialize, Validate)]
#[validate(schema(function = "validate_update_description"))]
pub struct ProjectUpdate {
    #[validate(length(min = 1, max = 200), custom = "validate_not_blank")]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Patch<String>,
    #[serde(default)]
    pub start_date: Patch<NaiveDate>,
    #[serde(default)]
    pub end_date: Patch<NaiveDate>,
    pub status: Option<ProjectStatus>,
    #[serde(default)]
    pub owner_id: Patch<i32>,
}

impl ProjectUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_unset()
            && self.start_date.is_unset()
            && self.end_date.is_unset()
            && self.status.is_none()
            && self.owner_id.is_unset()
    }

    pub fn changes_owner(&self) -> bool {
        !self.owner_id.is_unset()
    }

    /// Checks the date range that would result from applying this update to `current`.
    pub fn validate_against(&self, current: &Project) -> Result<(), AppError> {
        check_date_range(
            self.start_date.apply(current.start_date),
            self.end_date.apply(current.end_date),
        )
        .map_err(|e| {
            AppError::ValidationFailed(
                e.message
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string()),
            )
        })
    }
}

const PROJECT_COLUMNS: &str =
    "id, name, description, start_date, end_date, status, owner_id, created_at";

impl Project {
    pub async fn create(
        pool: &PgPool,
        input: &ProjectInput,
        owner_id: i32,
    ) -> Result<Project, AppError> {
        let project = sqlx::query_as::<_, Project>(&format!(
            "INSERT INTO projects (name, description, start_date, end_date, status, owner_id) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            PROJECT_COLUMNS
        ))
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(input.status.unwrap_or_default())
        .bind(owner_id)
        .fetch_one(pool)
        .await?;
        Ok(project)
    }

    pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Project>, AppError> {
        let project = sqlx::query_as::<_, Project>(&format!(
            "SELECT {} FROM projects WHERE id = $1",
            PROJECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(project)
    }

    /// Projects the user owns or holds any membership in, each listed once.
    pub async fn list_for_user(pool: &PgPool, user_id: i32) -> Result<Vec<Project>, AppError> {
        let projects = sqlx::query_as::<_, Project>(&format!(
            "SELECT {} FROM projects p \
             WHERE p.owner_id = $1 \
                OR EXISTS (SELECT 1 FROM project_members pm \
                           WHERE pm.project_id = p.id AND pm.user_id = $1) \
             ORDER BY p.created_at DESC, p.id DESC",
            PROJECT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(projects)
    }

    pub async fn update(
        pool: &PgPool,
        id: i32,
        changes: &ProjectUpdate,
    ) -> Result<Project, AppError> {
        let mut builder = sqlx::QueryBuilder::<sqlx::Postgres>::new("UPDATE projects SET ");
        let mut fields = builder.separated(", ");

        if let Some(name) = &changes.name {
            fields.push("name = ").push_bind_unseparated(name.trim().to_string());
        }
        if let Some(description) = changes.description.as_change() {
            fields
                .push("description = ")
                .push_bind_unseparated(description.cloned());
        }
        if let Some(start_date) = changes.start_date.as_change() {
            fields
                .push("start_date = ")
                .push_bind_unseparated(start_date.copied());
        }
        if let Some(end_date) = changes.end_date.as_change() {
            fields
                .push("end_date = ")
                .push_bind_unseparated(end_date.copied());
        }
        if let Some(status) = changes.status {
            fields.push("status = ").push_bind_unseparated(status);
        }
        if let Some(owner_id) = changes.owner_id.as_change() {
            fields
                .push("owner_id = ")
                .push_bind_unseparated(owner_id.copied());
        }

        builder.push(" WHERE id = ").push_bind(id);
        builder.push(format!(" RETURNING {}", PROJECT_COLUMNS));

        let project = builder.build_query_as::<Project>().fetch_one(pool).await?;
        Ok(project)
    }

    pub async fn delete(pool: &PgPool, id: i32) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
