//! Project membership model and database operations.
//!
//! A membership pairs a project with a user and grants a project-scoped role,
//! independent of the user's global role. Each (project, user) pair appears at most
//! once; adding it twice is a `Conflict`.
//!
//! ```sql
//! CREATE TYPE project_role AS ENUM ('owner', 'editor', 'viewer');
//!
//! CREATE TABLE project_members (
//!     project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
//!     user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
//!     role project_role NOT NULL DEFAULT 'viewer',
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     PRIMARY KEY (project_id, user_id)
//! );
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::error::AppError;

/// Role a member holds within one project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProjectRole {
    /// Same rights as the project's owner.
    Owner,
    /// Reads and edits the project and its tasks.
    Editor,
    /// Read-only access.
    #[default]
    Viewer,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProjectMembership {
    pub project_id: i32,
    pub user_id: i32,
    pub role: ProjectRole,
    pub created_at: DateTime<Utc>,
}

/// Request body for adding a member. The role defaults to `viewer`.
#[derive(Debug, Deserialize)]
pub struct MembershipInput {
    pub user_id: i32,
    #[serde(default)]
    pub role: ProjectRole,
}

impl ProjectMembership {
    /// Gets the user's role in a project, if they are a member.
    pub async fn role_of(
        pool: &PgPool,
        project_id: i32,
        user_id: i32,
    ) -> Result<Option<ProjectRole>, AppError> {
        let role = sqlx::query_scalar::<_, ProjectRole>(
            "SELECT role FROM project_members WHERE project_id = $1 AND user_id = $2",
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
        Ok(role)
    }

    pub async fn list(pool: &PgPool, project_id: i32) -> Result<Vec<ProjectMembership>, AppError> {
        let members = sqlx::query_as::<_, ProjectMembership>(
            "SELECT project_id, user_id, role, created_at FROM project_members \
             WHERE project_id = $1 ORDER BY created_at, user_id",
        )
        .bind(project_id)
        .fetch_all(pool)
        .await?;
        Ok(members)
    }

    pub async fn add(
        pool: &PgPool,
        project_id: i32,
        input: &MembershipInput,
    ) -> Result<ProjectMembership, AppError> {
        let membership = sqlx::query_as::<_, ProjectMembership>(
            "INSERT INTO project_members (project_id, user_id, role) VALUES ($1, $2, $3) \
             RETURNING project_id, user_id, role, created_at",
        )
        .bind(project_id)
        .bind(input.user_id)
        .bind(input.role)
        .fetch_one(pool)
        .await?;
        Ok(membership)
    }

    pub async fn remove(pool: &PgPool, project_id: i32, user_id: i32) -> Result<bool, AppError> {
        let result =
            sqlx::query("DELETE FROM project_members WHERE project_id = $1 AND user_id = $2")
                .bind(project_id)
                .bind(user_id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership_input_defaults_to_viewer() {
        let input: MembershipInput = serde_json::from_str(r#"{"user_id": 4}"#).unwrap();
        assert_eq!(input.user_id, 4);
        assert_eq!(input.role, ProjectRole::Viewer);

        let editor: MembershipInput =
            serde_json::from_str(r#"{"user_id": 4, "role": "editor"}"#).unwrap();
        assert_eq!(editor.role, ProjectRole::Editor);
    }

    #[test]
    fn test_unknown_role_rejected() {
        assert!(serde_json::from_str::<MembershipInput>(r#"{"user_id": 4, "role": "admin"}"#).is_err());
    }
}
