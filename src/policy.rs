//! Project-scoped access control.
//!
//! Every project and task operation is checked against the caller's relation to the
//! project: its owner, a member with a [`ProjectRole`], or nobody. The decision itself
//! ([`authorize`]) is pure; [`authorize_project`] and [`authorize_task`] load the rows it
//! needs. Tasks carry no access list of their own and inherit their project's policy.

use std::fmt;

use sqlx::PgPool;

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::models::{Project, ProjectMembership, ProjectRole, Task};

/// Operations guarded by the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectAction {
    Read,
    Update,
    Delete,
    ManageMembers,
    ReadTasks,
    WriteTasks,
}

impl fmt::Display for ProjectAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProjectAction::Read => "read",
            ProjectAction::Update => "update",
            ProjectAction::Delete => "delete",
            ProjectAction::ManageMembers => "manage members of",
            ProjectAction::ReadTasks => "read tasks of",
            ProjectAction::WriteTasks => "modify tasks of",
        };
        f.write_str(name)
    }
}

/// How a user relates to a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessLevel {
    /// The user is the project's `owner_id`.
    Owner,
    Member(ProjectRole),
}

impl AccessLevel {
    /// Ownership wins over any membership row the owner also holds.
    pub fn resolve(
        user_id: i32,
        owner_id: Option<i32>,
        membership: Option<ProjectRole>,
    ) -> Option<AccessLevel> {
        if owner_id == Some(user_id) {
            return Some(AccessLevel::Owner);
        }
        membership.map(AccessLevel::Member)
    }

    pub fn permits(self, action: ProjectAction) -> bool {
        use ProjectAction::*;

        match self {
            AccessLevel::Owner | AccessLevel::Member(ProjectRole::Owner) => true,
            AccessLevel::Member(ProjectRole::Editor) => {
                matches!(action, Read | Update | ReadTasks | WriteTasks)
            }
            AccessLevel::Member(ProjectRole::Viewer) => matches!(action, Read | ReadTasks),
        }
    }
}

/// Decides whether `user_id` may perform `action` on a project owned by `owner_id`,
/// given the user's membership role in it.
pub fn authorize(
    user_id: i32,
    owner_id: Option<i32>,
    membership: Option<ProjectRole>,
    action: ProjectAction,
) -> Result<AccessLevel, AppError> {
    match AccessLevel::resolve(user_id, owner_id, membership) {
        Some(level) if level.permits(action) => Ok(level),
        _ => Err(AppError::Forbidden(format!(
            "You are not allowed to {} this project",
            action
        ))),
    }
}

/// Loads the project and checks `action` against it.
pub async fn authorize_project(
    pool: &PgPool,
    user: &AuthenticatedUser,
    project_id: i32,
    action: ProjectAction,
) -> Result<Project, AppError> {
    let project = Project::find_by_id(pool, project_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".into()))?;

    let membership = if project.owner_id == Some(user.id) {
        None
    } else {
        ProjectMembership::role_of(pool, project.id, user.id).await?
    };

    if let Err(e) = authorize(user.id, project.owner_id, membership, action) {
        log::debug!(
            "User {} denied {:?} on project {}",
            user.id,
            action,
            project.id
        );
        return Err(e);
    }
    Ok(project)
}

/// Loads the task and checks `action` against the project it belongs to.
pub async fn authorize_task(
    pool: &PgPool,
    user: &AuthenticatedUser,
    task_id: i32,
    action: ProjectAction,
) -> Result<Task, AppError> {
    let task = Task::find_by_id(pool, task_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))?;

    authorize_project(pool, user, task.project_id, action).await?;
    Ok(task)
}
