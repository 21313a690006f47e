use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{MembershipInput, Project, ProjectInput, ProjectMembership, ProjectUpdate, Task},
    policy::{authorize_project, ProjectAction},
};
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use sqlx::PgPool;
use validator::Validate;

/// Lists the projects the caller owns or is a member of, newest first.
#[get("")]
pub async fn get_projects(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let projects = Project::list_for_user(&pool, user.id).await?;
    Ok(HttpResponse::Ok().json(projects))
}

/// Creates a project owned by the caller.
///
/// ## Responses:
/// - `201 Created`: the new `Project`.
/// - `422 Unprocessable Entity`: the name is empty or too long, or `end_date` precedes
///   `start_date`.
#[post("")]
pub async fn create_project(
    pool: web::Data<PgPool>,
    project_data: web::Json<ProjectInput>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    project_data.validate()?;

    let project = Project::create(&pool, &project_data, user.id).await?;
    log::info!("User {} created project {}", user.id, project.id);
    Ok(HttpResponse::Created().json(project))
}

#[get("/{id}")]
pub async fn get_project(
    pool: web::Data<PgPool>,
    project_id: web::Path<i32>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let project =
        authorize_project(&pool, &user, project_id.into_inner(), ProjectAction::Read).await?;
    Ok(HttpResponse::Ok().json(project))
}

/// Applies a partial update to a project.
///
/// Editors and owners may update; transferring ownership through `owner_id` requires
/// the right to manage members.
#[put("/{id}")]
pub async fn update_project(
    pool: web::Data<PgPool>,
    project_id: web::Path<i32>,
    changes: web::Json<ProjectUpdate>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    changes.validate()?;
    if changes.is_empty() {
        return Err(AppError::BadRequest("No fields to update".into()));
    }

    let action = if changes.changes_owner() {
        ProjectAction::ManageMembers
    } else {
        ProjectAction::Update
    };
    let project = authorize_project(&pool, &user, project_id.into_inner(), action).await?;
    changes.validate_against(&project)?;

    let updated = Project::update(&pool, project.id, &changes).await?;
    Ok(HttpResponse::Ok().json(updated))
}

/// Deletes a project together with its tasks and memberships.
#[delete("/{id}")]
pub async fn delete_project(
    pool: web::Data<PgPool>,
    project_id: web::Path<i32>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let project =
        authorize_project(&pool, &user, project_id.into_inner(), ProjectAction::Delete).await?;

    if !Project::delete(&pool, project.id).await? {
        return Err(AppError::NotFound("Project not found".into()));
    }

    log::info!("User {} deleted project {}", user.id, project.id);
    Ok(HttpResponse::NoContent().finish())
}

#[get("/{id}/members")]
pub async fn get_members(
    pool: web::Data<PgPool>,
    project_id: web::Path<i32>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let project =
        authorize_project(&pool, &user, project_id.into_inner(), ProjectAction::Read).await?;
    let members = ProjectMembership::list(&pool, project.id).await?;
    Ok(HttpResponse::Ok().json(members))
}

/// Adds a member to a project.
///
/// ## Responses:
/// - `201 Created`: the new `ProjectMembership`.
/// - `404 Not Found`: the project or the user does not exist.
/// - `409 Conflict`: the user is already a member.
#[post("/{id}/members")]
pub async fn add_member(
    pool: web::Data<PgPool>,
    project_id: web::Path<i32>,
    member: web::Json<MembershipInput>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let project = authorize_project(
        &pool,
        &user,
        project_id.into_inner(),
        ProjectAction::ManageMembers,
    )
    .await?;

    let membership = ProjectMembership::add(&pool, project.id, &member).await?;
    log::info!(
        "User {} added user {} to project {} as {:?}",
        user.id,
        membership.user_id,
        project.id,
        membership.role
    );
    Ok(HttpResponse::Created().json(membership))
}

#[delete("/{id}/members/{user_id}")]
pub async fn remove_member(
    pool: web::Data<PgPool>,
    path: web::Path<(i32, i32)>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let (project_id, member_id) = path.into_inner();
    let project =
        authorize_project(&pool, &user, project_id, ProjectAction::ManageMembers).await?;

    if !ProjectMembership::remove(&pool, project.id, member_id).await? {
        return Err(AppError::NotFound("Membership not found".into()));
    }
    Ok(HttpResponse::NoContent().finish())
}

/// Lists a project's tasks, each with the users assigned to it.
#[get("/{id}/tasks")]
pub async fn get_project_tasks(
    pool: web::Data<PgPool>,
    project_id: web::Path<i32>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let project =
        authorize_project(&pool, &user, project_id.into_inner(), ProjectAction::ReadTasks)
            .await?;
    let tasks = Task::list_by_project(&pool, project.id).await?;
    Ok(HttpResponse::Ok().json(tasks))
}
