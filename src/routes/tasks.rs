use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{AssignUsersRequest, Task, TaskInput, TaskQuery, TaskUpdate},
    policy::{authorize_project, authorize_task, ProjectAction},
};
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use sqlx::PgPool;
use validator::Validate;

/// Retrieves the tasks of every project the authenticated user can see.
///
/// ## Query Parameters:
/// - `status` (optional): Filters tasks by their status (`todo`, `in_progress`, `done`).
/// - `priority` (optional): Filters tasks by their priority (`low`, `medium`, `high`, `critical`).
/// - `search` (optional): A string to search for in task titles and descriptions (case-insensitive).
///
/// ## Responses:
/// - `200 OK`: Returns a JSON array of `Task` objects, newest first.
/// - `400 Bad Request`: If a filter value is not recognised.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
#[get("")]
pub async fn get_tasks(
    pool: web::Data<PgPool>,
    query_params: web::Query<TaskQuery>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let tasks = Task::list_visible_to(&pool, user.id, &query_params).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

/// Retrieves the tasks assigned to the authenticated user.
#[get("/assigned")]
pub async fn get_assigned_tasks(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let tasks = Task::list_assigned_to(&pool, user.id).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

/// Creates a new task in a project.
///
/// ## Request Body:
/// A JSON object matching the `TaskInput` struct, including:
/// - `project_id`: The project the task belongs to (required).
/// - `title`: The title of the task (required).
/// - `description` (optional): A description of the task.
/// - `priority` (optional): Defaults to `medium`.
/// - `status` (optional): Defaults to `todo`.
/// - `due_date` (optional): The due date for the task.
///
/// ## Responses:
/// - `201 Created`: Returns the newly created `Task` object as JSON.
/// - `403 Forbidden`: If the caller may not modify the project's tasks.
/// - `404 Not Found`: If the project does not exist.
/// - `422 Unprocessable Entity`: If input validation on `TaskInput` fails.
#[post("")]
pub async fn create_task(
    pool: web::Data<PgPool>,
    task_data: web::Json<TaskInput>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;
    authorize_project(&pool, &user, task_data.project_id, ProjectAction::WriteTasks).await?;

    let task = Task::create(&pool, &task_data).await?;
    Ok(HttpResponse::Created().json(task))
}

/// Retrieves a specific task by its ID.
///
/// ## Responses:
/// - `200 OK`: Returns the `Task` object as JSON.
/// - `403 Forbidden`: If the caller has no access to the task's project.
/// - `404 Not Found`: If the task with the given ID does not exist.
#[get("/{id}")]
pub async fn get_task(
    pool: web::Data<PgPool>,
    task_id: web::Path<i32>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let task = authorize_task(&pool, &user, task_id.into_inner(), ProjectAction::ReadTasks).await?;
    Ok(HttpResponse::Ok().json(task))
}

/// Applies a partial update to a task.
///
/// Moving a task with `project_id` requires write access to both projects.
#[put("/{id}")]
pub async fn update_task(
    pool: web::Data<PgPool>,
    task_id: web::Path<i32>,
    changes: web::Json<TaskUpdate>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    changes.validate()?;
    if changes.is_empty() {
        return Err(AppError::BadRequest("No fields to update".into()));
    }

    let task =
        authorize_task(&pool, &user, task_id.into_inner(), ProjectAction::WriteTasks).await?;
    if let Some(target) = changes.project_id.filter(|target| *target != task.project_id) {
        authorize_project(&pool, &user, target, ProjectAction::WriteTasks).await?;
    }

    let updated = Task::update(&pool, task.id, &changes).await?;
    Ok(HttpResponse::Ok().json(updated))
}

/// Deletes a task by its ID.
///
/// ## Responses:
/// - `204 No Content`: On successful deletion.
/// - `403 Forbidden`: If the caller may not modify the project's tasks.
/// - `404 Not Found`: If the task with the given ID does not exist.
#[delete("/{id}")]
pub async fn delete_task(
    pool: web::Data<PgPool>,
    task_id: web::Path<i32>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let task =
        authorize_task(&pool, &user, task_id.into_inner(), ProjectAction::WriteTasks).await?;

    if !Task::delete(&pool, task.id).await? {
        return Err(AppError::NotFound("Task not found".into()));
    }

    Ok(HttpResponse::NoContent().finish())
}

#[get("/{id}/users")]
pub async fn get_task_users(
    pool: web::Data<PgPool>,
    task_id: web::Path<i32>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let task = authorize_task(&pool, &user, task_id.into_inner(), ProjectAction::ReadTasks).await?;
    let users = Task::assignees(&pool, task.id).await?;
    Ok(HttpResponse::Ok().json(users))
}

/// Replaces the set of users assigned to a task and returns the new set.
///
/// Duplicate ids are ignored. An unknown user id is a `404` and leaves the previous
/// assignments in place.
#[put("/{id}/users")]
pub async fn assign_task_users(
    pool: web::Data<PgPool>,
    task_id: web::Path<i32>,
    assignment: web::Json<AssignUsersRequest>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let task =
        authorize_task(&pool, &user, task_id.into_inner(), ProjectAction::WriteTasks).await?;

    Task::replace_assignees(&pool, task.id, &assignment.distinct_user_ids()).await?;
    let users = Task::assignees(&pool, task.id).await?;
    Ok(HttpResponse::Ok().json(users))
}
