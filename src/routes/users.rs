use crate::{
    auth::{AuthenticatedUser, CredentialHasher},
    error::AppError,
    models::{User, UserRole, UserUpdate},
};
use actix_web::{delete, get, put, web, HttpResponse, Responder};
use sqlx::PgPool;
use validator::Validate;

async fn caller_is_admin(pool: &PgPool, user: &AuthenticatedUser) -> Result<bool, AppError> {
    Ok(User::find_by_id(pool, user.id)
        .await?
        .map_or(false, |caller| caller.role == UserRole::Admin))
}

/// Lists all users.
#[get("")]
pub async fn list_users(
    pool: web::Data<PgPool>,
    _user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let users = User::list(&pool).await?;
    Ok(HttpResponse::Ok().json(users))
}

/// Returns the authenticated user's own record.
#[get("/me")]
pub async fn current_user(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let me = User::find_by_id(&pool, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    Ok(HttpResponse::Ok().json(me))
}

#[get("/{id}")]
pub async fn get_user(
    pool: web::Data<PgPool>,
    user_id: web::Path<i32>,
    _user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let found = User::find_by_id(&pool, user_id.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    Ok(HttpResponse::Ok().json(found))
}

/// Updates a user.
///
/// Users may update themselves; admins may update anyone. Only an admin may change a
/// global role. A new password is re-hashed before it is stored.
///
/// ## Responses:
/// - `200 OK`: the updated `User`.
/// - `400 Bad Request`: the body carries no field to change.
/// - `403 Forbidden`: the caller is neither the user nor an admin.
/// - `409 Conflict`: the new email is already registered.
#[put("/{id}")]
pub async fn update_user(
    pool: web::Data<PgPool>,
    hasher: web::Data<CredentialHasher>,
    user_id: web::Path<i32>,
    changes: web::Json<UserUpdate>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    changes.validate()?;
    if changes.is_empty() {
        return Err(AppError::BadRequest("No fields to update".into()));
    }

    let target_id = user_id.into_inner();
    let is_admin = caller_is_admin(&pool, &user).await?;
    if target_id != user.id && !is_admin {
        return Err(AppError::Forbidden(
            "You may only update your own account".into(),
        ));
    }
    if changes.role.is_some() && !is_admin {
        return Err(AppError::Forbidden("Only admins may change roles".into()));
    }

    let password_hash = changes
        .password
        .as_deref()
        .map(|password| hasher.hash(password))
        .transpose()?;

    let updated = User::update(&pool, target_id, &changes, password_hash.as_deref()).await?;
    log::info!("User {} updated user {}", user.id, updated.id);
    Ok(HttpResponse::Ok().json(updated))
}

#[delete("/{id}")]
pub async fn delete_user(
    pool: web::Data<PgPool>,
    user_id: web::Path<i32>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let target_id = user_id.into_inner();
    if target_id != user.id && !caller_is_admin(&pool, &user).await? {
        return Err(AppError::Forbidden(
            "You may only delete your own account".into(),
        ));
    }

    if !User::delete(&pool, target_id).await? {
        return Err(AppError::NotFound("User not found".into()));
    }

    log::info!("User {} deleted user {}", user.id, target_id);
    Ok(HttpResponse::NoContent().finish())
}
