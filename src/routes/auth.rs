use crate::{
    auth::{CredentialHasher, LoginRequest, LoginResponse, RegisterRequest, TokenService},
    error::AppError,
    models::user::{normalize_email, NewUser, User, UserRole},
};
use actix_web::{post, web, HttpResponse, Responder};
use sqlx::PgPool;
use validator::Validate;

/// Register a new user
///
/// Creates a new account and returns it without its password digest.
/// A duplicate email is a `409 Conflict`; asking for the `admin` role is a `403`.
#[post("/register")]
pub async fn register(
    pool: web::Data<PgPool>,
    hasher: web::Data<CredentialHasher>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    register_data.validate()?;

    let role = register_data.role.unwrap_or_default();
    if role == UserRole::Admin {
        return Err(AppError::Forbidden(
            "Registration cannot grant the admin role".into(),
        ));
    }

    let password_hash = hasher.hash(&register_data.password)?;

    let user = User::create(
        &pool,
        &NewUser {
            name: register_data.name.trim().to_string(),
            email: normalize_email(&register_data.email),
            password_hash,
            role,
        },
    )
    .await?;

    log::info!("Registered user {}", user.id);
    Ok(HttpResponse::Created().json(user))
}

/// Login user
///
/// Authenticates a user by email and password and returns a bearer token.
/// An unknown email and a wrong password are indistinguishable to the caller.
#[post("/login")]
pub async fn login(
    pool: web::Data<PgPool>,
    hasher: web::Data<CredentialHasher>,
    tokens: web::Data<TokenService>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    login_data.validate()?;

    let email = normalize_email(&login_data.email);
    let credentials = match User::credentials_by_email(&pool, &email).await? {
        Some(credentials) if hasher.verify(&login_data.password, &credentials.password_hash) => {
            credentials
        }
        Some(credentials) => {
            log::info!("Failed login for user {}", credentials.id);
            return Err(AppError::Unauthenticated("Invalid credentials".into()));
        }
        None => {
            hasher.verify_decoy(&login_data.password);
            log::info!("Failed login for unknown email");
            return Err(AppError::Unauthenticated("Invalid credentials".into()));
        }
    };

    let token = tokens.issue(credentials.id, None)?;

    Ok(HttpResponse::Ok().json(LoginResponse {
        id: credentials.id,
        name: credentials.name,
        email: credentials.email,
        role: credentials.role,
        token,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::test;
    use serde_json::json;
    use sqlx::postgres::PgPoolOptions;

    // The pool is never used: each request is rejected before reaching the store.
    fn unused_pool() -> PgPool {
        PgPoolOptions::new()
            .connect_lazy("postgres://nobody@127.0.0.1:1/unused")
            .unwrap()
    }

    #[actix_rt::test]
    async fn test_register_validation() {
        let app = test::init_service(
            actix_web::App::new()
                .app_data(web::Data::new(unused_pool()))
                .app_data(web::Data::new(CredentialHasher::new(4).unwrap()))
                .service(register),
        )
        .await;

        let cases = vec![
            (
                json!({ "name": "Ada", "email": "invalid-email", "password": "pw1" }),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                json!({ "name": "Ada", "email": "a@x.com", "password": "" }),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                json!({ "name": "Ada", "email": "a@x.com", "password": "pw1", "role": "admin" }),
                StatusCode::FORBIDDEN,
            ),
        ];

        for (body, expected) in cases {
            let req = test::TestRequest::post()
                .uri("/register")
                .set_json(&body)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), expected, "{}", body);
        }
    }

    #[actix_rt::test]
    async fn test_login_validation() {
        let app = test::init_service(
            actix_web::App::new()
                .app_data(web::Data::new(unused_pool()))
                .app_data(web::Data::new(CredentialHasher::new(4).unwrap()))
                .app_data(web::Data::new(TokenService::new(
                    "login-test-secret",
                    chrono::Duration::minutes(60),
                )))
                .service(login),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/login")
            .set_json(json!({ "email": "invalid-email", "password": "password123" }))
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
