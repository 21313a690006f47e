#![allow(dead_code)]

use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::{header, StatusCode};
use actix_web::middleware::Logger;
use actix_web::{body::MessageBody, test, web, App};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use taskboard::auth::{AuthMiddleware, CredentialHasher, TokenService};
use taskboard::routes::{self, health};
use uuid::Uuid;

pub const TEST_SECRET: &str = "integration-test-secret-of-sufficient-length";

/// Connects to `DATABASE_URL` and applies migrations.
///
/// Tests using it are `#[ignore]`d and run with `cargo test -- --ignored` against a
/// disposable Postgres database.
pub async fn test_pool() -> PgPool {
    dotenv::dotenv().ok();
    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for database tests");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&database_url)
        .await
        .expect("Failed to connect to test DB");

    taskboard::db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations on test DB");
    pool
}

/// A pool that never connects, for requests rejected before any query runs.
pub fn unreachable_pool() -> PgPool {
    PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(500))
        .connect_lazy("postgres://nobody@127.0.0.1:1/unreachable")
        .expect("Failed to build lazy pool")
}

pub fn token_service() -> TokenService {
    TokenService::new(TEST_SECRET, chrono::Duration::minutes(60))
}

pub async fn test_app(
    pool: PgPool,
) -> impl Service<actix_http::Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error>
{
    test::init_service(
        App::new()
            .app_data(web::Data::new(pool))
            .app_data(web::Data::new(token_service()))
            .app_data(web::Data::new(
                CredentialHasher::new(4).expect("Failed to build hasher"),
            ))
            .wrap(Logger::default())
            .service(health::health)
            .service(
                web::scope("/api")
                    .wrap(AuthMiddleware)
                    .configure(routes::config),
            ),
    )
    .await
}

/// Sends `req` and returns the status with the JSON body (`Null` when empty).
pub async fn send(
    app: &impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    req: actix_http::Request,
) -> (StatusCode, Value) {
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|_| {
            panic!("Non-JSON body: {:?}", String::from_utf8_lossy(&body))
        })
    };
    (status, json)
}

pub fn authed(req: test::TestRequest, token: &str) -> test::TestRequest {
    req.append_header((header::AUTHORIZATION, format!("Bearer {}", token)))
}

pub fn unique_email(prefix: &str) -> String {
    format!("{}-{}@example.com", prefix, Uuid::new_v4())
}

pub async fn cleanup_user(pool: &PgPool, email: &str) {
    let _ = sqlx::query("DELETE FROM users WHERE email = $1")
        .bind(email)
        .execute(pool)
        .await;
}

pub async fn cleanup_project(pool: &PgPool, project_id: i64) {
    let _ = sqlx::query("DELETE FROM projects WHERE id = $1")
        .bind(project_id as i32)
        .execute(pool)
        .await;
}

pub struct TestUser {
    pub id: i32,
    pub email: String,
    pub token: String,
}

pub async fn register_and_login(
    app: &impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    prefix: &str,
) -> TestUser {
    let email = unique_email(prefix);
    let password = "Password123!";

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({ "name": prefix, "email": email, "password": password }))
        .to_request();
    let (status, body) = send(app, req).await;
    assert_eq!(status, StatusCode::CREATED, "Registration failed: {}", body);

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": email, "password": password }))
        .to_request();
    let (status, body) = send(app, req).await;
    assert_eq!(status, StatusCode::OK, "Login failed: {}", body);

    TestUser {
        id: body["id"].as_i64().expect("login id") as i32,
        email,
        token: body["token"].as_str().expect("login token").to_string(),
    }
}

/// Creates a project owned by `owner` and returns its id.
pub async fn create_project(
    app: &impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    owner: &TestUser,
    name: &str,
) -> i64 {
    let req = authed(test::TestRequest::post().uri("/api/projects"), &owner.token)
        .set_json(json!({ "name": name }))
        .to_request();
    let (status, body) = send(app, req).await;
    assert_eq!(status, StatusCode::CREATED, "Project creation failed: {}", body);
    body["id"].as_i64().expect("project id")
}

pub async fn add_member(
    app: &impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    owner: &TestUser,
    project_id: i64,
    member: &TestUser,
    role: &str,
) -> StatusCode {
    let req = authed(
        test::TestRequest::post().uri(&format!("/api/projects/{}/members", project_id)),
        &owner.token,
    )
    .set_json(json!({ "user_id": member.id, "role": role }))
    .to_request();
    send(app, req).await.0
}
