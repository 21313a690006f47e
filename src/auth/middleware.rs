use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::Method,
    web, Error, HttpMessage, ResponseError,
};
use futures::future::{ready, LocalBoxFuture, Ready};

use crate::auth::extractors::resolve_identity;
use crate::auth::token::TokenService;
use crate::error::AppError;

/// `POST` routes under the wrapped scope that do not require a token.
const PUBLIC_PATHS: &[&str] = &["/api/auth/login", "/api/auth/register"];

/// Rejects requests without a valid bearer token before they reach a handler, and
/// stores the resolved [`AuthenticatedUser`](crate::auth::AuthenticatedUser) in the
/// request extensions for the extractor to pick up.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService { service }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
}

fn is_public(req: &ServiceRequest) -> bool {
    *req.method() == Method::POST && PUBLIC_PATHS.contains(&req.path().trim_end_matches('/'))
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if !is_public(&req) {
            let resolved = match req.app_data::<web::Data<TokenService>>() {
                Some(tokens) => resolve_identity(req.headers(), tokens),
                None => Err(AppError::Internal("Token service is not configured".into())),
            };

            match resolved {
                Ok(user) => {
                    req.extensions_mut().insert(user);
                }
                Err(app_err) => {
                    log::warn!("Rejected {} {}: {}", req.method(), req.path(), app_err);
                    let response = req
                        .into_response(app_err.error_response())
                        .map_into_right_body();
                    return Box::pin(async move { Ok(response) });
                }
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthenticatedUser;
    use actix_web::http::{header::AUTHORIZATION, StatusCode};
    use actix_web::{test, App, HttpResponse};
    use chrono::Duration;

    async fn whoami(user: AuthenticatedUser) -> HttpResponse {
        HttpResponse::Ok().json(user)
    }

    async fn open() -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    fn tokens() -> TokenService {
        TokenService::new("middleware-test-secret", Duration::minutes(60))
    }

    #[actix_rt::test]
    async fn test_protected_route_requires_token() {
        let app = test::init_service(
            App::new().app_data(web::Data::new(tokens())).service(
                web::scope("/api")
                    .wrap(AuthMiddleware)
                    .route("/whoami", web::get().to(whoami)),
            ),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/whoami").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["kind"], "unauthenticated");
    }

    #[actix_rt::test]
    async fn test_valid_token_reaches_handler() {
        let tokens = tokens();
        let token = tokens.issue(5, None).unwrap();
        let app = test::init_service(
            App::new().app_data(web::Data::new(tokens)).service(
                web::scope("/api")
                    .wrap(AuthMiddleware)
                    .route("/whoami", web::get().to(whoami)),
            ),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/whoami")
            .insert_header((AUTHORIZATION, format!("Bearer {}", token)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["id"], 5);
    }

    #[actix_rt::test]
    async fn test_forged_token_is_rejected() {
        let forged = TokenService::new("someone-elses-secret", Duration::minutes(60))
            .issue(5, None)
            .unwrap();
        let app = test::init_service(
            App::new().app_data(web::Data::new(tokens())).service(
                web::scope("/api")
                    .wrap(AuthMiddleware)
                    .route("/whoami", web::get().to(whoami)),
            ),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/whoami")
            .insert_header((AUTHORIZATION, format!("Bearer {}", forged)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_rt::test]
    async fn test_public_routes_skip_authentication() {
        let app = test::init_service(
            App::new().app_data(web::Data::new(tokens())).service(
                web::scope("/api")
                    .wrap(AuthMiddleware)
                    .route("/auth/login", web::post().to(open))
                    .route("/auth/register", web::post().to(open))
                    .route("/auth/login", web::get().to(open)),
            ),
        )
        .await;

        for uri in ["/api/auth/login", "/api/auth/register"] {
            let req = test::TestRequest::post().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK, "{}", uri);
        }

        // Only POST is public.
        let req = test::TestRequest::get().uri("/api/auth/login").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
