use actix_cors::Cors;
use actix_web::{http::header, middleware::Logger, web, App, HttpServer};
use std::io;

use taskboard::{
    auth::{AuthMiddleware, CredentialHasher, TokenService},
    config::Config,
    db, routes,
};

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
    log::error!("{}: {}", context, err);
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(|e| startup_error("Invalid configuration", e))?;

    let pool = db::connect(&config.database_url)
        .await
        .map_err(|e| startup_error("Failed to connect to database", e))?;

    if config.run_migrations {
        db::run_migrations(&pool)
            .await
            .map_err(|e| startup_error("Failed to run migrations", e))?;
    }

    let tokens = web::Data::new(TokenService::new(
        &config.jwt_secret,
        chrono::Duration::minutes(config.token_ttl_minutes),
    ));
    let hasher = web::Data::new(
        CredentialHasher::new(config.bcrypt_cost)
            .map_err(|e| startup_error("Failed to initialise password hasher", e))?,
    );
    let pool = web::Data::new(pool);
    let allowed_origin = config.cors_allowed_origin.clone();

    log::info!("Starting Taskboard server at {}", config.server_url());
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&allowed_origin)
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
            .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE])
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(pool.clone())
            .app_data(tokens.clone())
            .app_data(hasher.clone())
            .service(routes::health::health)
            .service(
                web::scope("/api")
                    .wrap(AuthMiddleware)
                    .configure(routes::config),
            )
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
