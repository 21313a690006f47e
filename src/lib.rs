#![doc = "The `taskboard` library crate."]
#![doc = ""]
#![doc = "Domain models, authentication, project access policy, routing configuration and"]
#![doc = "error handling for the Taskboard API. The binary (`main.rs`) wires them into an"]
#![doc = "`actix-web` server; integration tests build the same app from these parts."]

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod policy;
pub mod routes;

pub use crate::error::AppError;
