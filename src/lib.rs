//! A small blog application: declarative route dispatch over axum and a
//! micro-ORM over PostgreSQL.
//!
//! Entities are declared as metadata ([`orm::EntityMeta`]) from which the
//! four statement shapes (select, insert, update, delete) are generated once.
//! Routes are declared as [`web::RouteSpec`] values that drive argument
//! binding, and handlers return a [`web::Reply`] that the response boundary
//! coerces into an HTTP response.

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod orm;
pub mod pagination;
pub mod routes;
pub mod state;
pub mod web;

pub use config::Config;
pub use error::ApiError;
pub use state::AppState;
