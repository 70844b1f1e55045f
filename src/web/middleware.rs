//! Fixed, linear middleware: request logging before dispatch; response
//! coercion (the second hook) runs inside the dispatch boundary via
//! [`crate::web::reply::respond`].

use axum::{extract::Request, middleware::Next, response::Response};

/// Log method and path, then delegate to the next stage.
pub async fn log_requests(req: Request, next: Next) -> Response {
    tracing::info!(method = %req.method(), path = %req.uri().path(), "request");
    next.run(req).await
}
