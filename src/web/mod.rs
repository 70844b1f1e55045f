//! HTTP layer: declarative dispatch, response coercion, middleware,
//! templates, and session cookies.

pub mod dispatch;
pub mod middleware;
pub mod reply;
pub mod session;
pub mod templates;

pub use dispatch::{optional, required, route, Args, Method, Param, RequestInfo, RouteSpec};
pub use reply::{respond, Reply};
