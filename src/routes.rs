//! Route registration.

use crate::handlers::{api, pages};
use crate::state::AppState;
use crate::web::dispatch::route;
use crate::web::middleware::log_requests;
use axum::{middleware, routing::get, Json, Router};
use serde_json::json;
use tower_http::limit::RequestBodyLimitLayer;

const MAX_BODY_BYTES: usize = 1024 * 1024;

pub fn build(state: AppState) -> Router {
    let mut router = Router::new().route("/health", get(health));

    router = route(router, state.clone(), &pages::INDEX, pages::index);
    router = route(router, state.clone(), &pages::BLOG_DETAIL, pages::blog_detail);
    router = route(router, state.clone(), &pages::REGISTER, pages::register);
    router = route(router, state.clone(), &pages::SIGNIN, pages::signin);
    router = route(router, state.clone(), &pages::SIGNOUT, pages::signout);
    router = route(router, state.clone(), &pages::MANAGE_BLOGS, pages::manage_blogs);
    router = route(
        router,
        state.clone(),
        &pages::MANAGE_BLOG_CREATE,
        pages::manage_blog_create,
    );
    router = route(
        router,
        state.clone(),
        &pages::MANAGE_BLOG_EDIT,
        pages::manage_blog_edit,
    );
    router = route(
        router,
        state.clone(),
        &pages::MANAGE_COMMENTS,
        pages::manage_comments,
    );
    router = route(router, state.clone(), &pages::MANAGE_USERS, pages::manage_users);

    router = route(router, state.clone(), &api::API_USERS, api::api_users);
    router = route(router, state.clone(), &api::API_REGISTER, api::api_register);
    router = route(
        router,
        state.clone(),
        &api::API_AUTHENTICATE,
        api::api_authenticate,
    );
    router = route(router, state.clone(), &api::API_BLOGS, api::api_blogs);
    router = route(router, state.clone(), &api::API_GET_BLOG, api::api_get_blog);
    router = route(
        router,
        state.clone(),
        &api::API_CREATE_BLOG,
        api::api_create_blog,
    );
    router = route(
        router,
        state.clone(),
        &api::API_UPDATE_BLOG,
        api::api_update_blog,
    );
    router = route(
        router,
        state.clone(),
        &api::API_DELETE_BLOG,
        api::api_delete_blog,
    );
    router = route(router, state.clone(), &api::API_COMMENTS, api::api_comments);
    router = route(
        router,
        state.clone(),
        &api::API_CREATE_COMMENT,
        api::api_create_comment,
    );
    router = route(
        router,
        state,
        &api::API_DELETE_COMMENT,
        api::api_delete_comment,
    );

    router
        .layer(middleware::from_fn(log_requests))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
