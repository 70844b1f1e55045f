//! JSON API handlers.

use crate::error::ApiError;
use crate::handlers::{masked, session_cookie, EMAIL_RE, SHA1_RE};
use crate::models::{next_id, BLOG, COMMENT, USER};
use crate::orm::{Limit, Record, SqlArg};
use crate::pagination::{page_index_from, Page, DEFAULT_PAGE_SIZE};
use crate::state::AppState;
use crate::web::dispatch::{optional, required, Args, RouteSpec};
use crate::web::reply::Reply;
use crate::web::session::{check_passwd, hash_passwd, sha1_hex, user2cookie};
use serde_json::{json, Value};

fn page_from_args(args: &Args) -> u64 {
    page_index_from(&args.opt_str("page").unwrap_or_else(|| "1".into()))
}

async fn paged(
    st: &AppState,
    meta: &'static crate::orm::EntityMeta,
    page_index: u64,
) -> Result<(Page, Vec<Value>), ApiError> {
    let count = meta
        .find_number(&st.db, "count(id)", None, &[])
        .await?
        .unwrap_or(0) as u64;
    let page = Page::new(count, page_index, DEFAULT_PAGE_SIZE);
    if page.is_empty() {
        return Ok((page, Vec::new()));
    }
    let rows = meta
        .find_all(
            &st.db,
            None,
            &[],
            Some("created_at desc"),
            Some(Limit::OffsetCount(page.offset, page.limit)),
        )
        .await?
        .into_iter()
        .map(Record::into_value)
        .collect();
    Ok((page, rows))
}

pub const API_USERS: RouteSpec = RouteSpec::get("/api/users").params(&[optional("page")]);

pub async fn api_users(st: AppState, args: Args) -> Result<Reply, ApiError> {
    let (page, mut users) = paged(&st, &USER, page_from_args(&args)).await?;
    for u in &mut users {
        u["passwd"] = json!(crate::web::session::PASSWD_MASK);
    }
    Ok(Reply::json(json!({ "page": page, "users": users })))
}

pub const API_REGISTER: RouteSpec = RouteSpec::post("/api/users").params(&[
    required("email"),
    required("name"),
    required("passwd"),
]);

pub async fn api_register(st: AppState, args: Args) -> Result<Reply, ApiError> {
    let name = args.str("name")?;
    let email = args.str("email")?;
    let passwd = args.str("passwd")?;
    if name.trim().is_empty() {
        return Err(ApiError::invalid_value("name", "Invalid name."));
    }
    if !EMAIL_RE.is_match(&email) {
        return Err(ApiError::invalid_value("email", "Invalid email."));
    }
    if !SHA1_RE.is_match(&passwd) {
        return Err(ApiError::invalid_value("passwd", "Invalid password."));
    }
    let existing = USER
        .find_all(
            &st.db,
            Some("\"email\" = ?"),
            &[SqlArg::text(email.as_str())],
            None,
            None,
        )
        .await?;
    if !existing.is_empty() {
        return Err(ApiError::api(
            "register:failed",
            "email",
            "Email is already in use.",
        ));
    }
    let uid = next_id();
    let mut user = Record::new();
    user.set("id", json!(uid));
    user.set("name", json!(name.trim()));
    user.set("email", json!(email));
    user.set("passwd", json!(hash_passwd(&uid, &passwd)));
    user.set("admin", json!(false));
    user.set(
        "image",
        json!(format!(
            "https://www.gravatar.com/avatar/{}?d=mm&s=120",
            sha1_hex(&email)
        )),
    );
    USER.save(&st.db, &mut user).await?;
    let cookie = user2cookie(&user, st.config.session.max_age_secs, &st.config.session.secret)
        .ok_or_else(|| ApiError::Internal("session cookie".into()))?;
    Ok(Reply::json_with_cookie(
        masked(user),
        &session_cookie(&st.config.session, &cookie),
    ))
}

pub const API_AUTHENTICATE: RouteSpec =
    RouteSpec::post("/api/authenticate").params(&[required("email"), required("passwd")]);

pub async fn api_authenticate(st: AppState, args: Args) -> Result<Reply, ApiError> {
    let email = args.str("email")?;
    let passwd = args.str("passwd")?;
    if email.is_empty() {
        return Err(ApiError::invalid_value("email", "Invalid email."));
    }
    if passwd.is_empty() {
        return Err(ApiError::invalid_value("passwd", "Invalid password."));
    }
    let mut users = USER
        .find_all(
            &st.db,
            Some("\"email\" = ?"),
            &[SqlArg::text(email.as_str())],
            None,
            None,
        )
        .await?;
    let Some(user) = users.pop() else {
        return Err(ApiError::invalid_value("email", "Email not exist."));
    };
    check_passwd(&user, &passwd)?;
    let cookie = user2cookie(&user, st.config.session.max_age_secs, &st.config.session.secret)
        .ok_or_else(|| ApiError::Internal("session cookie".into()))?;
    tracing::info!(email = %email, "user authenticated");
    Ok(Reply::json_with_cookie(
        masked(user),
        &session_cookie(&st.config.session, &cookie),
    ))
}

pub const API_BLOGS: RouteSpec = RouteSpec::get("/api/blogs").params(&[optional("page")]);

pub async fn api_blogs(st: AppState, args: Args) -> Result<Reply, ApiError> {
    let (page, blogs) = paged(&st, &BLOG, page_from_args(&args)).await?;
    Ok(Reply::json(json!({ "page": page, "blogs": blogs })))
}

pub const API_GET_BLOG: RouteSpec = RouteSpec::get("/api/blogs/:id");

pub async fn api_get_blog(st: AppState, args: Args) -> Result<Reply, ApiError> {
    let id = args.str("id")?;
    let blog = BLOG
        .find(&st.db, &SqlArg::text(id.as_str()))
        .await?
        .ok_or_else(|| ApiError::not_found("blog", "Blog not found."))?;
    Ok(Reply::json(blog.into_value()))
}

pub const API_CREATE_BLOG: RouteSpec = RouteSpec::post("/api/blogs")
    .params(&[required("name"), required("summary"), required("content")])
    .with_request();

pub async fn api_create_blog(st: AppState, args: Args) -> Result<Reply, ApiError> {
    let user = args.req()?.admin()?.clone();
    let name = args.str("name")?;
    let summary = args.str("summary")?;
    let content = args.str("content")?;
    if name.trim().is_empty() {
        return Err(ApiError::invalid_value("name", "name cannot be empty."));
    }
    if summary.trim().is_empty() {
        return Err(ApiError::invalid_value("summary", "summary cannot be empty."));
    }
    if content.trim().is_empty() {
        return Err(ApiError::invalid_value("content", "content cannot be empty."));
    }
    let mut blog = Record::new();
    blog.set("user_id", user.value("id"));
    blog.set("user_name", user.value("name"));
    blog.set("user_image", user.value("image"));
    blog.set("name", json!(name.trim()));
    blog.set("summary", json!(summary.trim()));
    blog.set("content", json!(content.trim()));
    BLOG.save(&st.db, &mut blog).await?;
    Ok(Reply::json(blog.into_value()))
}

pub const API_UPDATE_BLOG: RouteSpec = RouteSpec::post("/api/blogs/:id")
    .params(&[
        required("id"),
        required("name"),
        required("summary"),
        required("content"),
    ])
    .with_request();

pub async fn api_update_blog(st: AppState, args: Args) -> Result<Reply, ApiError> {
    args.req()?.admin()?;
    let id = args.str("id")?;
    let name = args.str("name")?;
    let summary = args.str("summary")?;
    let content = args.str("content")?;
    if name.trim().is_empty() {
        return Err(ApiError::invalid_value("name", "name cannot be empty."));
    }
    if summary.trim().is_empty() {
        return Err(ApiError::invalid_value("summary", "summary cannot be empty."));
    }
    if content.trim().is_empty() {
        return Err(ApiError::invalid_value("content", "content cannot be empty."));
    }
    let mut blog = BLOG
        .find(&st.db, &SqlArg::text(id.as_str()))
        .await?
        .ok_or_else(|| ApiError::not_found("blog", "Blog not found."))?;
    blog.set("name", json!(name.trim()));
    blog.set("summary", json!(summary.trim()));
    blog.set("content", json!(content.trim()));
    BLOG.update(&st.db, &blog).await?;
    Ok(Reply::json(blog.into_value()))
}

pub const API_DELETE_BLOG: RouteSpec = RouteSpec::post("/api/blogs/:id/delete").with_request();

pub async fn api_delete_blog(st: AppState, args: Args) -> Result<Reply, ApiError> {
    args.req()?.admin()?;
    let id = args.str("id")?;
    let blog = BLOG
        .find(&st.db, &SqlArg::text(id.as_str()))
        .await?
        .ok_or_else(|| ApiError::not_found("blog", "Blog not found."))?;
    BLOG.remove(&st.db, &blog).await?;
    Ok(Reply::json(json!({ "id": id })))
}

pub const API_COMMENTS: RouteSpec = RouteSpec::get("/api/comments").params(&[optional("page")]);

pub async fn api_comments(st: AppState, args: Args) -> Result<Reply, ApiError> {
    let (page, comments) = paged(&st, &COMMENT, page_from_args(&args)).await?;
    Ok(Reply::json(json!({ "page": page, "comments": comments })))
}

pub const API_CREATE_COMMENT: RouteSpec = RouteSpec::post("/api/blogs/:id/comments")
    .params(&[required("id"), required("content")])
    .with_request();

pub async fn api_create_comment(st: AppState, args: Args) -> Result<Reply, ApiError> {
    let user = args.req()?.user()?.clone();
    let id = args.str("id")?;
    let content = args.str("content")?;
    if content.trim().is_empty() {
        return Err(ApiError::invalid_value("content", "content cannot be empty."));
    }
    let blog = BLOG
        .find(&st.db, &SqlArg::text(id.as_str()))
        .await?
        .ok_or_else(|| ApiError::not_found("blog", "Blog not found."))?;
    let mut comment = Record::new();
    comment.set("blog_id", blog.value("id"));
    comment.set("user_id", user.value("id"));
    comment.set("user_name", user.value("name"));
    comment.set("user_image", user.value("image"));
    comment.set("content", json!(content.trim()));
    COMMENT.save(&st.db, &mut comment).await?;
    Ok(Reply::json(comment.into_value()))
}

pub const API_DELETE_COMMENT: RouteSpec =
    RouteSpec::post("/api/comments/:id/delete").with_request();

pub async fn api_delete_comment(st: AppState, args: Args) -> Result<Reply, ApiError> {
    args.req()?.admin()?;
    let id = args.str("id")?;
    let comment = COMMENT
        .find(&st.db, &SqlArg::text(id.as_str()))
        .await?
        .ok_or_else(|| ApiError::not_found("comment", "Comment not found."))?;
    COMMENT.remove(&st.db, &comment).await?;
    Ok(Reply::json(json!({ "id": id })))
}
