//! HTML page handlers.

use crate::error::ApiError;
use crate::handlers::{clear_cookie, text2html, user_context};
use crate::models::{BLOG, COMMENT};
use crate::orm::{Limit, Record, SqlArg};
use crate::pagination::{page_index_from, Page, DEFAULT_PAGE_SIZE};
use crate::state::AppState;
use crate::web::dispatch::{optional, Args, RouteSpec};
use crate::web::reply::Reply;
use serde_json::{json, Value};

pub const INDEX: RouteSpec = RouteSpec::get("/")
    .params(&[optional("page")])
    .with_request();

pub async fn index(st: AppState, args: Args) -> Result<Reply, ApiError> {
    let page_index = page_index_from(&args.opt_str("page").unwrap_or_else(|| "1".into()));
    let count = BLOG
        .find_number(&st.db, "count(id)", None, &[])
        .await?
        .unwrap_or(0) as u64;
    let page = Page::new(count, page_index, DEFAULT_PAGE_SIZE);
    let blogs: Vec<Value> = if page.is_empty() {
        Vec::new()
    } else {
        BLOG.find_all(
            &st.db,
            None,
            &[],
            Some("created_at desc"),
            Some(Limit::OffsetCount(page.offset, page.limit)),
        )
        .await?
        .into_iter()
        .map(Record::into_value)
        .collect()
    };
    Ok(Reply::template(
        "blogs.html",
        json!({
            "page": page,
            "blogs": blogs,
            "user": user_context(&args),
        }),
    ))
}

pub const BLOG_DETAIL: RouteSpec = RouteSpec::get("/blog/:id").with_request();

pub async fn blog_detail(st: AppState, args: Args) -> Result<Reply, ApiError> {
    let id = args.str("id")?;
    let blog = BLOG
        .find(&st.db, &SqlArg::text(id.as_str()))
        .await?
        .ok_or_else(|| ApiError::not_found("blog", "Blog not found."))?;
    let comments = COMMENT
        .find_all(
            &st.db,
            Some("\"blog_id\" = ?"),
            &[SqlArg::text(id.as_str())],
            Some("created_at desc"),
            None,
        )
        .await?;
    let comments: Vec<Value> = comments
        .into_iter()
        .map(|mut c| {
            let html = text2html(c.str("content").unwrap_or(""));
            c.set("html_content", json!(html));
            c.into_value()
        })
        .collect();
    let mut blog_value = blog.into_value();
    if let Some(content) = blog_value.get("content").and_then(Value::as_str) {
        let html = text2html(content);
        blog_value["html_content"] = json!(html);
    }
    Ok(Reply::template(
        "blog.html",
        json!({
            "blog": blog_value,
            "comments": comments,
            "user": user_context(&args),
        }),
    ))
}

pub const REGISTER: RouteSpec = RouteSpec::get("/register");

pub async fn register(_st: AppState, _args: Args) -> Result<Reply, ApiError> {
    Ok(Reply::template("register.html", json!({})))
}

pub const SIGNIN: RouteSpec = RouteSpec::get("/signin");

pub async fn signin(_st: AppState, _args: Args) -> Result<Reply, ApiError> {
    Ok(Reply::template("signin.html", json!({})))
}

pub const SIGNOUT: RouteSpec = RouteSpec::get("/signout").with_request();

pub async fn signout(st: AppState, args: Args) -> Result<Reply, ApiError> {
    let referer = args
        .req()?
        .referer
        .clone()
        .unwrap_or_else(|| "/".to_string());
    tracing::info!("user signed out");
    Ok(Reply::redirect_with_cookie(
        &referer,
        &clear_cookie(&st.config.session),
    ))
}

pub const MANAGE_BLOGS: RouteSpec = RouteSpec::get("/manage/blogs")
    .params(&[optional("page")])
    .with_request();

pub async fn manage_blogs(_st: AppState, args: Args) -> Result<Reply, ApiError> {
    let page_index = page_index_from(&args.opt_str("page").unwrap_or_else(|| "1".into()));
    Ok(Reply::template(
        "manage_blogs.html",
        json!({
            "page_index": page_index,
            "user": user_context(&args),
        }),
    ))
}

pub const MANAGE_BLOG_CREATE: RouteSpec = RouteSpec::get("/manage/blogs/create").with_request();

pub async fn manage_blog_create(_st: AppState, args: Args) -> Result<Reply, ApiError> {
    Ok(Reply::template(
        "blog_edit.html",
        json!({
            "id": "",
            "action": "/api/blogs",
            "user": user_context(&args),
        }),
    ))
}

pub const MANAGE_BLOG_EDIT: RouteSpec = RouteSpec::get("/manage/blogs/edit")
    .params(&[crate::web::dispatch::required("id")])
    .with_request();

pub async fn manage_blog_edit(_st: AppState, args: Args) -> Result<Reply, ApiError> {
    let id = args.str("id")?;
    Ok(Reply::template(
        "blog_edit.html",
        json!({
            "id": id,
            "action": format!("/api/blogs/{}", id),
            "user": user_context(&args),
        }),
    ))
}

pub const MANAGE_COMMENTS: RouteSpec = RouteSpec::get("/manage/comments")
    .params(&[optional("page")])
    .with_request();

pub async fn manage_comments(_st: AppState, args: Args) -> Result<Reply, ApiError> {
    let page_index = page_index_from(&args.opt_str("page").unwrap_or_else(|| "1".into()));
    Ok(Reply::template(
        "manage_comments.html",
        json!({
            "page_index": page_index,
            "user": user_context(&args),
        }),
    ))
}

pub const MANAGE_USERS: RouteSpec = RouteSpec::get("/manage/users")
    .params(&[optional("page")])
    .with_request();

pub async fn manage_users(_st: AppState, args: Args) -> Result<Reply, ApiError> {
    let page_index = page_index_from(&args.opt_str("page").unwrap_or_else(|| "1".into()));
    Ok(Reply::template(
        "manage_users.html",
        json!({
            "page_index": page_index,
            "user": user_context(&args),
        }),
    ))
}
