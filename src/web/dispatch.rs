//! Declarative route dispatch: per-route parameter specs, request-to-keyword
//! argument binding, and the error-catching boundary.
//!
//! Instead of inspecting a handler's signature at runtime, each route
//! registers an explicit [`RouteSpec`] alongside the handler: the spec names
//! the keyword parameters (and which are required), whether the handler
//! takes every extracted key (`catch_all`), and whether it wants the request
//! context.

use crate::error::ApiError;
use crate::orm::Record;
use crate::state::AppState;
use crate::web::reply::{respond, Reply};
use crate::web::session::cookie2user;
use axum::{
    extract::{FromRequest, RawPathParams, Request},
    http::header,
    response::IntoResponse,
    routing::{on, MethodFilter},
    Router,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// One declared keyword parameter.
#[derive(Clone, Copy, Debug)]
pub struct Param {
    pub name: &'static str,
    pub required: bool,
}

pub const fn required(name: &'static str) -> Param {
    Param { name, required: true }
}

pub const fn optional(name: &'static str) -> Param {
    Param { name, required: false }
}

/// Declared (method, path) pair plus the handler's argument interests.
#[derive(Clone, Copy, Debug)]
pub struct RouteSpec {
    pub method: Method,
    pub path: &'static str,
    pub params: &'static [Param],
    /// Handler accepts every extracted key, not just the declared set.
    pub catch_all: bool,
    /// Handler receives the request context (cookies, authenticated user).
    pub wants_request: bool,
}

impl RouteSpec {
    pub const fn get(path: &'static str) -> RouteSpec {
        RouteSpec {
            method: Method::Get,
            path,
            params: &[],
            catch_all: false,
            wants_request: false,
        }
    }

    pub const fn post(path: &'static str) -> RouteSpec {
        RouteSpec {
            method: Method::Post,
            path,
            params: &[],
            catch_all: false,
            wants_request: false,
        }
    }

    pub const fn params(mut self, params: &'static [Param]) -> RouteSpec {
        self.params = params;
        self
    }

    pub const fn catch_all(mut self) -> RouteSpec {
        self.catch_all = true;
        self
    }

    pub const fn with_request(mut self) -> RouteSpec {
        self.wants_request = true;
        self
    }

    fn wants_kw(&self) -> bool {
        self.catch_all || !self.params.is_empty()
    }

    fn declares(&self, name: &str) -> bool {
        self.params.iter().any(|p| p.name == name)
    }
}

/// Request context injected into handlers that declare `with_request`.
pub struct RequestInfo {
    pub method: Method,
    pub path: String,
    pub referer: Option<String>,
    pub cookies: HashMap<String, String>,
    /// Resolved from the session cookie; `None` on any parse or verify
    /// failure.
    pub user: Option<Record>,
}

impl RequestInfo {
    pub fn user(&self) -> Result<&Record, ApiError> {
        self.user
            .as_ref()
            .ok_or_else(|| ApiError::permission("Please signin first."))
    }

    pub fn admin(&self) -> Result<&Record, ApiError> {
        let user = self.user()?;
        if user.bool("admin") == Some(true) {
            Ok(user)
        } else {
            Err(ApiError::permission("Admin required."))
        }
    }
}

/// Bound handler arguments: the keyword map plus the optional request
/// context.
pub struct Args {
    pub kw: Map<String, Value>,
    pub request: Option<RequestInfo>,
}

impl Args {
    /// Required string argument; absent or non-string values are invalid.
    pub fn str(&self, name: &str) -> Result<String, ApiError> {
        match self.kw.get(name) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Ok(other.to_string()),
            None => Err(ApiError::invalid_value(name, format!("{} is required", name))),
        }
    }

    pub fn opt_str(&self, name: &str) -> Option<String> {
        self.kw.get(name).and_then(Value::as_str).map(str::to_string)
    }

    pub fn req(&self) -> Result<&RequestInfo, ApiError> {
        self.request
            .as_ref()
            .ok_or_else(|| ApiError::Internal("route registered without request context".into()))
    }
}

/// Parse a query string; the first value wins for repeated keys.
pub fn parse_query(qs: &str) -> Map<String, Value> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(qs).unwrap_or_default();
    let mut out = Map::new();
    for (k, v) in pairs {
        out.entry(k).or_insert(Value::String(v));
    }
    out
}

/// Parse a form-encoded POST body.
pub fn parse_form(body: &[u8]) -> Result<Map<String, Value>, ApiError> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body)
        .map_err(|e| ApiError::Dispatch(format!("malformed form body: {}", e)))?;
    let mut out = Map::new();
    for (k, v) in pairs {
        out.entry(k).or_insert(Value::String(v));
    }
    Ok(out)
}

/// Parse a JSON POST body, rejecting non-object payloads.
pub fn parse_json(body: &[u8]) -> Result<Map<String, Value>, ApiError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ApiError::Dispatch(format!("malformed JSON body: {}", e)))?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ApiError::Dispatch("JSON body must be object.".into())),
    }
}

/// Merge extracted keyword arguments with path parameters per the binding
/// rules, then enforce required parameters.
///
/// - No extraction at all: path parameters alone populate the call.
/// - Named parameters without catch-all: extracted keys are filtered to the
///   declared set.
/// - Path parameters are merged last and take precedence; collisions are
///   logged.
pub fn merge_args(
    spec: &RouteSpec,
    extracted: Option<Map<String, Value>>,
    path_params: &[(String, String)],
) -> Result<Map<String, Value>, ApiError> {
    let mut kw = match extracted {
        None => {
            let mut kw = Map::new();
            for (k, v) in path_params {
                kw.insert(k.clone(), Value::String(v.clone()));
            }
            kw
        }
        Some(mut kw) => {
            if !spec.catch_all && !spec.params.is_empty() {
                kw.retain(|k, _| spec.declares(k));
            }
            for (k, v) in path_params {
                if kw.contains_key(k) {
                    tracing::warn!(name = %k, "duplicate arg name in named arg and kw args");
                }
                kw.insert(k.clone(), Value::String(v.clone()));
            }
            kw
        }
    };
    for p in spec.params {
        if p.required && !kw.contains_key(p.name) {
            return Err(ApiError::MissingArgument(p.name.to_string()));
        }
    }
    Ok(kw)
}

fn parse_cookies(header_value: Option<&str>) -> HashMap<String, String> {
    let mut out = HashMap::new();
    let Some(raw) = header_value else {
        return out;
    };
    for pair in raw.split(';') {
        if let Some((k, v)) = pair.trim().split_once('=') {
            out.insert(k.trim().to_string(), v.trim().to_string());
        }
    }
    out
}

async fn extract_kw(
    spec: &RouteSpec,
    content_type: Option<&str>,
    query: Option<&str>,
    req: Request,
) -> Result<Option<Map<String, Value>>, ApiError> {
    if !spec.wants_kw() {
        return Ok(None);
    }
    match spec.method {
        Method::Post => {
            let Some(ct) = content_type else {
                return Err(ApiError::Dispatch("Missing Content-Type.".into()));
            };
            if ct.starts_with("application/json") {
                let bytes = axum::body::to_bytes(req.into_body(), usize::MAX)
                    .await
                    .map_err(|e| ApiError::Dispatch(format!("body read: {}", e)))?;
                Ok(Some(parse_json(&bytes)?))
            } else if ct.starts_with("application/x-www-form-urlencoded") {
                let bytes = axum::body::to_bytes(req.into_body(), usize::MAX)
                    .await
                    .map_err(|e| ApiError::Dispatch(format!("body read: {}", e)))?;
                Ok(Some(parse_form(&bytes)?))
            } else if ct.starts_with("multipart/form-data") {
                let mut multipart = axum::extract::Multipart::from_request(req, &())
                    .await
                    .map_err(|e| ApiError::Dispatch(format!("malformed multipart body: {}", e)))?;
                let mut out = Map::new();
                while let Some(field) = multipart
                    .next_field()
                    .await
                    .map_err(|e| ApiError::Dispatch(format!("malformed multipart body: {}", e)))?
                {
                    let Some(name) = field.name().map(str::to_string) else {
                        continue;
                    };
                    let text = field
                        .text()
                        .await
                        .map_err(|e| ApiError::Dispatch(format!("malformed multipart body: {}", e)))?;
                    out.entry(name).or_insert(Value::String(text));
                }
                Ok(Some(out))
            } else {
                Err(ApiError::Dispatch(format!("Unsupported Content-Type: {}", ct)))
            }
        }
        Method::Get => Ok(query.filter(|q| !q.is_empty()).map(parse_query)),
    }
}

async fn dispatch<H, Fut>(
    state: AppState,
    spec: &'static RouteSpec,
    handler: H,
    raw_params: RawPathParams,
    req: Request,
) -> Result<Reply, ApiError>
where
    H: Fn(AppState, Args) -> Fut,
    Fut: Future<Output = Result<Reply, ApiError>>,
{
    let path_params: Vec<(String, String)> = raw_params
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(str::to_string);
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_ascii_lowercase());
    let referer = req
        .headers()
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let cookie_header = req
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let extracted = extract_kw(spec, content_type.as_deref(), query.as_deref(), req).await?;
    let kw = merge_args(spec, extracted, &path_params)?;

    let request = if spec.wants_request {
        let cookies = parse_cookies(cookie_header.as_deref());
        let user = match cookies.get(&state.config.session.cookie_name) {
            Some(cookie) => cookie2user(&state.db, cookie, &state.config.session.secret).await,
            None => None,
        };
        if let Some(u) = &user {
            tracing::debug!(user = u.str("email").unwrap_or(""), "authenticated");
        }
        Some(RequestInfo {
            method: spec.method,
            path,
            referer,
            cookies,
            user,
        })
    } else {
        None
    };

    tracing::debug!(args = ?kw, "call handler");
    handler(state, Args { kw, request }).await
}

/// Register one route: bind arguments per the spec, invoke the handler, and
/// coerce the result. Handler errors from the structured API family become
/// the `{error, data, message}` payload at this boundary.
pub fn route<H, Fut>(
    router: Router,
    state: AppState,
    spec: &'static RouteSpec,
    handler: H,
) -> Router
where
    H: Fn(AppState, Args) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Reply, ApiError>> + Send + 'static,
{
    tracing::info!(method = spec.method.as_str(), path = spec.path, "add route");
    let filter = match spec.method {
        Method::Get => MethodFilter::GET,
        Method::Post => MethodFilter::POST,
    };
    router.route(
        spec.path,
        on(filter, move |raw_params: RawPathParams, req: Request| {
            let state = state.clone();
            let handler = handler.clone();
            async move {
                let templates = state.templates.clone();
                match dispatch(state, spec, handler, raw_params, req).await {
                    Ok(reply) => respond(templates.as_ref(), reply),
                    Err(e) => e.into_response(),
                }
            }
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SIGNIN: RouteSpec =
        RouteSpec::post("/api/authenticate").params(&[required("email"), required("pwd")]);
    const INDEX: RouteSpec = RouteSpec::get("/").params(&[optional("page")]);
    const DETAIL: RouteSpec = RouteSpec::get("/blog/:id");

    #[test]
    fn missing_required_param_is_named() {
        let extracted = parse_query("email=a@b.com");
        let err = merge_args(&SIGNIN, Some(extracted), &[]).unwrap_err();
        match err {
            ApiError::MissingArgument(name) => assert_eq!(name, "pwd"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn undeclared_keys_are_filtered() {
        let mut extracted = Map::new();
        extracted.insert("page".into(), json!("2"));
        extracted.insert("junk".into(), json!("x"));
        let kw = merge_args(&INDEX, Some(extracted), &[]).unwrap();
        assert_eq!(kw.get("page"), Some(&json!("2")));
        assert!(!kw.contains_key("junk"));
    }

    #[test]
    fn catch_all_keeps_everything() {
        const SPEC: RouteSpec = RouteSpec::post("/x").catch_all();
        let mut extracted = Map::new();
        extracted.insert("anything".into(), json!(1));
        let kw = merge_args(&SPEC, Some(extracted), &[]).unwrap();
        assert!(kw.contains_key("anything"));
    }

    #[test]
    fn path_params_populate_when_nothing_extracted() {
        let kw = merge_args(&DETAIL, None, &[("id".into(), "abc".into())]).unwrap();
        assert_eq!(kw.get("id"), Some(&json!("abc")));
    }

    #[test]
    fn path_params_take_precedence() {
        const SPEC: RouteSpec = RouteSpec::post("/blog/:id").params(&[required("id")]);
        let mut extracted = Map::new();
        extracted.insert("id".into(), json!("from-body"));
        let kw = merge_args(&SPEC, Some(extracted), &[("id".into(), "from-path".into())]).unwrap();
        assert_eq!(kw.get("id"), Some(&json!("from-path")));
    }

    #[test]
    fn json_body_must_be_object() {
        assert!(parse_json(br#"{"a": 1}"#).is_ok());
        assert!(parse_json(br#"[1, 2]"#).is_err());
        assert!(parse_json(br#""str""#).is_err());
        assert!(parse_json(b"not json").is_err());
    }

    #[test]
    fn query_parsing_takes_first_value() {
        let kw = parse_query("a=1&a=2&b=x%20y");
        assert_eq!(kw.get("a"), Some(&json!("1")));
        assert_eq!(kw.get("b"), Some(&json!("x y")));
    }

    #[test]
    fn form_parsing() {
        let kw = parse_form(b"email=a%40b.com&passwd=secret").unwrap();
        assert_eq!(kw.get("email"), Some(&json!("a@b.com")));
        assert_eq!(kw.get("passwd"), Some(&json!("secret")));
    }

    #[test]
    fn cookie_header_parsing() {
        let cookies = parse_cookies(Some("a=1; session=x-y-z;b = 2"));
        assert_eq!(cookies.get("a").map(String::as_str), Some("1"));
        assert_eq!(cookies.get("session").map(String::as_str), Some("x-y-z"));
        assert_eq!(cookies.get("b").map(String::as_str), Some("2"));
        assert!(parse_cookies(None).is_empty());
    }
}
