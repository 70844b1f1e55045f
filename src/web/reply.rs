//! Handler return values and their coercion into HTTP responses.

use crate::error::ApiError;
use crate::web::templates::Renderer;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::{json, Value};

/// Key routing a map return to template rendering instead of JSON.
pub const TEMPLATE_KEY: &str = "__template__";

/// Prefix routing a string return to a redirect response.
pub const REDIRECT_PREFIX: &str = "redirect:";

/// What a handler may return; [`respond`] applies the coercion rules.
pub enum Reply {
    /// Passed through unchanged.
    Raw(Response),
    /// `application/octet-stream`.
    Bytes(Vec<u8>),
    /// `redirect:` prefix becomes a 302; anything else is HTML.
    Text(String),
    /// Object with [`TEMPLATE_KEY`] renders that template; otherwise JSON.
    Value(Value),
    /// Raw status code (100..600).
    Status(u16),
    /// Status code plus message body.
    StatusMessage(u16, String),
    /// Fallback: stringified as plain text.
    Display(String),
}

impl Reply {
    pub fn redirect(path: impl Into<String>) -> Reply {
        Reply::Text(format!("{}{}", REDIRECT_PREFIX, path.into()))
    }

    pub fn json(value: Value) -> Reply {
        Reply::Value(value)
    }

    /// Render `name` with `context`; the context must be a JSON object.
    pub fn template(name: &str, mut context: Value) -> Reply {
        if let Value::Object(ref mut map) = context {
            map.insert(TEMPLATE_KEY.to_string(), json!(name));
        }
        Reply::Value(context)
    }

    /// JSON response carrying a Set-Cookie header (session establishment).
    pub fn json_with_cookie(value: Value, cookie: &str) -> Reply {
        let mut resp = json_response(&value);
        match HeaderValue::from_str(cookie) {
            Ok(hv) => {
                resp.headers_mut().append(header::SET_COOKIE, hv);
            }
            Err(e) => tracing::warn!(error = %e, "unencodable cookie dropped"),
        }
        Reply::Raw(resp)
    }

    /// Redirect carrying a Set-Cookie header (session teardown).
    pub fn redirect_with_cookie(path: &str, cookie: &str) -> Reply {
        let mut resp = redirect_response(path);
        match HeaderValue::from_str(cookie) {
            Ok(hv) => {
                resp.headers_mut().append(header::SET_COOKIE, hv);
            }
            Err(e) => tracing::warn!(error = %e, "unencodable cookie dropped"),
        }
        Reply::Raw(resp)
    }
}

fn redirect_response(path: &str) -> Response {
    let location = HeaderValue::from_str(path)
        .unwrap_or_else(|_| HeaderValue::from_static("/"));
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

fn json_response(value: &Value) -> Response {
    let body = serde_json::to_string(value).unwrap_or_else(|_| "null".to_string());
    (
        [(header::CONTENT_TYPE, "application/json;charset=utf-8")],
        body,
    )
        .into_response()
}

fn html_response(body: String) -> Response {
    ([(header::CONTENT_TYPE, "text/html;charset=utf-8")], body).into_response()
}

fn plain_response(body: String) -> Response {
    ([(header::CONTENT_TYPE, "text/plain;charset=utf-8")], body).into_response()
}

/// The response factory: coerce a handler return into an HTTP response.
pub fn respond(templates: &dyn Renderer, reply: Reply) -> Response {
    match reply {
        Reply::Raw(resp) => resp,
        Reply::Bytes(b) => (
            [(header::CONTENT_TYPE, "application/octet-stream")],
            b,
        )
            .into_response(),
        Reply::Text(s) => match s.strip_prefix(REDIRECT_PREFIX) {
            Some(target) => redirect_response(target),
            None => html_response(s),
        },
        Reply::Value(v) => {
            let template = v.get(TEMPLATE_KEY).and_then(Value::as_str);
            match template {
                Some(name) => {
                    let name = name.to_string();
                    match templates.render(&name, &v) {
                        Ok(html) => html_response(html),
                        Err(e) => e.into_response(),
                    }
                }
                None => json_response(&v),
            }
        }
        Reply::Status(code) if (100..600).contains(&code) => {
            match StatusCode::from_u16(code) {
                Ok(status) => status.into_response(),
                Err(_) => plain_response(code.to_string()),
            }
        }
        Reply::Status(code) => plain_response(code.to_string()),
        Reply::StatusMessage(code, message) => match StatusCode::from_u16(code) {
            Ok(status) if (100..600).contains(&code) => (status, message).into_response(),
            _ => plain_response(format!("{} {}", code, message)),
        },
        Reply::Display(s) => plain_response(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeRenderer;

    impl Renderer for FakeRenderer {
        fn render(&self, name: &str, context: &Value) -> Result<String, ApiError> {
            Ok(format!(
                "{}:{}",
                name,
                context.get("title").and_then(Value::as_str).unwrap_or("")
            ))
        }
    }

    fn content_type(resp: &Response) -> &str {
        resp.headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }

    #[test]
    fn redirect_prefix_becomes_302() {
        let resp = respond(&FakeRenderer, Reply::Text("redirect:/signin".into()));
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/signin");
    }

    #[test]
    fn plain_string_is_html() {
        let resp = respond(&FakeRenderer, Reply::Text("<h1>hi</h1>".into()));
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(content_type(&resp), "text/html;charset=utf-8");
    }

    #[test]
    fn template_key_routes_to_renderer() {
        let reply = Reply::template("blogs.html", json!({"title": "home"}));
        let resp = respond(&FakeRenderer, reply);
        assert_eq!(content_type(&resp), "text/html;charset=utf-8");
    }

    #[test]
    fn object_without_template_key_is_json() {
        let resp = respond(&FakeRenderer, Reply::json(json!({"a": 1})));
        assert_eq!(content_type(&resp), "application/json;charset=utf-8");
    }

    #[test]
    fn bytes_are_octet_stream() {
        let resp = respond(&FakeRenderer, Reply::Bytes(vec![1, 2, 3]));
        assert_eq!(content_type(&resp), "application/octet-stream");
    }

    #[test]
    fn status_codes() {
        let resp = respond(&FakeRenderer, Reply::Status(404));
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        // Out of range falls back to plain text.
        let resp = respond(&FakeRenderer, Reply::Status(999));
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(content_type(&resp), "text/plain;charset=utf-8");
    }

    #[test]
    fn status_with_message() {
        let resp = respond(&FakeRenderer, Reply::StatusMessage(403, "no".into()));
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn fallback_is_plain_text() {
        let resp = respond(&FakeRenderer, Reply::Display("whatever".into()));
        assert_eq!(content_type(&resp), "text/plain;charset=utf-8");
    }
}
