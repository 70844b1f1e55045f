//! Page and API handlers for users, blogs, and comments.

pub mod api;
pub mod pages;

use crate::config::SessionConfig;
use crate::orm::Record;
use crate::web::dispatch::Args;
use crate::web::session::PASSWD_MASK;
use regex::Regex;
use serde_json::{json, Value};
use std::sync::LazyLock;

pub static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9.\-_]+@[a-z0-9\-_]+(\.[a-z0-9\-_]+){1,4}$").expect("email regex")
});

pub static SHA1_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-f]{40}$").expect("sha1 regex"));

/// Set-Cookie value establishing a session.
pub fn session_cookie(cfg: &SessionConfig, value: &str) -> String {
    format!(
        "{}={}; Max-Age={}; Path=/; HttpOnly",
        cfg.cookie_name, value, cfg.max_age_secs
    )
}

/// Set-Cookie value tearing a session down.
pub fn clear_cookie(cfg: &SessionConfig) -> String {
    format!("{}=deleted; Max-Age=0; Path=/; HttpOnly", cfg.cookie_name)
}

/// User payload with the password hash masked.
pub fn masked(mut user: Record) -> Value {
    user.set("passwd", json!(PASSWD_MASK));
    user.into_value()
}

/// Authenticated user for template contexts, or `null`.
pub fn user_context(args: &Args) -> Value {
    args.request
        .as_ref()
        .and_then(|r| r.user.clone())
        .map(Record::into_value)
        .unwrap_or(Value::Null)
}

/// Escape text and wrap non-blank lines in paragraphs.
pub fn text2html(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| {
            let escaped = l
                .replace('&', "&amp;")
                .replace('<', "&lt;")
                .replace('>', "&gt;");
            format!("<p>{}</p>", escaped)
        })
        .collect::<Vec<_>>()
        .join("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_pattern() {
        assert!(EMAIL_RE.is_match("a@b.com"));
        assert!(EMAIL_RE.is_match("first.last@sub.example.org"));
        assert!(!EMAIL_RE.is_match("not-an-email"));
        assert!(!EMAIL_RE.is_match("UPPER@case.com"));
    }

    #[test]
    fn sha1_pattern() {
        assert!(SHA1_RE.is_match(&"a".repeat(40)));
        assert!(!SHA1_RE.is_match("short"));
        assert!(!SHA1_RE.is_match(&"G".repeat(40)));
    }

    #[test]
    fn text_to_html_escapes_and_wraps() {
        let html = text2html("hello <b>\n\n  a & b  \n");
        assert_eq!(html, "<p>hello &lt;b&gt;</p><p>a &amp; b</p>");
    }
}
