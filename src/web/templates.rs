//! Template rendering behind a small trait seam.

use crate::error::ApiError;
use chrono::{TimeZone, Utc};
use serde_json::Value;
use std::path::Path;

pub trait Renderer: Send + Sync {
    fn render(&self, name: &str, context: &Value) -> Result<String, ApiError>;
}

/// minijinja-backed renderer loading templates from a directory, with a
/// `datetime` filter formatting epoch-seconds floats as a relative age.
pub struct JinjaRenderer {
    env: minijinja::Environment<'static>,
}

impl JinjaRenderer {
    pub fn from_dir(dir: impl AsRef<Path>) -> JinjaRenderer {
        let mut env = minijinja::Environment::new();
        env.set_loader(minijinja::path_loader(dir.as_ref()));
        env.add_filter("datetime", datetime_filter);
        JinjaRenderer { env }
    }
}

impl Renderer for JinjaRenderer {
    fn render(&self, name: &str, context: &Value) -> Result<String, ApiError> {
        let template = self
            .env
            .get_template(name)
            .map_err(|e| ApiError::Template(format!("{}: {}", name, e)))?;
        template
            .render(context)
            .map_err(|e| ApiError::Template(format!("{}: {}", name, e)))
    }
}

/// Relative age for timestamps: "1 minute ago" up to a week, then the date.
pub fn datetime_filter(t: f64) -> String {
    let now = Utc::now().timestamp();
    let delta = now - t as i64;
    if delta < 60 {
        return "1 minute ago".to_string();
    }
    if delta < 3600 {
        return format!("{} minutes ago", delta / 60);
    }
    if delta < 86400 {
        return format!("{} hours ago", delta / 3600);
    }
    if delta < 604800 {
        return format!("{} days ago", delta / 86400);
    }
    match Utc.timestamp_opt(t as i64, 0).single() {
        Some(dt) => dt.format("%B %e, %Y").to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_ages() {
        let now = Utc::now().timestamp() as f64;
        assert_eq!(datetime_filter(now - 30.0), "1 minute ago");
        assert_eq!(datetime_filter(now - 120.0), "2 minutes ago");
        assert_eq!(datetime_filter(now - 7200.0), "2 hours ago");
        assert_eq!(datetime_filter(now - 2.0 * 86400.0), "2 days ago");
        assert!(datetime_filter(now - 30.0 * 86400.0).contains(','));
    }
}
