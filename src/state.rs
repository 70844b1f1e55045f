//! Shared application state for all routes.

use crate::config::Config;
use crate::orm::Db;
use crate::web::templates::Renderer;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub config: Arc<Config>,
    pub templates: Arc<dyn Renderer>,
}
