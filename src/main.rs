use miniblog::orm::Db;
use miniblog::web::templates::JinjaRenderer;
use miniblog::{routes, AppState, Config};
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("miniblog=info")),
        )
        .init();

    let override_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("MINIBLOG_CONFIG").ok());
    let config = Config::load(override_path.as_deref().map(Path::new))?;

    let db = Db::connect(&config.db).await?;
    let templates = Arc::new(JinjaRenderer::from_dir(&config.templates.dir));
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState {
        db,
        config: Arc::new(config),
        templates,
    };

    let app = routes::build(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
