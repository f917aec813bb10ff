use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jobboard::{config::Config, db, routes, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "jobboard=debug,tower_http=debug".into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  let config = Config::load();

  let pool = db::init_db(&config.database_path)
    .with_context(|| format!("Failed to initialize database at {}", config.database_path.display()))?;

  let state = AppState::from_config(pool, &config);
  let app = routes::router(state, &config.cors_origins);

  let bind_addr = config.bind_addr();
  let listener = tokio::net::TcpListener::bind(&bind_addr)
    .await
    .with_context(|| format!("Failed to bind to {}", bind_addr))?;

  tracing::info!(
    "Server running on http://{} (auth mode: {})",
    bind_addr,
    config.auth.mode.as_str()
  );

  axum::serve(listener, app).await.context("Server failed")?;
  Ok(())
}
