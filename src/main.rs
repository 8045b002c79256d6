//! Service entry point

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use inspection_rates::config::Settings;
use inspection_rates::{routes, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before anything reads the environment.
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inspection_rates=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env().context("invalid runtime configuration")?;
    let state = AppState::from_settings(&settings).context("failed to build application state")?;

    let app = routes::router(state);
    let listener = tokio::net::TcpListener::bind(settings.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_addr))?;
    tracing::info!("Listening on {}", settings.bind_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
