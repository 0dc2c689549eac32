use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use aircon_scheduler::config::AppConfig;
use aircon_scheduler::db;
use aircon_scheduler::handlers;
use aircon_scheduler::services::mail::smtp::SmtpMailer;
use aircon_scheduler::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    let mailer = SmtpMailer::new(&config.smtp)?;
    tracing::info!(
        host = %config.smtp.host,
        port = config.smtp.port,
        timezone = %config.timezone,
        "using SMTP relay"
    );

    let state = Arc::new(AppState::new(config.clone(), conn, Arc::new(mailer)));

    let app = handlers::router(state).layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
