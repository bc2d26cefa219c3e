mod app;
mod bikes;
mod config;
mod db;
mod dto;
mod error;
mod extractors;
mod notify;
mod password;
mod rentals;
mod state;
mod timestamp;
mod users;

use tracing_subscriber::EnvFilter;

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let state = AppState::init().await?;
    let bind_addr = state.config.bind_addr();
    app::serve(app::build_app(state), &bind_addr).await
}

/// `RUST_LOG` picks the filter; `LOG_FORMAT=json` switches to one JSON object per line.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("pedalpro=debug,tower_http=info,sqlx=warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => builder.json().flatten_event(true).with_current_span(false).init(),
        _ => builder.compact().init(),
    }
}
