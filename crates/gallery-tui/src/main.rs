mod action;
mod app;
mod app_state;
mod component;
mod components;
mod mpv;
mod theme;
mod thumbs;
mod widgets;

use gallery_core::config::Config;
use gallery_core::platform;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;

    let log_path = data_dir.join("gallery.log");
    let ui_state_path = data_dir.join("ui_state.json");

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Allow RUST_LOG override; default to debug for app code but suppress noisy
    // connection-level DEBUG from HTTP client internals (hyper_util, reqwest).
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    // Print log path to stderr so the operator can tail it immediately.
    eprintln!("gallery log: {}", log_path.display());

    tracing::info!("media gallery starting…");

    // ── Load config ──────────────────────────────────────────────────────────
    let mut config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("config: {}; using defaults", e);
        Config::default()
    });

    // `gallery <path-or-url>` overrides the configured data file for this run.
    if let Some(location) = std::env::args().nth(1) {
        config.source.location = location;
    }

    // ── Run TUI ──────────────────────────────────────────────────────────────
    let app = app::App::new(config, ui_state_path);
    app.run().await?;

    Ok(())
}
