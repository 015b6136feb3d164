mod app;
mod config;
mod constants;
mod handlers;
mod localize;
mod rendering;
mod state;
mod subscriptions;
mod widgets;

use tracing::{info, metadata::LevelFilter};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    init_logger();
    color_backtrace::install();
    localize::localize();

    info!("cosmic-pipup ({})", config::APP_ID);
    info!("Version: {}", config::VERSION);

    app::run()?;
    Ok(())
}

fn init_logger() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();
    let fmt_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);
    let registry = tracing_subscriber::registry().with(filter);

    #[cfg(feature = "systemd")]
    if let Ok(journald) = tracing_journald::layer() {
        registry.with(journald).init();
        return;
    }

    registry.with(fmt_layer).init();
}
