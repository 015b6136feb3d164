pub const APP_ID: &str = "io.github.CosmicPipup";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
