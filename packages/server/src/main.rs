#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Alert sphere API server.
//!
//! ```text
//! alert_sphere_server [--config alert_sphere.toml]
//! alert_sphere_server --interactive
//! ```

use std::path::PathBuf;

use alert_sphere_server::{config::ServerConfig, interactive, run_server};
use clap::Parser;

#[derive(Parser)]
#[command(
    name = "alert_sphere_server",
    about = "Serve the alert sphere disaster coordination API"
)]
struct Cli {
    /// Prompt for settings before starting
    #[arg(long)]
    interactive: bool,

    /// TOML config file (defaults to $ALERT_SPHERE_CONFIG or alert_sphere.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    let config = ServerConfig::load(cli.config.as_deref())?;

    if cli.interactive {
        interactive::run(config).await?;
    } else {
        run_server(config).await?;
    }

    Ok(())
}
