//! Interactive mode for the server.
//!
//! Prompts for the settings most often changed between runs, starting
//! from the loaded configuration, before starting the server.

use std::path::PathBuf;

use dialoguer::{Confirm, Input};

use crate::{ServerError, config::ServerConfig};

/// Runs the server in interactive mode, prompting for configuration.
///
/// Asks for bind address, port, database file, and push endpoint, each
/// defaulting to the value in `config`, and delegates to
/// [`super::run_server`].
///
/// # Errors
///
/// Returns [`ServerError`] if the underlying server fails to start.
#[allow(clippy::future_not_send)]
pub async fn run(mut config: ServerConfig) -> Result<(), ServerError> {
    println!("Alert Sphere Server");
    println!();

    config.bind_addr = Input::new()
        .with_prompt("Bind address")
        .default(config.bind_addr.clone())
        .interact_text()
        .unwrap_or_else(|_| config.bind_addr.clone());

    config.port = Input::new()
        .with_prompt("Port")
        .default(config.port)
        .interact_text()
        .unwrap_or(config.port);

    let current_db = config
        .database_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    let db_path: String = Input::new()
        .with_prompt("Database file (blank keeps documents in memory)")
        .default(current_db.clone())
        .allow_empty(true)
        .interact_text()
        .unwrap_or(current_db);
    config.database_path = Some(PathBuf::from(db_path.trim())).filter(|p| !p.as_os_str().is_empty());

    config.push_endpoint = Input::new()
        .with_prompt("Push delivery endpoint")
        .default(config.push_endpoint.clone())
        .interact_text()
        .unwrap_or_else(|_| config.push_endpoint.clone());

    if !Confirm::new()
        .with_prompt(format!(
            "Start server on {}:{}?",
            config.bind_addr, config.port
        ))
        .default(true)
        .interact()
        .unwrap_or(true)
    {
        println!("Cancelled.");
        return Ok(());
    }

    super::run_server(config).await
}
