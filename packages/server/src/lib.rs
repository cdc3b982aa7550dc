#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the alert sphere disaster dashboard.
//!
//! Serves the REST API behind the citizen and authority screens: report
//! submission, triage, team and resource registration, broadcasts, and
//! map markers. Live collection subscriptions are streamed to clients as
//! server-sent events from `/api/live/{collection}`. Documents are held
//! in memory or in a `SQLite` file, depending on configuration.

pub mod config;
mod handlers;
pub mod interactive;

use std::sync::Arc;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{App, HttpServer, middleware, web};
use alert_sphere_database::{DocumentStore, StoreError, memory::MemoryStore, sqlite::SqliteStore};
use alert_sphere_geocoder::{GeocodeError, nominatim::ReverseGeocoder};
use alert_sphere_identity::{FirebaseIdentity, IdentityProvider};
use alert_sphere_notify::{DeviceRegistry, HttpPushChannel, PushChannel};
use thiserror::Error;

use crate::config::ServerConfig;

/// Errors starting the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The document store could not be opened.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The geocoding client could not be built.
    #[error("Geocoder error: {0}")]
    Geocode(#[from] GeocodeError),

    /// The HTTP server failed to bind or run.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared application state.
pub struct AppState {
    /// Document store holding all four collections.
    pub store: Arc<dyn DocumentStore>,
    /// Push delivery for broadcasts.
    pub push: Arc<dyn PushChannel>,
    /// Reverse geocoder for location prefill.
    pub geocoder: Option<ReverseGeocoder>,
    /// Identity provider for sign-in, if configured.
    pub identity: Option<Arc<dyn IdentityProvider>>,
    /// Device tokens registered for push.
    pub devices: DeviceRegistry,
}

impl AppState {
    /// Opens the store and builds the outbound clients described by
    /// `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] if the store cannot be opened or an HTTP
    /// client cannot be built.
    pub async fn from_config(config: &ServerConfig) -> Result<Self, ServerError> {
        let store: Arc<dyn DocumentStore> = if let Some(path) = &config.database_path {
            log::info!("Opening SQLite store at {}", path.display());
            Arc::new(SqliteStore::open(path).await?)
        } else {
            log::warn!("No database path configured, documents are kept in memory");
            Arc::new(MemoryStore::new())
        };

        let geocoder = ReverseGeocoder::new(config.nominatim_url.clone())?;
        let client = reqwest::Client::new();

        let identity = config.firebase_api_key.as_ref().map(|key| {
            Arc::new(FirebaseIdentity::with_base_url(
                client.clone(),
                config.identity_url.clone(),
                key.clone(),
            )) as Arc<dyn IdentityProvider>
        });
        if identity.is_none() {
            log::warn!("FIREBASE_API_KEY not set, sign-in is disabled");
        }

        Ok(Self {
            store,
            push: Arc::new(HttpPushChannel::new(client, config.push_endpoint.clone())),
            geocoder: Some(geocoder),
            identity,
            devices: DeviceRegistry::new(),
        })
    }
}

/// Registers the `/api` routes. Malformed bodies and query strings are
/// answered with the same JSON error body as every other failure.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(handlers::json_error))
        .app_data(web::QueryConfig::default().error_handler(handlers::query_error))
        .service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/incidents", web::get().to(handlers::list_incidents))
            .route("/incidents", web::post().to(handlers::submit_incident))
            .route(
                "/incidents/{id}/advance",
                web::post().to(handlers::advance_incident),
            )
            .route("/markers", web::get().to(handlers::markers))
            .route("/teams", web::get().to(handlers::list_teams))
            .route("/teams", web::post().to(handlers::register_team))
            .route("/resources", web::get().to(handlers::list_resources))
            .route("/resources", web::post().to(handlers::register_resource))
            .route("/broadcasts", web::get().to(handlers::list_broadcasts))
            .route("/broadcasts", web::post().to(handlers::send_broadcast))
            .route("/live/{collection}", web::get().to(handlers::live))
            .route("/stats", web::get().to(handlers::stats))
            .route("/location/resolve", web::post().to(handlers::resolve_location))
            .route("/devices", web::post().to(handlers::register_device))
            .route("/auth/sign-in", web::post().to(handlers::sign_in))
            .route("/safety-tips", web::get().to(handlers::safety_tips))
            .route(
                "/emergency-contacts",
                web::get().to(handlers::emergency_contacts),
            ),
    );
}

/// Starts the alert sphere API server.
///
/// Builds the application state from `config` and runs the Actix-Web
/// HTTP server until it is shut down. The caller is responsible for
/// providing the async runtime (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns [`ServerError`] if the state cannot be built or the server
/// fails to bind.
#[allow(clippy::future_not_send)]
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let state = web::Data::new(AppState::from_config(&config).await?);
    let static_dir = config.static_dir.clone().filter(|dir| dir.is_dir());

    log::info!("Starting server on {}:{}", config.bind_addr, config.port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        let app = App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure);

        // Serve frontend static files (production)
        match &static_dir {
            Some(dir) => app.service(Files::new("/", dir).index_file("index.html")),
            None => app,
        }
    })
    .bind((config.bind_addr.as_str(), config.port))?
    .run()
    .await?;

    Ok(())
}
