//! HTTP handler functions for the alert sphere API.

use actix_web::{
    HttpRequest, HttpResponse,
    error::{InternalError, JsonPayloadError, QueryPayloadError},
    web,
};
use alert_sphere_alert_models::{
    Broadcast, Coordinates, IncidentReport, RescueTeam, Resource,
    content::{EMERGENCY_CONTACTS, SAFETY_TIPS},
    marker::derive_markers,
};
use alert_sphere_dashboard::{
    Notice,
    board::{DashboardStats, reports_preview, type_distribution},
    broadcast::BroadcastForm,
    registry::{ResourceForm, TeamForm},
    report::ReportForm,
    triage::advance_status,
    views::authenticate,
};
use alert_sphere_database::{
    Collection, Record, StoreError,
    live::{read_snapshot, subscribe},
};
use alert_sphere_geocoder::{
    FailedPosition, FixedPosition, Locator, NoPositioning, PositionSource, ResolvedLocation,
};
use alert_sphere_server_models::{
    AdvanceStatusRequest, ApiBroadcastDispatch, ApiDeviceRegistration, ApiError, ApiHealth,
    ApiIncident, ApiIncidentList, ApiLocation, ApiMarker, ApiSignIn, ApiStats, ApiStatusChange,
    BroadcastRequest, DeviceRequest, IncidentListParams, ReportedPosition, ResourceRequest,
    SignInRequest, SubmitReportRequest, TeamRequest,
};
use futures::StreamExt as _;
use serde::Serialize;

use crate::AppState;

fn error_response(mut builder: actix_web::HttpResponseBuilder, error: String) -> HttpResponse {
    builder.json(ApiError { error })
}

/// Turns a malformed JSON body into a 400 with an [`ApiError`] body.
pub fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let response = error_response(
        HttpResponse::BadRequest(),
        format!("Invalid request body: {err}"),
    );
    InternalError::from_response(err, response).into()
}

/// Turns malformed query parameters into a 400 with an [`ApiError`] body.
pub fn query_error(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let response = error_response(
        HttpResponse::BadRequest(),
        format!("Invalid query parameters: {err}"),
    );
    InternalError::from_response(err, response).into()
}

/// Maps a dashboard notice to its HTTP status.
fn notice_response(notice: &Notice) -> HttpResponse {
    let builder = match notice {
        Notice::Validation(_) => HttpResponse::BadRequest(),
        Notice::NotFound { .. } => HttpResponse::NotFound(),
        Notice::StaleStatus { .. } | Notice::AlreadyResolved => HttpResponse::Conflict(),
        Notice::SignInFailed(_) => HttpResponse::Unauthorized(),
        Notice::SignInUnavailable => HttpResponse::ServiceUnavailable(),
        Notice::Backend(_) => HttpResponse::BadGateway(),
    };
    error_response(builder, notice.to_string())
}

/// Reads the full list of `T`, or the error response to send instead.
async fn snapshot<T: Record>(state: &AppState) -> Result<Vec<T>, HttpResponse> {
    read_snapshot::<T>(state.store.as_ref()).await.map_err(|e| {
        log::error!("Failed to read {}: {e}", T::COLLECTION);
        error_response(
            HttpResponse::BadGateway(),
            format!("Failed to load {}", T::COLLECTION),
        )
    })
}

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/incidents`
///
/// Newest first. Only the newest three unless `expanded=true`.
pub async fn list_incidents(
    state: web::Data<AppState>,
    params: web::Query<IncidentListParams>,
) -> HttpResponse {
    let reports = match snapshot::<IncidentReport>(&state).await {
        Ok(reports) => reports,
        Err(resp) => return resp,
    };
    let expanded = params.expanded.unwrap_or(false);

    HttpResponse::Ok().json(ApiIncidentList {
        incidents: reports_preview(&reports, expanded)
            .iter()
            .map(ApiIncident::from)
            .collect(),
        total: reports.len(),
        expanded,
    })
}

/// `POST /api/incidents`
pub async fn submit_incident(
    state: web::Data<AppState>,
    body: web::Json<SubmitReportRequest>,
) -> HttpResponse {
    let req = body.into_inner();

    let mut form = ReportForm::new();
    form.incident_type = req.incident_type.parse().ok();
    form.severity = req.severity.parse().ok();
    form.description = req.description;
    if let Some(text) = req.location {
        form.apply_location(ResolvedLocation {
            text,
            coordinates: req.coordinates,
        });
    }

    match form.submit(state.store.as_ref(), None).await {
        Ok(report) => HttpResponse::Created().json(ApiIncident::from(&report)),
        Err(notice) => notice_response(&notice),
    }
}

/// `POST /api/incidents/{id}/advance`
pub async fn advance_incident(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<AdvanceStatusRequest>,
) -> HttpResponse {
    let id = path.into_inner();
    match advance_status(state.store.as_ref(), &id, body.observed).await {
        Ok(status) => HttpResponse::Ok().json(ApiStatusChange { id, status }),
        Err(notice) => notice_response(&notice),
    }
}

/// `GET /api/markers`
pub async fn markers(state: web::Data<AppState>) -> HttpResponse {
    match snapshot::<IncidentReport>(&state).await {
        Ok(reports) => {
            let markers: Vec<ApiMarker> = derive_markers(&reports)
                .into_iter()
                .enumerate()
                .map(|(i, marker)| ApiMarker::placed(marker, i))
                .collect();
            HttpResponse::Ok().json(markers)
        }
        Err(resp) => resp,
    }
}

async fn list<T: Record + Serialize>(state: &AppState) -> HttpResponse {
    match snapshot::<T>(state).await {
        Ok(items) => HttpResponse::Ok().json(items),
        Err(resp) => resp,
    }
}

/// `GET /api/teams`
pub async fn list_teams(state: web::Data<AppState>) -> HttpResponse {
    list::<RescueTeam>(&state).await
}

/// `POST /api/teams`
pub async fn register_team(
    state: web::Data<AppState>,
    body: web::Json<TeamRequest>,
) -> HttpResponse {
    let req = body.into_inner();
    let mut form = TeamForm {
        team_name: req.team_name,
        team_lead: req.team_lead,
        contact: req.contact,
        status: req.status,
    };
    match form.submit(state.store.as_ref()).await {
        Ok(team) => HttpResponse::Created().json(team),
        Err(notice) => notice_response(&notice),
    }
}

/// `GET /api/resources`
pub async fn list_resources(state: web::Data<AppState>) -> HttpResponse {
    list::<Resource>(&state).await
}

/// `POST /api/resources`
pub async fn register_resource(
    state: web::Data<AppState>,
    body: web::Json<ResourceRequest>,
) -> HttpResponse {
    let req = body.into_inner();
    let mut form = ResourceForm {
        resource_name: req.resource_name,
        quantity: req.quantity,
        location: req.location,
        status: req.status,
    };
    match form.submit(state.store.as_ref()).await {
        Ok(resource) => HttpResponse::Created().json(resource),
        Err(notice) => notice_response(&notice),
    }
}

/// `GET /api/broadcasts`
pub async fn list_broadcasts(state: web::Data<AppState>) -> HttpResponse {
    list::<Broadcast>(&state).await
}

/// `POST /api/broadcasts`
///
/// The body always reports both the stored record and the push outcome.
/// A partial failure is a 502 carrying whatever did succeed.
pub async fn send_broadcast(
    state: web::Data<AppState>,
    body: web::Json<BroadcastRequest>,
) -> HttpResponse {
    let req = body.into_inner();
    let mut form = BroadcastForm {
        title: req.title,
        message: req.message,
    };

    match form.dispatch(state.store.as_ref(), state.push.as_ref()).await {
        Ok(dispatch) => {
            let mut builder = if dispatch.is_complete() {
                HttpResponse::Created()
            } else {
                HttpResponse::BadGateway()
            };
            builder.json(ApiBroadcastDispatch::from(dispatch))
        }
        Err(notice) => notice_response(&notice),
    }
}

/// Streams snapshots of `T` as server-sent events, one `snapshot` event
/// per change.
fn live_feed<T: Record + Serialize>(state: &AppState) -> HttpResponse {
    let mut snapshots = Box::pin(subscribe::<T>(state.store.clone()).into_stream());

    let stream = async_stream::stream! {
        while let Some(snapshot) = snapshots.next().await {
            let json = snapshot.and_then(|items| serde_json::to_string(&items).map_err(StoreError::from));
            let chunk = match json {
                Ok(json) => format!("event: snapshot\ndata: {json}\n\n"),
                Err(e) => {
                    log::error!("Live {} snapshot failed: {e}", T::COLLECTION);
                    format!("event: error\ndata: {}\n\n", serde_json::json!({"error": e.to_string()}))
                }
            };
            yield Ok::<web::Bytes, actix_web::Error>(web::Bytes::from(chunk));
        }
    };

    HttpResponse::Ok()
        .insert_header(("Cache-Control", "no-cache"))
        .content_type("text/event-stream")
        .streaming(stream)
}

/// `GET /api/live/{collection}`
pub async fn live(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let collection: Collection = match path.parse() {
        Ok(collection) => collection,
        Err(e) => return error_response(HttpResponse::NotFound(), e.to_string()),
    };

    log::debug!("Opening live feed for {collection}");
    match collection {
        Collection::Incidents => live_feed::<IncidentReport>(&state),
        Collection::RescueTeams => live_feed::<RescueTeam>(&state),
        Collection::Resources => live_feed::<Resource>(&state),
        Collection::Broadcasts => live_feed::<Broadcast>(&state),
    }
}

/// `GET /api/stats`
pub async fn stats(state: web::Data<AppState>) -> HttpResponse {
    let store = state.store.as_ref();
    let result: Result<_, StoreError> = tokio::try_join!(
        read_snapshot::<IncidentReport>(store),
        read_snapshot::<RescueTeam>(store),
        read_snapshot::<Resource>(store),
    );

    match result {
        Ok((incidents, teams, resources)) => HttpResponse::Ok().json(ApiStats {
            stats: DashboardStats::compute(&incidents, teams.len(), resources.len()),
            by_type: type_distribution(&incidents),
        }),
        Err(e) => {
            log::error!("Failed to compute stats: {e}");
            error_response(
                HttpResponse::BadGateway(),
                "Failed to load dashboard stats".to_string(),
            )
        }
    }
}

/// `POST /api/location/resolve`
///
/// Turns what the device reported into location text for the report
/// form. Always succeeds.
pub async fn resolve_location(
    state: web::Data<AppState>,
    body: web::Json<ReportedPosition>,
) -> HttpResponse {
    let source: Box<dyn PositionSource> = match body.into_inner() {
        ReportedPosition::Located {
            latitude,
            longitude,
        } => Box::new(FixedPosition(Coordinates::new(latitude, longitude))),
        ReportedPosition::Failed => Box::new(FailedPosition("reported by device".to_string())),
        ReportedPosition::Unsupported => Box::new(NoPositioning),
    };

    let resolved = Locator::new(source.as_ref(), state.geocoder.as_ref())
        .locate()
        .await;

    HttpResponse::Ok().json(ApiLocation {
        location: resolved.text,
        coordinates: resolved.coordinates,
    })
}

/// `POST /api/devices`
pub async fn register_device(
    state: web::Data<AppState>,
    body: web::Json<DeviceRequest>,
) -> HttpResponse {
    let registered = match state.devices.register(&body.token).await {
        Ok(registered) => registered,
        Err(e) => return error_response(HttpResponse::BadRequest(), e.to_string()),
    };
    HttpResponse::Ok().json(ApiDeviceRegistration {
        registered,
        devices: state.devices.len().await,
    })
}

/// `POST /api/auth/sign-in`
///
/// The returned view follows the login tab used. The role is not checked
/// against the identity, which is why `roleVerified` is always `false`.
pub async fn sign_in(state: web::Data<AppState>, body: web::Json<SignInRequest>) -> HttpResponse {
    let Some(identity) = &state.identity else {
        return notice_response(&Notice::SignInUnavailable);
    };

    let req = body.into_inner();
    match authenticate(identity.as_ref(), &req.credentials).await {
        Ok(session) => {
            log::warn!(
                "User {} signed in claiming the {} role (unverified)",
                session.uid,
                req.role
            );
            HttpResponse::Ok().json(ApiSignIn {
                session,
                view: req.role.view(),
                claimed_role: req.role,
                role_verified: false,
            })
        }
        Err(notice) => notice_response(&notice),
    }
}

/// `GET /api/safety-tips`
pub async fn safety_tips() -> HttpResponse {
    HttpResponse::Ok().json(SAFETY_TIPS)
}

/// `GET /api/emergency-contacts`
pub async fn emergency_contacts() -> HttpResponse {
    HttpResponse::Ok().json(EMERGENCY_CONTACTS)
}
