//! HTTP layer: routes each request to one store operation and maps the
//! result onto a status code. JSON lives under `/api/profiles`; the HTML
//! form flow at `/` mirrors the old method-override forms, so `PATCH`-style
//! partial edits arrive as `POST` with `_method=PUT`.

use std::net::SocketAddr;
use std::path::Path as FsPath;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{delete, get, get_service};
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{event, instrument, Level};

use profile_store::{Profile, ProfileChanges, ProfileStore, StoreError};

use crate::render;

pub struct AppState<S> {
    pub store: S,
    pub page: String,
}

/// Build the application router. The purge route only exists when asked
/// for; otherwise `DELETE /api/profiles` is a plain method mismatch.
pub fn router<S>(state: Arc<AppState<S>>, public_dir: &FsPath, enable_purge: bool) -> Router
where
    S: ProfileStore + Send + Sync + 'static,
{
    let assets = get_service(ServeDir::new(public_dir));

    let cors = CorsLayer::new()
        .allow_headers(Any)
        .allow_methods(Any)
        .allow_origin(Any);

    let mut app = Router::new()
        .route("/", get(index::<S>).post(submit_form::<S>))
        .route(
            "/api/profiles",
            get(list_profiles::<S>).post(create_profile::<S>),
        )
        .route(
            "/api/profiles/:email",
            get(get_profile::<S>)
                .patch(update_profile::<S>)
                .put(upsert_profile::<S>)
                .delete(delete_profile::<S>),
        );

    if enable_purge {
        app = app.route("/api/profiles", delete(purge_profiles::<S>));
    }

    app.nest_service("/assets", assets)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve until ctrl-c, draining in-flight requests on the way out.
pub async fn serve<S>(
    addr: SocketAddr,
    store: S,
    page: String,
    public_dir: &FsPath,
    enable_purge: bool,
) -> anyhow::Result<()>
where
    S: ProfileStore + Send + Sync + 'static,
{
    let state = Arc::new(AppState { store, page });
    let app = router(state, public_dir, enable_purge);

    event!(Level::INFO, %addr, "profile server listening");
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        event!(Level::ERROR, %error, "failed to install ctrl-c handler");
        return;
    }
    event!(Level::INFO, "shutting down");
}

/// Store errors carried across the handler boundary. Caller mistakes come
/// back as 4xx with the message text; backend failures are logged here and
/// answered with an opaque 500.
pub struct ApiError(StoreError);

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError(err)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            StoreError::NotFound(_) => (StatusCode::NOT_FOUND, self.0.to_string()),
            StoreError::InvalidInput(_) | StoreError::AlreadyExists(_) => {
                (StatusCode::BAD_REQUEST, self.0.to_string())
            }
            StoreError::Backend(_) | StoreError::Codec(_) => {
                event!(Level::ERROR, error = %self.0, "store backend failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[derive(Deserialize)]
pub struct CreateProfile {
    email: String,
    name: Option<String>,
    address: Option<String>,
}

#[derive(Deserialize)]
pub struct UpsertProfile {
    name: Option<String>,
    address: Option<String>,
}

#[derive(Serialize)]
struct Purged {
    deleted: usize,
}

async fn list_profiles<S: ProfileStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Profile>>, ApiError> {
    Ok(Json(state.store.list_all().await?))
}

#[instrument(skip_all, fields(email = %body.email))]
async fn create_profile<S: ProfileStore>(
    State(state): State<Arc<AppState<S>>>,
    Json(body): Json<CreateProfile>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state
        .store
        .create(&body.email, body.name, body.address)
        .await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

async fn get_profile<S: ProfileStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(email): Path<String>,
) -> Result<Json<Profile>, ApiError> {
    Ok(Json(state.store.get(&email).await?))
}

#[instrument(skip(state, changes))]
async fn update_profile<S: ProfileStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(email): Path<String>,
    Json(changes): Json<ProfileChanges>,
) -> Result<Json<Profile>, ApiError> {
    Ok(Json(state.store.update(&email, changes).await?))
}

#[instrument(skip(state, body))]
async fn upsert_profile<S: ProfileStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(email): Path<String>,
    Json(body): Json<UpsertProfile>,
) -> Result<Response, ApiError> {
    let (profile, was_created) = state
        .store
        .upsert(&email, body.name, body.address)
        .await?;
    let status = if was_created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(profile)).into_response())
}

#[instrument(skip(state))]
async fn delete_profile<S: ProfileStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(email): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.store.delete(&email).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn purge_profiles<S: ProfileStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Purged>, ApiError> {
    let deleted = state.store.delete_all().await?;
    event!(Level::WARN, deleted, "purged every profile");
    Ok(Json(Purged { deleted }))
}

#[derive(Deserialize)]
pub struct IndexQuery {
    email: Option<String>,
}

async fn index<S: ProfileStore>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<IndexQuery>,
) -> Result<Html<String>, ApiError> {
    let profiles = state.store.list_all().await?;
    let emails: Vec<String> = profiles.iter().map(|p| p.email.clone()).collect();

    let profile = match query.email.as_deref().filter(|e| !e.is_empty()) {
        Some(email) => Some(state.store.get(email).await?),
        None => None,
    };

    Ok(Html(render::render_page(
        &state.page,
        profile.as_ref(),
        &emails,
    )))
}

#[derive(Deserialize)]
pub struct ProfileForm {
    email: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    address: String,
    #[serde(default, rename = "_method")]
    method: Option<String>,
}

/// The form posts everything to `/`, carrying the real verb in `_method`.
/// On the override path an empty field means "leave unchanged", which is
/// what makes this the partial-update route.
async fn submit_form<S: ProfileStore>(
    State(state): State<Arc<AppState<S>>>,
    Form(form): Form<ProfileForm>,
) -> Result<Redirect, ApiError> {
    match form.method.as_deref() {
        Some("PUT") => {
            let changes = ProfileChanges {
                name: not_blank(form.name),
                address: not_blank(form.address),
            };
            let profile = state.store.update(&form.email, changes).await?;
            Ok(Redirect::to(&format!("/?email={}", profile.email)))
        }
        Some("DELETE") => {
            state.store.delete(&form.email).await?;
            Ok(Redirect::to("/"))
        }
        _ => {
            let profile = state
                .store
                .create(&form.email, not_blank(form.name), not_blank(form.address))
                .await?;
            Ok(Redirect::to(&format!("/?email={}", profile.email)))
        }
    }
}

fn not_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
