/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use bugimprints_api::{app::AppState, config::Config};
/// use bugimprints_shared::storage::LocalMediaStorage;
/// use sqlx::PgPool;
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let storage = Arc::new(LocalMediaStorage::new(config.media.root.clone()));
/// let state = AppState::new(pool, config, storage);
/// let app = bugimprints_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError};
use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{delete, get, post, put},
    Router,
};
use bugimprints_shared::{
    auth::context::{bearer_token, resolve_context},
    storage::MediaStorage,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state, cloned into every handler
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,

    /// Backend that receives uploaded media bytes
    pub storage: Arc<dyn MediaStorage>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config, storage: Arc<dyn MediaStorage>) -> Self {
        Self {
            db,
            config: Arc::new(config),
            storage,
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete router
///
/// ```text
/// /
/// ├── /health                        public
/// └── /v1/
///     ├── /auth/{register,login,refresh}   public
///     ├── /users, /users/:id/...           bearer token
///     ├── /teams, /teams/:id/...
///     ├── /bugs, /bugs/:id/...
///     ├── /duplicates/:id
///     ├── /resolutions, /resolutions/:id/messages
///     ├── /messages/:id
///     └── /media, /media/:id
/// ```
///
/// Layers, outermost first: CORS, tracing, then JWT authentication on every
/// `/v1` route except `/v1/auth`.
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh));

    let upload_limit = state.config.media.max_upload_bytes;
    let media_routes = Router::new()
        .route("/", post(routes::media::upload))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(upload_limit))
        .route("/:id", delete(routes::media::delete_media));

    let protected_routes = Router::new()
        .route("/users", get(routes::users::list_users))
        .route(
            "/users/:id/teams/:team_id",
            post(routes::users::add_to_team).delete(routes::users::remove_from_team),
        )
        .route("/users/:id/account-type", put(routes::users::change_account_type))
        .route("/users/:id/disable", post(routes::users::disable_user))
        .route(
            "/teams",
            get(routes::teams::list_teams).post(routes::teams::create_team),
        )
        .route(
            "/teams/:id",
            get(routes::teams::get_team)
                .patch(routes::teams::update_team)
                .delete(routes::teams::delete_team),
        )
        .route("/teams/:id/resolutions", get(routes::teams::team_resolutions))
        .route("/bugs", get(routes::bugs::list_bugs).post(routes::bugs::create_bug))
        .route(
            "/bugs/:id",
            get(routes::bugs::get_bug)
                .patch(routes::bugs::update_bug)
                .delete(routes::bugs::delete_bug),
        )
        .route("/bugs/:id/reject", post(routes::bugs::reject_bug))
        .route(
            "/bugs/:id/watch",
            get(routes::bugs::list_watchers)
                .post(routes::bugs::watch_bug)
                .delete(routes::bugs::unwatch_bug),
        )
        .route(
            "/bugs/:id/duplicates",
            get(routes::bugs::list_duplicates).post(routes::bugs::mark_duplicate),
        )
        .route("/duplicates/:id", delete(routes::bugs::remove_duplicate))
        .route(
            "/resolutions",
            get(routes::resolutions::list_resolutions).post(routes::resolutions::create_resolution),
        )
        .route(
            "/resolutions/:id",
            get(routes::resolutions::get_resolution)
                .patch(routes::resolutions::update_resolution)
                .delete(routes::resolutions::delete_resolution),
        )
        .route(
            "/resolutions/:id/messages",
            get(routes::messages::list_messages).post(routes::messages::create_message),
        )
        .route("/messages/:id", delete(routes::messages::delete_message))
        .nest("/media", media_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .merge(protected_routes);

    let cors = if state.config.allows_any_origin() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

/// Resolves the bearer token to an `AuthContext` request extension
///
/// The user is reloaded on every request, so a disabled account stops
/// working immediately even with an unexpired token.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = {
        let value = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        bearer_token(value)?.to_string()
    };

    let auth = resolve_context(&state.db, &token, state.jwt_secret()).await?;

    req.extensions_mut().insert(auth);

    Ok(next.run(req).await)
}
