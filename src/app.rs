use std::any::Any;
use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::config::{AppConfig, SecurityConfig};
use crate::database::StoreConnector;
use crate::error::ApiError;
use crate::handlers::{bookdata, public, userdata, uuidmap};
use crate::middleware::auth_gate;

/// Filter used when `RUST_LOG` is unset: every request and store read at INFO
pub const DEFAULT_LOG_FILTER: &str = "voya_api_rust=info,tower_http=info";

/// Immutable per-process state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn StoreConnector>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn StoreConnector>) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }
}

pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.security);

    Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        // Gated data routes
        .merge(data_routes(state.clone()))
        .fallback(public::not_found)
        // Global middleware
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

fn data_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Users
        .route("/is-available", get(userdata::is_available))
        .route("/fetch-userdata", get(userdata::fetch_userdata))
        .route("/push-userdata", post(userdata::push_userdata))
        // Books
        .route("/fetch-bookdata", get(bookdata::fetch_bookdata))
        .route("/fetch-user-bookdata", get(bookdata::fetch_user_bookdata))
        .route("/push-bookdata", post(bookdata::push_bookdata))
        // Username <-> uuid bridge
        .route("/get-uuid-from-username", get(uuidmap::get_uuid_from_username))
        .route("/update-uuid-username", post(uuidmap::update_uuid_username))
        // route_layer keeps unmatched paths on the ungated 404 fallback
        .route_layer(middleware::from_fn_with_state(state, auth_gate))
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if !security.enable_cors {
        return CorsLayer::new();
    }

    let origins = if security.cors_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(security.cors_origins.iter().filter_map(|o| o.parse::<HeaderValue>().ok()))
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

fn panic_response(_err: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("Handler panicked");
    ApiError::internal_server_error("Internal Server Error").into_response()
}
