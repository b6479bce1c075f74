//! HTTP surface: one router per resource, merged under shared layers.

pub mod appointments;
pub mod audit;
pub mod auth;
pub mod billing;
pub mod clinical;
pub mod directory;
pub mod extract;
pub mod facilities;
pub mod patients;
pub mod payroll;
pub mod pharmacy;
pub mod roster;
pub mod system;

pub use extract::{ApiJson, ApiPath, ApiQuery, Pagination};

use crate::config::AppConfig;
use crate::AppState;
use axum::http::{header, HeaderName, HeaderValue, Method, Request};
use axum::Router;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Build the complete application router
pub fn router(state: Arc<AppState>) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    let cors = cors_layer(&state.config);

    Router::new()
        .merge(system::routes())
        .nest("/auth", auth::routes())
        .merge(patients::routes())
        .merge(directory::routes())
        .merge(facilities::routes())
        .merge(appointments::routes())
        .merge(billing::routes())
        .merge(pharmacy::routes())
        .merge(payroll::routes())
        .merge(roster::routes())
        .merge(clinical::routes())
        .merge(audit::routes())
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                    let request_id = request
                        .headers()
                        .get(REQUEST_ID_HEADER)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("-");
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                        request_id = %request_id,
                    )
                }))
                .layer(PropagateRequestIdLayer::new(request_id))
                .layer(cors),
        )
        .with_state(state)
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins()
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
}
