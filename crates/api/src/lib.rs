//! HTTP API server for the foundry marketplace.
//!
//! Exposes order drafting, offer arbitration, assemblies and CAD splitting
//! under `/api`, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use record_store::RecordStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use routes::AppState;

/// Largest CAD file accepted for splitting.
pub const MAX_CAD_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: RecordStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    use routes::{assemblies, offers, orders, parts};

    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    let api = Router::new()
        .route("/orders", get(orders::list_mine::<S>))
        .route("/orders/drafts", post(orders::create_draft::<S>))
        .route("/orders/unclaimed", get(orders::list_unclaimed::<S>))
        .route("/orders/{order_id}", get(orders::get::<S>))
        .route("/orders/{order_id}/archive", post(orders::archive::<S>))
        .route("/orders/{order_id}/status", post(orders::advance_status::<S>))
        .route(
            "/orders/{order_id}/shipping",
            get(orders::get_shipping::<S>).post(orders::update_shipping::<S>),
        )
        .route(
            "/orders/{order_id}/offers",
            get(offers::list_open::<S>).post(offers::submit::<S>),
        )
        .route("/offers/{offer_id}/accept", post(offers::accept::<S>))
        .route("/offers/{offer_id}/decline", post(offers::decline::<S>))
        .route(
            "/orders/{order_id}/assemblies",
            get(assemblies::list::<S>).post(assemblies::create::<S>),
        )
        .route(
            "/orders/{order_id}/assemblies/build-order",
            post(assemblies::reorder::<S>),
        )
        .route(
            "/orders/{order_id}/parts/split",
            post(parts::split::<S>).layer(DefaultBodyLimit::max(MAX_CAD_UPLOAD_BYTES)),
        )
        .route(
            "/assemblies/{assembly_id}/specifications",
            get(assemblies::list_specifications::<S>).post(assemblies::save_specification::<S>),
        )
        .route("/assemblies/{assembly_id}/status", post(assemblies::set_status::<S>));

    Router::new()
        .route("/health", get(routes::health::check))
        .nest("/api", api)
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
