//! HTTP adapter for the order fulfillment engine.
//!
//! Maps JSON requests and the forwarded caller identity onto the engine's
//! workflows, engine errors onto status codes, and exposes `/health` and a
//! Prometheus `/metrics` endpoint.

pub mod config;
pub mod error;
pub mod identity;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use event_store::EventStore;
use fulfillment::{Clock, Fulfillment, FulfillmentConfig, InMemoryMerchantAccounts, Outbox};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S> {
    pub fulfillment: Fulfillment<S>,
    pub merchants: InMemoryMerchantAccounts,
}

/// Wires the engine to `store`, with merchant accounts kept in memory.
pub fn create_state<S: EventStore + Clone + 'static>(
    store: S,
    clock: Arc<dyn Clock>,
    outbox: Outbox,
    config: FulfillmentConfig,
) -> Arc<AppState<S>> {
    let merchants = InMemoryMerchantAccounts::new();
    let fulfillment = Fulfillment::new(store, Arc::new(merchants.clone()), clock, outbox, config);
    Arc::new(AppState {
        fulfillment,
        merchants,
    })
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: EventStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    use routes::{adjustments, inventory, merchants, orders, payments};

    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(orders::place::<S>).get(orders::list::<S>))
        .route("/orders/{id}", get(orders::get::<S>))
        .route("/orders/{id}/cancel", post(orders::cancel::<S>))
        .route("/orders/{id}/return", post(orders::return_order::<S>))
        .route("/orders/{id}/status", put(orders::update_status::<S>))
        .route("/orders/{id}/adjustments", get(adjustments::list::<S>))
        .route(
            "/orders/{id}/cancellations",
            post(adjustments::request_cancellation::<S>),
        )
        .route("/orders/{id}/returns", post(adjustments::request_return::<S>))
        .route(
            "/orders/{id}/adjustments/{adjustment_id}/review",
            post(adjustments::review::<S>),
        )
        .route(
            "/orders/{id}/adjustments/{adjustment_id}/picked-up",
            post(adjustments::picked_up::<S>),
        )
        .route(
            "/orders/{id}/adjustments/{adjustment_id}/received",
            post(adjustments::received::<S>),
        )
        .route(
            "/orders/{id}/adjustments/{adjustment_id}/return-refund",
            post(adjustments::return_refund::<S>),
        )
        .route(
            "/orders/{id}/adjustments/{adjustment_id}/cancellation-refund",
            post(adjustments::cancellation_refund::<S>),
        )
        .route(
            "/orders/{id}/payment",
            post(payments::create::<S>).get(payments::for_order::<S>),
        )
        .route("/payments/{id}", get(payments::get::<S>))
        .route("/payments/{id}/verify", post(payments::verify::<S>))
        .route("/payments/{id}/refund", post(payments::refund::<S>))
        .route("/inventory", post(inventory::register::<S>))
        .route("/inventory/{id}", get(inventory::get::<S>))
        .route("/inventory/{id}/restock", post(inventory::restock::<S>))
        .route(
            "/merchant-accounts",
            get(merchants::list::<S>).put(merchants::upsert::<S>),
        )
        .route(
            "/merchant-accounts/{id}/primary",
            post(merchants::set_primary::<S>),
        )
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
