//! Route definitions for the Boutique stock platform

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Storefront checkout (public)
        .route("/orders", post(handlers::create_order))
        // Notification stream (authenticated through the query token)
        .route("/sse/notifications", get(handlers::notification_stream))
        // Protected routes - back office
        .merge(admin_routes(state))
}

/// Back-office routes (admin only)
fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/inventory", inventory_routes())
        .nest("/products", product_routes())
        .route(
            "/facilities",
            get(handlers::list_facilities).post(handlers::create_facility),
        )
        .route("/orders", get(handlers::list_orders))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Reception and ledger routes
fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/receptions",
            get(handlers::list_receptions).post(handlers::create_reception),
        )
        .route(
            "/receptions/:reception_id",
            get(handlers::get_reception)
                .patch(handlers::update_reception)
                .delete(handlers::delete_reception),
        )
        .route("/validate-tracking", get(handlers::validate_tracking))
        .route(
            "/lookup-sortie-by-tracking",
            get(handlers::lookup_sortie_by_tracking),
        )
        .route(
            "/movements",
            get(handlers::list_movements).post(handlers::record_movement),
        )
}

/// Catalog routes
fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_products))
        .route("/scan", post(handlers::scan_product))
        .route("/:reference", get(handlers::get_product))
}
