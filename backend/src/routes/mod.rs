//! Route definitions for the workshop inventory platform

use axum::{
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes. Everything except the health check needs a token.
pub fn api_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .nest("/stock", stock_routes())
        .nest("/purchase-orders", purchase_order_routes())
        .nest("/stock-inwards", stock_inward_routes())
        .nest("/stock-issues", stock_issue_routes())
        .nest("/counter-sales", counter_sale_routes())
        .nest("/purchase-returns", purchase_return_routes())
        .nest("/stock-transfers", stock_transfer_routes())
        .nest("/stock-alerts", stock_alert_routes())
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        .merge(protected)
}

/// Stock master routes
fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_stock_items).post(handlers::create_stock_item))
        .route("/bulk", post(handlers::bulk_create_stock_items))
        .route("/part/:part_number", get(handlers::get_stock_by_part_number))
        .route(
            "/:stock_id",
            get(handlers::get_stock_item)
                .put(handlers::update_stock_item)
                .delete(handlers::deactivate_stock_item),
        )
        .route("/:stock_id/adjust", post(handlers::adjust_stock_quantity))
        .route("/:stock_id/movements", get(handlers::list_stock_movements))
}

/// Purchase order routes
fn purchase_order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_purchase_orders).post(handlers::create_purchase_order))
        .route("/number/:order_no", get(handlers::get_purchase_order_by_no))
        .route(
            "/:order_id",
            get(handlers::get_purchase_order).delete(handlers::delete_purchase_order),
        )
        .route("/:order_id/submit", post(handlers::submit_purchase_order))
        .route(
            "/:order_id/parts",
            post(handlers::add_ordered_part).delete(handlers::remove_ordered_part),
        )
        .route("/:order_id/inward", post(handlers::inward_purchase_order_parts))
        .route("/:order_id/reject", post(handlers::reject_purchase_order_parts))
        .route("/:order_id/payments", post(handlers::record_purchase_order_payment))
        .route("/:order_id/close", post(handlers::close_purchase_order))
        .route("/:order_id/cancel", post(handlers::cancel_purchase_order))
}

/// Stock inward routes
fn stock_inward_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_stock_inwards).post(handlers::create_stock_inward))
        .route("/from-purchase-order", post(handlers::create_inward_from_purchase_order))
        .route(
            "/:inward_id",
            get(handlers::get_stock_inward).delete(handlers::delete_stock_inward),
        )
        .route("/:inward_id/items", put(handlers::update_stock_inward_items))
        .route("/:inward_id/submit", post(handlers::submit_stock_inward))
        .route("/:inward_id/verify", post(handlers::verify_stock_inward))
        .route("/:inward_id/cancel", post(handlers::cancel_stock_inward))
}

/// Stock issue routes
fn stock_issue_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_stock_issues).post(handlers::create_stock_issue))
        .route(
            "/:issue_id",
            get(handlers::get_stock_issue)
                .put(handlers::update_stock_issue)
                .delete(handlers::delete_stock_issue),
        )
        .route("/:issue_id/issue", post(handlers::issue_parts))
        .route("/:issue_id/issue-all", post(handlers::issue_all_parts))
        .route("/:issue_id/return", post(handlers::return_issued_parts))
        .route("/:issue_id/cancel", post(handlers::cancel_stock_issue))
}

/// Counter sale routes
fn counter_sale_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_counter_sales).post(handlers::create_counter_sale))
        .route("/quick", post(handlers::quick_sale))
        .route(
            "/:sale_id",
            get(handlers::get_counter_sale)
                .put(handlers::update_counter_sale)
                .delete(handlers::delete_counter_sale),
        )
        .route("/:sale_id/items", post(handlers::add_counter_sale_items))
        .route("/:sale_id/items/:index", delete(handlers::remove_counter_sale_item))
        .route("/:sale_id/complete", post(handlers::complete_counter_sale))
        .route("/:sale_id/payments", post(handlers::add_counter_sale_payment))
        .route("/:sale_id/cancel", post(handlers::cancel_counter_sale))
        .route("/:sale_id/refund", post(handlers::refund_counter_sale))
}

/// Purchase return routes
fn purchase_return_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_purchase_returns).post(handlers::create_purchase_return))
        .route("/from-purchase-order", post(handlers::create_return_from_purchase_order))
        .route("/from-stock-inward", post(handlers::create_return_from_stock_inward))
        .route(
            "/:return_id",
            get(handlers::get_purchase_return).delete(handlers::delete_purchase_return),
        )
        .route("/:return_id/items", put(handlers::update_purchase_return_items))
        .route("/:return_id/submit", post(handlers::submit_purchase_return))
        .route("/:return_id/approve", post(handlers::approve_purchase_return))
        .route("/:return_id/ship", post(handlers::ship_purchase_return))
        .route("/:return_id/shipment", patch(handlers::update_purchase_return_shipment))
        .route("/:return_id/deliver", post(handlers::deliver_purchase_return))
        .route("/:return_id/refund", post(handlers::record_purchase_return_refund))
        .route("/:return_id/waive-refund", post(handlers::waive_purchase_return_refund))
        .route("/:return_id/close", post(handlers::close_purchase_return))
        .route("/:return_id/cancel", post(handlers::cancel_purchase_return))
}

/// Inter-workshop transfer routes
fn stock_transfer_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_stock_transfers).post(handlers::create_stock_transfer))
        .route(
            "/:transfer_id",
            get(handlers::get_stock_transfer).delete(handlers::delete_stock_transfer),
        )
        .route("/:transfer_id/items", put(handlers::update_stock_transfer_items))
        .route("/:transfer_id/submit", post(handlers::submit_stock_transfer))
        .route("/:transfer_id/approve", post(handlers::approve_stock_transfer))
        .route("/:transfer_id/dispatch", post(handlers::dispatch_stock_transfer))
        .route("/:transfer_id/deliver", post(handlers::deliver_stock_transfer))
        .route("/:transfer_id/receive", post(handlers::receive_stock_transfer))
        .route("/:transfer_id/cancel", post(handlers::cancel_stock_transfer))
}

/// Low-stock alert routes
fn stock_alert_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_stock_alerts))
        .route("/generate", post(handlers::generate_stock_alerts))
        .route("/bulk-resolve", post(handlers::bulk_resolve_stock_alerts))
        .route("/:alert_id", get(handlers::get_stock_alert))
        .route("/:alert_id/acknowledge", post(handlers::acknowledge_stock_alert))
        .route("/:alert_id/resolve", post(handlers::resolve_stock_alert))
        .route("/:alert_id/ignore", post(handlers::ignore_stock_alert))
}
