use crate::handlers;
use crate::state::ApiState;
use axum::Router;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;
use utoipa_scalar::{Scalar, Servable};

#[derive(OpenApi)]
#[openapi(
    info(title = "Veil", description = "Encrypting proxy for Redis"),
    tags(
        (name = "System", description = "Service status"),
        (name = "Store", description = "Encrypted store commands"),
    )
)]
struct ApiDoc;

/// Builds the application router, API docs included (served under `/scalar`).
pub fn init(state: ApiState) -> Router {
    let (routes, api_doc) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .routes(routes!(handlers::health))
        .routes(routes!(handlers::get_value, handlers::delete_value))
        .routes(routes!(handlers::set_value, handlers::flush_all))
        .routes(routes!(handlers::zadd))
        .routes(routes!(handlers::zrange_by_score))
        .routes(routes!(handlers::sum))
        .routes(routes!(handlers::diff))
        .routes(routes!(handlers::mult))
        .routes(routes!(handlers::sadd))
        .routes(routes!(handlers::smembers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        .split_for_parts();

    Router::new().merge(routes).merge(Scalar::with_url("/scalar", api_doc))
}
