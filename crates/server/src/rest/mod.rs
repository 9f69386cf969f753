//! The REST surface: request parsing, auth middleware, status-code mapping.

mod dto;
mod handlers;
mod middleware;
#[cfg(test)]
mod tests;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/user/info", get(handlers::user_info))
        .route("/user/data", get(handlers::get_datas).post(handlers::new_data))
        .route(
            "/user/data/:id",
            get(handlers::get_data)
                .put(handlers::upd_data)
                .delete(handlers::del_data),
        )
        .route_layer(from_fn_with_state(state.clone(), middleware::require_bearer_token));

    let public = Router::new()
        .route("/auth/registration", post(handlers::registration))
        .route("/auth/login", post(handlers::login));

    Router::new()
        .route("/healthz", get(handlers::healthz))
        .nest(
            "/api/v0",
            Router::new().merge(public).merge(protected),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
