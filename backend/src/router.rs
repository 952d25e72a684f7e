use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers,
    middleware::{auth_gate, optional_auth_gate, RouteRoles},
    state::AppState,
};

/// Builds the application router. Role allow-lists are declared here, at the
/// route boundary, over the closed role enum.
pub fn app(state: AppState) -> Router {
    // Public routes (no gate)
    let public_routes = Router::new()
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/refresh", post(handlers::auth::refresh));

    // Routes for any verified identity
    let user_routes = Router::new()
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route("/api/auth/me", get(handlers::auth::me))
        .route_layer(axum_middleware::from_fn_with_state(
            (state.config.clone(), RouteRoles::ANY_AUTHENTICATED),
            auth_gate,
        ));

    // Media routes admit anonymous callers; the authorizer applies the
    // free-preview/enrollment policy.
    let media_routes = Router::new()
        .route(
            "/api/courses/{course_id}/lessons/{lesson_id}/ticket",
            get(handlers::media::playback_ticket),
        )
        .route(
            "/api/courses/{course_id}/lessons/{lesson_id}/access",
            get(handlers::media::key_access),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.config.clone(),
            optional_auth_gate,
        ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .merge(media_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
