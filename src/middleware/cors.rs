use axum::http::{header, Method};
use tower_http::cors::{Any, CorsLayer};

/// The portfolio front end is served from another origin.
pub fn portfolio_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_origin(Any)
}
