//! Request validation and HTTP middleware layers

pub mod validator;

pub use validator::{InputValidator, ValidationError};

use tower_http::cors::CorsLayer;

/// CORS policy for the workshop frontend, which is served from another origin
pub fn cors_layer() -> CorsLayer {
    CorsLayer::permissive()
}
