//! Authentication routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Creates and returns the authentication router
///
/// # Routes
/// - `GET /auth/:provider/redirect` - Start the OAuth flow
/// - `GET /auth/:provider/callback` - Finish the OAuth flow and log in
/// - `GET /login` - Login entry point
/// - `GET /dashboard` - Landing page after login
/// - `POST /logout` - End persistent sessions
/// - `GET /api/me` - Get current user information
pub fn auth_routes() -> Router {
    Router::new()
        .route("/auth/:provider/redirect", get(handlers::oauth_redirect))
        .route("/auth/:provider/callback", get(handlers::oauth_callback))
        .route("/login", get(handlers::login_page))
        .route("/dashboard", get(handlers::dashboard))
        .route("/logout", post(handlers::logout_handler))
        .route("/api/me", get(handlers::me_handler))
}
