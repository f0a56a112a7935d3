//! # Auth Module
//!
//! Social login and sessions:
//! - OAuth redirect/callback for the supported providers
//! - Account resolution and linking for provider profiles
//! - Session tokens and the AuthedUser extractor for protected routes

pub mod callback;
pub mod cookies;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod provider;
pub mod resolver;
pub mod routes;
pub mod session;
pub mod store;


pub use extractors::AuthedUser;
pub use routes::auth_routes;
