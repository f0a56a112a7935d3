// src/podcasts/mod.rs

pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod slug;
pub mod storage;
pub mod validators;


pub use routes::podcasts_routes;
