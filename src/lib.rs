pub mod aggregate;
pub mod app;
pub mod auth;
pub mod cache;
pub mod config;
pub mod credentials;
pub mod error;
pub mod model;
pub mod normalize;
pub mod output;
pub mod strava;
