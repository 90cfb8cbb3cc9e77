//! LifeScore: health-document upload, background AI analysis, and report history.

pub mod analysis;
pub mod client;
pub mod config;
pub mod db;
pub mod errors;
pub mod jobs;
pub mod models;
pub mod reports;
pub mod routes;
pub mod state;
pub mod store;
