//! County Portal - recruitment, accounting and DIAL declaration backend
//!
//! This crate provides the REST service behind the county portal: public job
//! listings and applications, applicant profiles and documents, the DIAL
//! (Declaration of Income, Assets & Liabilities) review workflow, transaction
//! approval with voucher generation, and a typed client for the API.

pub mod accounting;
pub mod client;
pub mod config;
pub mod db;
pub mod dial;
pub mod docgen;
pub mod entity;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod permission;
pub mod recruitment;
pub mod routes;
pub mod state;
pub mod upload;
pub mod ws;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, AppResult};
pub use state::AppState;
