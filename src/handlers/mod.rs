//! Request handlers module

pub mod accounting;
pub mod application;
pub mod audit;
pub mod auth;
pub mod config;
pub mod department;
pub mod dial;
pub mod employee;
pub mod job;
pub mod profile;
pub mod upload;
pub mod user;
