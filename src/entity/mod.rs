//! Entity module - SeaORM entity definitions
//!
//! One module per table. Cross-table relations are resolved with manual
//! queries in the handlers.

pub mod application;
pub mod audit_log;
pub mod department;
pub mod dependent;
pub mod dial_record;
pub mod education;
pub mod employee;
pub mod employment;
pub mod imprest;
pub mod job;
pub mod spouse;
pub mod statement_item;
pub mod transaction;
pub mod uploaded_file;
pub mod user;
