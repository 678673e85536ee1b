//! Farm Monitor - IoT farm monitoring dashboard backend
//!
//! Classifies sensor readings against threshold bands, aggregates sensor and
//! pest reports over date ranges, and exports them as CSV or print documents.
//! This library exposes the core modules for testing and reuse.

pub mod bridge;
pub mod common;
pub mod config;
pub mod context;
pub mod domain;
pub mod entity;
pub mod error;
pub mod evaluation;
pub mod export;
pub mod reports;
pub mod routes;
pub mod settings;
pub mod views;
