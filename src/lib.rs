//! Crédito PME API Library
//!
//! Credit scoring for small and medium businesses: request normalization,
//! the two score formulas, the reference company dataset and the HTTP layer.
//!
//! # Modules
//!
//! - `config`: Configuration management.
//! - `dataset`: Reference company table (JSON, CSV, Parquet or XML).
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `middleware`: Per-request trace id.
//! - `models`: Request and response payloads.
//! - `normalizer`: Request reconciliation into a canonical record.
//! - `openapi`: OpenAPI document.
//! - `router`: Router and middleware stack.
//! - `scoring`: Score formulas.
//! - `services`: Scoring service with cached company lookups.

// Re-export primary modules for shared use in tests and other binaries
pub mod config;
pub mod dataset;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod normalizer;
pub mod openapi;
pub mod router;
pub mod scoring;
pub mod services;
