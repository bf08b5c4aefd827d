//! Candidate sourcing and scoring pipeline.
//!
//! A job goes through source adapter → enrichment cache → scoring engine →
//! ranking, driven by the [`pipeline::Orchestrator`]. The HTTP surface in
//! [`routes`] is a thin wrapper over it.

pub mod cache;
pub mod config;
pub mod errors;
pub mod models;
pub mod outreach;
pub mod pipeline;
pub mod ranking;
pub mod routes;
pub mod scoring;
pub mod source;
pub mod state;
