//! Data types for the enrichment pipeline.

pub mod config;
pub mod page;
pub mod row;
