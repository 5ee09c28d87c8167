//! Core trait abstractions.

pub mod fetcher;
pub mod sink;
