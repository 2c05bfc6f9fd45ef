//! Request extractors applied before handlers run.

pub mod auth;
