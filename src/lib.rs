//! hazard-atlas: a caching proxy for aviation hazard advisories, with a pipeline that
//! normalizes them into GeoJSON features and filters them for display.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
