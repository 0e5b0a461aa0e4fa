//! Application services: the cached advisory proxy and the feature pipeline on top.

pub mod advisories;
pub mod error;
pub mod proxy;
