//! Universal JSON API (`/api/v1`)

pub mod discovery;
pub mod emails;
pub mod jobs;
pub mod types;
