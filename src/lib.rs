//! Orders and order line items over HTTP, stored in a local SQLite file.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod openapi;
pub mod telemetry;
