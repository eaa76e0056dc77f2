//! HTTP host for the dashboard and JSON API.

pub mod http;

pub use http::*;
