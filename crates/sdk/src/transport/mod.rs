//! Transport layer for the Easegress client.

pub mod http;

pub use http::HttpTransport;
