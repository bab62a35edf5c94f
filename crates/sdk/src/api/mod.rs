//! Endpoint groups of the Easegress admin API.

mod health;
mod objects;

pub use health::HealthApi;
pub use objects::ObjectsApi;
