//! # Easegress SDK
//!
//! Client for the Easegress administrative objects API.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use easegress_sdk::{EasegressClient, EasegressResult};
//!
//! #[tokio::main]
//! async fn main() -> EasegressResult<()> {
//!     let client = EasegressClient::builder()
//!         .base_url("http://127.0.0.1:2381")
//!         .build()?;
//!
//!     client.health().check().await?;
//!
//!     let objects = client.objects().list().await?;
//!     println!("Found {} objects", objects.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Applying a plan
//!
//! ```rust,no_run
//! use easegress_sdk::{EasegressClient, ReverseProxy};
//! use easegress_mcp_core::reconcile::plan_create;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = EasegressClient::builder()
//!     .base_url("http://127.0.0.1:2381")
//!     .build()?;
//!
//! let desired = ReverseProxy {
//!     name: "web".to_string(),
//!     port: 8080,
//!     host: String::new(),
//!     path: "/".to_string(),
//!     is_path_prefix: true,
//!     endpoints: vec!["http://127.0.0.1:9000".to_string()],
//! };
//!
//! let snapshot = client.objects().snapshot().await?;
//! let plan = plan_create(&snapshot, &desired)?;
//! client.objects().apply(&plan).await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod transport;

// Re-export main client
pub use client::{EasegressClient, EasegressClientBuilder};
pub use config::{ClientConfig, RetryConfig};
pub use error::{EasegressError, EasegressResult};

// Re-export core types for convenience
pub use easegress_mcp_core::{
    LetsEncryptConfig, Mutation, ObjectKind, ObjectSet, Plan, RemoteObject, ReverseProxy,
    ReverseProxyPatch,
};
