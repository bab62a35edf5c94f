// Core types and reconciliation logic for the Easegress MCP adapter

pub mod error;
pub mod lets_encrypt;
pub mod naming;
pub mod objects;
pub mod proxy;
pub mod reconcile;

pub use error::{CoreError, CoreResult};
pub use lets_encrypt::{DnsProviderName, LetsEncryptConfig};
pub use objects::{ObjectKind, ObjectSet};
pub use proxy::{ReverseProxy, ReverseProxyPatch, Route};
pub use reconcile::{Mutation, Plan, RemoteObject};
