// MCP (Model Context Protocol) server for Easegress
// Exposes reverse proxy and Let's Encrypt management as tools over stdio

pub mod config;
pub mod manager;
pub mod protocol;
pub mod server;
pub mod tools;

pub use config::McpConfig;
pub use manager::ProxyManager;
pub use server::McpServer;
