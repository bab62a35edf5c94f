// Naming scheme that ties logical objects to the remote objects backing them

/// Prefix of every HTTP server this adapter owns; the suffix is the port.
pub const HTTP_SERVER_PREFIX: &str = "mcp_http_server_";

/// Prefix of every pipeline this adapter owns; the suffix is the proxy name.
pub const PIPELINE_PREFIX: &str = "mcp_pipeline_";

/// Name of the proxy filter inside a managed pipeline.
pub const PROXY_FILTER_NAME: &str = "mcp_proxy";

/// Name of the auto-cert manager holding the Let's Encrypt domains.
pub const AUTO_CERT_MANAGER_NAME: &str = "mcp_auto_cert_manager";

pub fn http_server_name(port: u16) -> String {
    format!("{}{}", HTTP_SERVER_PREFIX, port)
}

pub fn pipeline_name(proxy_name: &str) -> String {
    format!("{}{}", PIPELINE_PREFIX, proxy_name)
}

/// Recover the proxy name from a managed pipeline name.
pub fn proxy_name_from_pipeline(pipeline_name: &str) -> Option<&str> {
    pipeline_name
        .strip_prefix(PIPELINE_PREFIX)
        .filter(|name| !name.is_empty())
}

/// Recover the port from a managed HTTP server name.
pub fn port_from_http_server(server_name: &str) -> Option<u16> {
    server_name
        .strip_prefix(HTTP_SERVER_PREFIX)
        .and_then(|port| port.parse().ok())
}

pub fn is_managed_http_server(name: &str) -> bool {
    name.starts_with(HTTP_SERVER_PREFIX)
}

pub fn is_managed_pipeline(name: &str) -> bool {
    name.starts_with(PIPELINE_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        assert_eq!(http_server_name(8080), "mcp_http_server_8080");
        assert_eq!(port_from_http_server("mcp_http_server_8080"), Some(8080));

        assert_eq!(pipeline_name("web"), "mcp_pipeline_web");
        assert_eq!(proxy_name_from_pipeline("mcp_pipeline_web"), Some("web"));
    }

    #[test]
    fn test_foreign_names_are_rejected() {
        assert_eq!(port_from_http_server("http_server_8080"), None);
        assert_eq!(port_from_http_server("mcp_http_server_abc"), None);
        assert_eq!(port_from_http_server("mcp_http_server_70000"), None);
        assert_eq!(proxy_name_from_pipeline("pipeline_web"), None);
        assert_eq!(proxy_name_from_pipeline("mcp_pipeline_"), None);
    }
}
