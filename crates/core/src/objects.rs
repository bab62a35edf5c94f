//! Typed views of the Easegress objects this adapter reads and writes.
//!
//! Every type keeps the fields it does not model in a flattened `extra` map,
//! so a read-modify-write cycle sends back whatever someone else configured.

use crate::error::{CoreError, CoreResult};
use crate::naming;
use crate::proxy::Route;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Fields of a remote object that are carried through untouched.
pub type Extra = Map<String, Value>;

/// Go encodes empty slices as `null`; treat that as the default value.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Kind of a remote object, as spelled by the admin API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    #[serde(rename = "HTTPServer")]
    HttpServer,
    #[serde(rename = "Pipeline")]
    Pipeline,
    #[serde(rename = "AutoCertManager")]
    AutoCertManager,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HttpServer => "HTTPServer",
            Self::Pipeline => "Pipeline",
            Self::AutoCertManager => "AutoCertManager",
        }
    }

    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "HTTPServer" => Some(Self::HttpServer),
            "Pipeline" => Some(Self::Pipeline),
            "AutoCertManager" => Some(Self::AutoCertManager),
            _ => None,
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn http_server_kind() -> String {
    ObjectKind::HttpServer.as_str().to_string()
}

fn pipeline_kind() -> String {
    ObjectKind::Pipeline.as_str().to_string()
}

fn auto_cert_manager_kind() -> String {
    ObjectKind::AutoCertManager.as_str().to_string()
}

// ----------------------------------------------------------------------------
// HTTPServer
// ----------------------------------------------------------------------------

/// An HTTP listener bound to a port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpServer {
    #[serde(default = "http_server_kind")]
    pub kind: String,
    pub name: String,
    pub port: u16,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rules: Vec<Rule>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Host-scoped group of path entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub host: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub paths: Vec<PathRule>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// A single path match forwarding to a pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathRule {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(
        default,
        rename = "pathPrefix",
        skip_serializing_if = "String::is_empty"
    )]
    pub path_prefix: String,
    #[serde(default)]
    pub backend: String,
    #[serde(flatten)]
    pub extra: Extra,
}

impl PathRule {
    pub fn new(path: &str, is_path_prefix: bool, backend: &str) -> Self {
        let mut rule = Self {
            backend: backend.to_string(),
            ..Default::default()
        };
        if is_path_prefix {
            rule.path_prefix = path.to_string();
        } else {
            rule.path = path.to_string();
        }
        rule
    }

    /// The matched path and whether it is a prefix match.
    pub fn matcher(&self) -> (&str, bool) {
        if self.path_prefix.is_empty() {
            (&self.path, false)
        } else {
            (&self.path_prefix, true)
        }
    }
}

impl HttpServer {
    /// An empty HTTP server owned by this adapter.
    pub fn managed(port: u16) -> Self {
        Self {
            kind: http_server_kind(),
            name: naming::http_server_name(port),
            port,
            rules: Vec::new(),
            extra: Extra::new(),
        }
    }

    /// First route that forwards to `backend`, scanning rules then paths in order.
    pub fn route_to(&self, backend: &str) -> Option<Route> {
        self.rules.iter().find_map(|rule| {
            rule.paths
                .iter()
                .find(|path| path.backend == backend)
                .map(|path| {
                    let (matched, is_path_prefix) = path.matcher();
                    Route {
                        port: self.port,
                        host: rule.host.clone(),
                        path: matched.to_string(),
                        is_path_prefix,
                    }
                })
        })
    }

    pub fn routes_to(&self, backend: &str) -> bool {
        self.route_to(backend).is_some()
    }

    /// Backend currently serving exactly this host and path match, if any.
    pub fn backend_for(&self, route: &Route) -> Option<&str> {
        self.rules
            .iter()
            .filter(|rule| rule.host == route.host)
            .flat_map(|rule| rule.paths.iter())
            .find(|path| path.matcher() == (route.path.as_str(), route.is_path_prefix))
            .map(|path| path.backend.as_str())
    }

    /// Append a path entry for `route`, reusing the first rule with the same host.
    pub fn mount(&mut self, route: &Route, backend: &str) {
        let path = PathRule::new(&route.path, route.is_path_prefix, backend);
        match self.rules.iter_mut().find(|rule| rule.host == route.host) {
            Some(rule) => rule.paths.push(path),
            None => self.rules.push(Rule {
                host: route.host.clone(),
                paths: vec![path],
                extra: Extra::new(),
            }),
        }
    }

    /// Remove every path entry forwarding to `backend`, then drop every rule
    /// left without paths. Returns the number of removed entries.
    pub fn unmount(&mut self, backend: &str) -> usize {
        let mut removed = 0;
        self.rules.retain_mut(|rule| {
            let before = rule.paths.len();
            rule.paths.retain(|path| path.backend != backend);
            removed += before - rule.paths.len();
            !rule.paths.is_empty()
        });
        removed
    }
}

// ----------------------------------------------------------------------------
// Pipeline
// ----------------------------------------------------------------------------

/// A named chain of filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    #[serde(default = "pipeline_kind")]
    pub kind: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub flow: Vec<FlowNode>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub filters: Vec<Filter>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowNode {
    pub filter: String,
    #[serde(flatten)]
    pub extra: Extra,
}

/// A filter definition. Only the pools of `Proxy` filters are modelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub kind: String,
    pub name: String,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub pools: Vec<ProxyPool>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProxyPool {
    #[serde(default, deserialize_with = "null_as_default")]
    pub servers: Vec<PoolServer>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolServer {
    pub url: String,
    #[serde(flatten)]
    pub extra: Extra,
}

impl PoolServer {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            extra: Extra::new(),
        }
    }
}

pub const PROXY_FILTER_KIND: &str = "Proxy";

impl Pipeline {
    /// A pipeline with a single round-robin proxy filter over `endpoints`.
    pub fn proxy(name: &str, endpoints: &[String]) -> Self {
        let mut pool_extra = Extra::new();
        pool_extra.insert(
            "loadBalance".to_string(),
            serde_json::json!({ "policy": "roundRobin" }),
        );

        Self {
            kind: pipeline_kind(),
            name: name.to_string(),
            flow: vec![FlowNode {
                filter: naming::PROXY_FILTER_NAME.to_string(),
                extra: Extra::new(),
            }],
            filters: vec![Filter {
                kind: PROXY_FILTER_KIND.to_string(),
                name: naming::PROXY_FILTER_NAME.to_string(),
                pools: vec![ProxyPool {
                    servers: endpoints.iter().cloned().map(PoolServer::new).collect(),
                    extra: pool_extra,
                }],
                extra: Extra::new(),
            }],
            extra: Extra::new(),
        }
    }

    /// Every backend URL of every pool of every proxy filter, in order.
    pub fn endpoints(&self) -> Vec<String> {
        self.filters
            .iter()
            .filter(|filter| filter.kind == PROXY_FILTER_KIND)
            .flat_map(|filter| filter.pools.iter())
            .flat_map(|pool| pool.servers.iter())
            .map(|server| server.url.clone())
            .collect()
    }

    /// Replace the servers of the managed proxy filter's first pool.
    ///
    /// Servers whose URL survives keep their extra settings (weights, tags).
    /// A pipeline without a proxy filter gets one appended to its flow.
    pub fn set_endpoints(&mut self, endpoints: &[String]) {
        let position = self
            .filters
            .iter()
            .position(|f| f.kind == PROXY_FILTER_KIND && f.name == naming::PROXY_FILTER_NAME)
            .or_else(|| self.filters.iter().position(|f| f.kind == PROXY_FILTER_KIND));

        let index = match position {
            Some(index) => index,
            None => {
                let template = Self::proxy(&self.name, &[]);
                self.flow.extend(template.flow);
                self.filters.extend(template.filters);
                self.filters.len() - 1
            }
        };

        let filter = &mut self.filters[index];
        if filter.pools.is_empty() {
            filter.pools.push(ProxyPool::default());
        }
        let pool = &mut filter.pools[0];
        let previous = std::mem::take(&mut pool.servers);
        pool.servers = endpoints
            .iter()
            .map(|url| {
                previous
                    .iter()
                    .find(|server| &server.url == url)
                    .cloned()
                    .unwrap_or_else(|| PoolServer::new(url.clone()))
            })
            .collect();
    }
}

// ----------------------------------------------------------------------------
// AutoCertManager
// ----------------------------------------------------------------------------

/// ACME certificate manager. The admin API allows a single instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoCertManager {
    #[serde(default = "auto_cert_manager_kind")]
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, rename = "enableHTTP01")]
    pub enable_http01: bool,
    #[serde(default, rename = "enableTLSALPN01")]
    pub enable_tls_alpn01: bool,
    #[serde(default, rename = "enableDNS01")]
    pub enable_dns01: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub domains: Vec<AutoCertDomain>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoCertDomain {
    pub name: String,
    #[serde(
        default,
        rename = "dnsProvider",
        skip_serializing_if = "Option::is_none"
    )]
    pub dns_provider: Option<DnsProvider>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DnsProvider {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub zone: String,
    #[serde(default, rename = "apiToken")]
    pub api_token: String,
    #[serde(flatten)]
    pub extra: Extra,
}

impl AutoCertManager {
    /// A manager owned by this adapter with every challenge type enabled.
    pub fn managed(email: &str, domains: Vec<AutoCertDomain>) -> Self {
        Self {
            kind: auto_cert_manager_kind(),
            name: naming::AUTO_CERT_MANAGER_NAME.to_string(),
            email: email.to_string(),
            enable_http01: true,
            enable_tls_alpn01: true,
            enable_dns01: true,
            domains,
            extra: Extra::new(),
        }
    }

    pub fn domain(&self, name: &str) -> Option<&AutoCertDomain> {
        self.domains.iter().find(|domain| domain.name == name)
    }
}

// ----------------------------------------------------------------------------
// Snapshot
// ----------------------------------------------------------------------------

/// Point-in-time view of the remote objects relevant to this adapter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectSet {
    http_servers: Vec<HttpServer>,
    pipelines: Vec<Pipeline>,
    auto_cert_managers: Vec<AutoCertManager>,
}

fn decode<T: serde::de::DeserializeOwned>(
    kind: ObjectKind,
    name: &str,
    object: Value,
) -> CoreResult<T> {
    serde_json::from_value(object).map_err(|e| CoreError::Decode {
        kind: kind.as_str(),
        name: name.to_string(),
        reason: e.to_string(),
    })
}

impl ObjectSet {
    pub fn new(
        http_servers: Vec<HttpServer>,
        pipelines: Vec<Pipeline>,
        auto_cert_managers: Vec<AutoCertManager>,
    ) -> Self {
        let mut set = Self {
            http_servers,
            pipelines,
            auto_cert_managers,
        };
        set.http_servers
            .sort_by(|a, b| a.port.cmp(&b.port).then_with(|| a.name.cmp(&b.name)));
        set.pipelines.sort_by(|a, b| a.name.cmp(&b.name));
        set
    }

    /// Build a snapshot from the raw object list returned by the admin API.
    ///
    /// Objects of other kinds are ignored. A managed object that fails to
    /// decode is an error; a foreign one is skipped.
    pub fn from_objects(objects: Vec<Value>) -> CoreResult<Self> {
        let mut http_servers = Vec::new();
        let mut pipelines = Vec::new();
        let mut auto_cert_managers = Vec::new();

        for object in objects {
            let Some(kind) = object
                .get("kind")
                .and_then(Value::as_str)
                .and_then(ObjectKind::parse)
            else {
                continue;
            };
            let name = object
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();

            match kind {
                ObjectKind::HttpServer => match decode::<HttpServer>(kind, &name, object) {
                    Ok(server) => http_servers.push(server),
                    Err(e) if naming::is_managed_http_server(&name) => return Err(e),
                    Err(e) => tracing::warn!(error = %e, "Skipping undecodable HTTP server"),
                },
                ObjectKind::Pipeline => {
                    if naming::is_managed_pipeline(&name) {
                        pipelines.push(decode(kind, &name, object)?);
                    }
                }
                ObjectKind::AutoCertManager => {
                    match decode::<AutoCertManager>(kind, &name, object) {
                        Ok(manager) => auto_cert_managers.push(manager),
                        Err(e) if name == naming::AUTO_CERT_MANAGER_NAME => return Err(e),
                        Err(e) => {
                            tracing::warn!(error = %e, "Skipping undecodable auto-cert manager")
                        }
                    }
                }
            }
        }

        Ok(Self::new(http_servers, pipelines, auto_cert_managers))
    }

    /// Every HTTP server, sorted by port.
    pub fn http_servers(&self) -> &[HttpServer] {
        &self.http_servers
    }

    /// HTTP servers owned by this adapter, sorted by port.
    pub fn managed_http_servers(&self) -> impl Iterator<Item = &HttpServer> {
        self.http_servers
            .iter()
            .filter(|server| naming::is_managed_http_server(&server.name))
    }

    pub fn http_server(&self, name: &str) -> Option<&HttpServer> {
        self.http_servers.iter().find(|server| server.name == name)
    }

    /// Managed pipelines, sorted by name.
    pub fn pipelines(&self) -> &[Pipeline] {
        &self.pipelines
    }

    pub fn pipeline(&self, name: &str) -> Option<&Pipeline> {
        self.pipelines.iter().find(|pipeline| pipeline.name == name)
    }

    pub fn auto_cert_managers(&self) -> &[AutoCertManager] {
        &self.auto_cert_managers
    }

    pub fn auto_cert_manager(&self, name: &str) -> Option<&AutoCertManager> {
        self.auto_cert_managers
            .iter()
            .find(|manager| manager.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn route(host: &str, path: &str, is_path_prefix: bool) -> Route {
        Route {
            port: 8080,
            host: host.to_string(),
            path: path.to_string(),
            is_path_prefix,
        }
    }

    #[test]
    fn test_http_server_preserves_unknown_fields() {
        let raw = json!({
            "kind": "HTTPServer",
            "name": "mcp_http_server_8080",
            "port": 8080,
            "keepAlive": true,
            "rules": [{
                "host": "example.com",
                "ipFilter": {"blockByDefault": false},
                "paths": [{"pathPrefix": "/api", "backend": "mcp_pipeline_api", "methods": ["GET"]}]
            }]
        });

        let server: HttpServer = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(server.rules[0].paths[0].matcher(), ("/api", true));
        assert_eq!(serde_json::to_value(&server).unwrap(), raw);
    }

    #[test]
    fn test_null_collections_decode_as_empty() {
        let server: HttpServer = serde_json::from_value(json!({
            "kind": "HTTPServer", "name": "s", "port": 80, "rules": null
        }))
        .unwrap();
        assert!(server.rules.is_empty());

        let pipeline: Pipeline = serde_json::from_value(json!({
            "name": "p", "flow": null, "filters": null
        }))
        .unwrap();
        assert!(pipeline.filters.is_empty());
        assert_eq!(pipeline.kind, "Pipeline");
    }

    #[test]
    fn test_mount_reuses_rule_with_same_host() {
        let mut server = HttpServer::managed(8080);
        server.mount(&route("a.com", "/one", false), "p1");
        server.mount(&route("a.com", "/two", true), "p2");
        server.mount(&route("b.com", "/", false), "p3");

        assert_eq!(server.rules.len(), 2);
        assert_eq!(server.rules[0].paths.len(), 2);
        assert_eq!(server.backend_for(&route("a.com", "/two", true)), Some("p2"));
        assert_eq!(server.backend_for(&route("a.com", "/two", false)), None);
        assert_eq!(server.rules[1].paths.len(), 1);
    }

    #[test]
    fn test_unmount_drops_every_pathless_rule() {
        let mut server = HttpServer::managed(8080);
        server.rules.push(Rule {
            host: "empty.com".to_string(),
            ..Default::default()
        });
        server.mount(&route("a.com", "/one", false), "p1");
        server.mount(&route("b.com", "/two", false), "p2");

        assert_eq!(server.unmount("p1"), 1);
        assert_eq!(server.rules.len(), 1);
        assert_eq!(server.rules[0].host, "b.com");
        assert!(!server.routes_to("p1"));
        assert!(server.routes_to("p2"));
        assert_eq!(server.unmount("missing"), 0);
    }

    #[test]
    fn test_set_endpoints_keeps_surviving_server_settings() {
        let mut pipeline = Pipeline::proxy("mcp_pipeline_web", &["http://a:1".to_string()]);
        pipeline.filters[0].pools[0].servers[0]
            .extra
            .insert("weight".to_string(), json!(5));

        pipeline.set_endpoints(&["http://b:2".to_string(), "http://a:1".to_string()]);

        let servers = &pipeline.filters[0].pools[0].servers;
        assert_eq!(pipeline.endpoints(), vec!["http://b:2", "http://a:1"]);
        assert!(servers[0].extra.is_empty());
        assert_eq!(servers[1].extra.get("weight"), Some(&json!(5)));
        assert!(pipeline.filters[0].pools[0].extra.contains_key("loadBalance"));
    }

    #[test]
    fn test_set_endpoints_adds_missing_proxy_filter() {
        let mut pipeline: Pipeline = serde_json::from_value(json!({
            "name": "mcp_pipeline_web",
            "flow": [{"filter": "validator"}],
            "filters": [{"kind": "Validator", "name": "validator", "headers": {}}]
        }))
        .unwrap();

        pipeline.set_endpoints(&["http://a:1".to_string()]);

        assert_eq!(pipeline.flow.len(), 2);
        assert_eq!(pipeline.flow[1].filter, "mcp_proxy");
        assert_eq!(pipeline.endpoints(), vec!["http://a:1"]);
    }

    #[test]
    fn test_object_set_partitions_by_kind() {
        let set = ObjectSet::from_objects(vec![
            json!({"kind": "HTTPServer", "name": "mcp_http_server_9090", "port": 9090}),
            json!({"kind": "HTTPServer", "name": "legacy", "port": 80}),
            json!({"kind": "Pipeline", "name": "mcp_pipeline_a", "filters": []}),
            json!({"kind": "Pipeline", "name": "other", "filters": []}),
            json!({"kind": "AutoCertManager", "name": "mcp_auto_cert_manager", "email": "a@b.c"}),
            json!({"kind": "GlobalFilter", "name": "gf"}),
        ])
        .unwrap();

        assert_eq!(set.http_servers().len(), 2);
        assert_eq!(set.http_servers()[0].name, "legacy");
        assert_eq!(set.managed_http_servers().count(), 1);
        assert_eq!(set.pipelines().len(), 1);
        assert!(set.auto_cert_manager("mcp_auto_cert_manager").is_some());
    }

    #[test]
    fn test_undecodable_managed_object_is_an_error() {
        let err = ObjectSet::from_objects(vec![
            json!({"kind": "HTTPServer", "name": "mcp_http_server_80", "port": "eighty"}),
        ])
        .unwrap_err();
        assert!(matches!(err, CoreError::Decode { kind: "HTTPServer", .. }));

        let set = ObjectSet::from_objects(vec![
            json!({"kind": "HTTPServer", "name": "foreign", "port": "eighty"}),
        ])
        .unwrap();
        assert!(set.http_servers().is_empty());
    }
}
