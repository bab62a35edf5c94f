//! Planning of remote mutations.
//!
//! Every operation reads an [`ObjectSet`](crate::objects::ObjectSet) snapshot
//! and returns a [`Plan`]: the ordered remote calls that turn the snapshot
//! into the desired state. Planning never performs I/O.

mod lets_encrypt;
mod proxy;

pub use lets_encrypt::{
    find_lets_encrypt, plan_lets_encrypt_create, plan_lets_encrypt_delete,
    plan_lets_encrypt_update, reconstruct_lets_encrypt,
};
pub use proxy::{find_proxy, plan_create, plan_delete, plan_update, reconstruct_proxies};

use crate::objects::{AutoCertManager, HttpServer, ObjectKind, Pipeline};
use serde::Serialize;

/// A full remote object, as sent on create and update.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RemoteObject {
    HttpServer(HttpServer),
    Pipeline(Pipeline),
    AutoCertManager(AutoCertManager),
}

impl RemoteObject {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::HttpServer(_) => ObjectKind::HttpServer,
            Self::Pipeline(_) => ObjectKind::Pipeline,
            Self::AutoCertManager(_) => ObjectKind::AutoCertManager,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::HttpServer(server) => &server.name,
            Self::Pipeline(pipeline) => &pipeline.name,
            Self::AutoCertManager(manager) => &manager.name,
        }
    }
}

impl From<HttpServer> for RemoteObject {
    fn from(server: HttpServer) -> Self {
        Self::HttpServer(server)
    }
}

impl From<Pipeline> for RemoteObject {
    fn from(pipeline: Pipeline) -> Self {
        Self::Pipeline(pipeline)
    }
}

impl From<AutoCertManager> for RemoteObject {
    fn from(manager: AutoCertManager) -> Self {
        Self::AutoCertManager(manager)
    }
}

/// One remote call.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Create(RemoteObject),
    Update(RemoteObject),
    Delete { kind: ObjectKind, name: String },
}

impl Mutation {
    pub fn create(object: impl Into<RemoteObject>) -> Self {
        Self::Create(object.into())
    }

    pub fn update(object: impl Into<RemoteObject>) -> Self {
        Self::Update(object.into())
    }

    pub fn delete(kind: ObjectKind, name: impl Into<String>) -> Self {
        Self::Delete {
            kind,
            name: name.into(),
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            Self::Create(_) => "create",
            Self::Update(_) => "update",
            Self::Delete { .. } => "delete",
        }
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Create(object) | Self::Update(object) => object.kind(),
            Self::Delete { kind, .. } => *kind,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Create(object) | Self::Update(object) => object.name(),
            Self::Delete { name, .. } => name,
        }
    }
}

impl std::fmt::Display for Mutation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.verb(), self.kind(), self.name())
    }
}

/// Ordered list of mutations. Order matters: pipelines are created before
/// the routes pointing at them and deleted after those routes are gone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    mutations: Vec<Mutation>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, mutation: Mutation) {
        self.mutations.push(mutation);
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    /// One line per mutation, e.g. `create Pipeline mcp_pipeline_web`.
    pub fn summary(&self) -> Vec<String> {
        self.mutations.iter().map(ToString::to_string).collect()
    }
}

impl IntoIterator for Plan {
    type Item = Mutation;
    type IntoIter = std::vec::IntoIter<Mutation>;

    fn into_iter(self) -> Self::IntoIter {
        self.mutations.into_iter()
    }
}

impl<'a> IntoIterator for &'a Plan {
    type Item = &'a Mutation;
    type IntoIter = std::slice::Iter<'a, Mutation>;

    fn into_iter(self) -> Self::IntoIter {
        self.mutations.iter()
    }
}
