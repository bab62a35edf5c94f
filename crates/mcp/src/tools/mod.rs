pub mod lets_encrypt;
pub mod proxy;
mod registry;

pub use lets_encrypt::{
    CreateLetsEncryptTool, DeleteLetsEncryptTool, GetLetsEncryptTool, ListLetsEncryptTool,
    UpdateLetsEncryptTool,
};
pub use proxy::{CreateProxyTool, DeleteProxyTool, GetProxyTool, ListProxiesTool, UpdateProxyTool};
pub use registry::{
    json_schema_array, json_schema_boolean, json_schema_integer,
    json_schema_object, json_schema_string, Tool, ToolAccess, ToolRegistry,
};

use crate::manager::ProxyManager;
use std::sync::Arc;

/// Registry with every reverse proxy and Let's Encrypt tool.
pub fn default_registry(manager: Arc<ProxyManager>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(Arc::new(ListProxiesTool::new(manager.clone())));
    registry.register(Arc::new(GetProxyTool::new(manager.clone())));
    registry.register(Arc::new(CreateProxyTool::new(manager.clone())));
    registry.register(Arc::new(UpdateProxyTool::new(manager.clone())));
    registry.register(Arc::new(DeleteProxyTool::new(manager.clone())));

    registry.register(Arc::new(ListLetsEncryptTool::new(manager.clone())));
    registry.register(Arc::new(GetLetsEncryptTool::new(manager.clone())));
    registry.register(Arc::new(CreateLetsEncryptTool::new(manager.clone())));
    registry.register(Arc::new(UpdateLetsEncryptTool::new(manager.clone())));
    registry.register(Arc::new(DeleteLetsEncryptTool::new(manager)));

    registry
}
