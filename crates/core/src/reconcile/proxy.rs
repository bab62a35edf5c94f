// Reverse proxies as pipeline + HTTP server path entry pairs

use super::{Mutation, Plan};
use crate::error::{CoreError, CoreResult};
use crate::naming;
use crate::objects::{HttpServer, ObjectKind, ObjectSet, Pipeline};
use crate::proxy::{validate_name, ReverseProxy, ReverseProxyPatch, Route};

const KIND: &str = "HTTP reverse proxy";

/// Where a pipeline is mounted.
struct Mount<'a> {
    server: &'a HttpServer,
    route: Route,
}

/// First managed server (by port) routing to `backend`.
fn find_mount<'a>(set: &'a ObjectSet, backend: &str) -> Option<Mount<'a>> {
    set.managed_http_servers().find_map(|server| {
        server
            .route_to(backend)
            .map(|route| Mount { server, route })
    })
}

fn proxy_from_pipeline(set: &ObjectSet, pipeline: &Pipeline) -> Option<ReverseProxy> {
    let name = naming::proxy_name_from_pipeline(&pipeline.name)?;
    let Some(mount) = find_mount(set, &pipeline.name) else {
        tracing::debug!(pipeline = %pipeline.name, "Pipeline is not mounted on any HTTP server");
        return None;
    };

    Some(ReverseProxy {
        name: name.to_string(),
        port: mount.route.port,
        host: mount.route.host,
        path: mount.route.path,
        is_path_prefix: mount.route.is_path_prefix,
        endpoints: pipeline.endpoints(),
    })
}

/// Every reverse proxy present in the snapshot, sorted by name.
///
/// A managed pipeline that no managed HTTP server routes to is not a proxy.
pub fn reconstruct_proxies(set: &ObjectSet) -> Vec<ReverseProxy> {
    let mut proxies: Vec<ReverseProxy> = set
        .pipelines()
        .iter()
        .filter_map(|pipeline| proxy_from_pipeline(set, pipeline))
        .collect();
    proxies.sort_by(|a, b| a.name.cmp(&b.name));
    proxies
}

pub fn find_proxy(set: &ObjectSet, name: &str) -> Option<ReverseProxy> {
    set.pipeline(&naming::pipeline_name(name))
        .and_then(|pipeline| proxy_from_pipeline(set, pipeline))
}

/// Fail if a foreign HTTP server already listens on the route's port.
fn check_port_owner(set: &ObjectSet, port: u16) -> CoreResult<()> {
    let managed = naming::http_server_name(port);
    match set
        .http_servers()
        .iter()
        .find(|server| server.port == port && server.name != managed)
    {
        Some(foreign) => Err(CoreError::Conflict(format!(
            "port {} is already bound by HTTP server {}",
            port, foreign.name
        ))),
        None => Ok(()),
    }
}

fn mount_on(server: &mut HttpServer, route: &Route, backend: &str) -> CoreResult<()> {
    if let Some(existing) = server.backend_for(route) {
        if existing != backend {
            return Err(CoreError::Conflict(format!(
                "route {} is already served by {}",
                route, existing
            )));
        }
        return Ok(());
    }
    server.mount(route, backend);
    Ok(())
}

/// Mutation that adds `route -> backend` to the managed server of its port.
fn mount(set: &ObjectSet, route: &Route, backend: &str) -> CoreResult<Mutation> {
    check_port_owner(set, route.port)?;

    match set.http_server(&naming::http_server_name(route.port)) {
        Some(existing) => {
            let mut server = existing.clone();
            mount_on(&mut server, route, backend)?;
            Ok(Mutation::update(server))
        }
        None => {
            let mut server = HttpServer::managed(route.port);
            server.mount(route, backend);
            Ok(Mutation::create(server))
        }
    }
}

/// Mutation that removes every path to `backend` from `server`, deleting the
/// server once no rule is left.
fn unmount(server: &HttpServer, backend: &str) -> Mutation {
    let mut server = server.clone();
    server.unmount(backend);
    if server.rules.is_empty() {
        Mutation::delete(ObjectKind::HttpServer, server.name)
    } else {
        Mutation::update(server)
    }
}

pub fn plan_create(set: &ObjectSet, desired: &ReverseProxy) -> CoreResult<Plan> {
    desired.validate()?;

    let pipeline_name = naming::pipeline_name(&desired.name);
    if set.pipeline(&pipeline_name).is_some() {
        return Err(CoreError::AlreadyExists {
            kind: KIND,
            name: desired.name.clone(),
        });
    }

    let mount = mount(set, &desired.route(), &pipeline_name)?;

    let mut plan = Plan::new();
    plan.push(Mutation::create(Pipeline::proxy(
        &pipeline_name,
        &desired.endpoints,
    )));
    plan.push(mount);
    Ok(plan)
}

pub fn plan_update(set: &ObjectSet, patch: &ReverseProxyPatch) -> CoreResult<Plan> {
    validate_name(&patch.name)?;

    let pipeline_name = naming::pipeline_name(&patch.name);
    let not_found = || CoreError::NotFound {
        kind: KIND,
        name: patch.name.clone(),
    };
    let pipeline = set.pipeline(&pipeline_name).ok_or_else(not_found)?;
    let current = proxy_from_pipeline(set, pipeline).ok_or_else(not_found)?;
    let old_mount = find_mount(set, &pipeline_name).ok_or_else(not_found)?;

    let desired = patch.apply_to(&current);
    desired.validate()?;

    let mut plan = Plan::new();

    if desired.endpoints != current.endpoints {
        let mut pipeline = pipeline.clone();
        pipeline.set_endpoints(&desired.endpoints);
        plan.push(Mutation::update(pipeline));
    }

    let (from, to) = (current.route(), desired.route());
    if from != to {
        if from.port == to.port {
            check_port_owner(set, to.port)?;
            let mut server = old_mount.server.clone();
            server.unmount(&pipeline_name);
            mount_on(&mut server, &to, &pipeline_name)?;
            plan.push(Mutation::update(server));
        } else {
            // Mount on the new port before unmounting the old one.
            plan.push(mount(set, &to, &pipeline_name)?);
            plan.push(unmount(old_mount.server, &pipeline_name));
        }
    }

    Ok(plan)
}

pub fn plan_delete(set: &ObjectSet, name: &str) -> CoreResult<Plan> {
    validate_name(name)?;

    let pipeline_name = naming::pipeline_name(name);
    let pipeline = set.pipeline(&pipeline_name);
    let mounted: Vec<&HttpServer> = set
        .managed_http_servers()
        .filter(|server| server.routes_to(&pipeline_name))
        .collect();

    if pipeline.is_none() && mounted.is_empty() {
        return Err(CoreError::NotFound {
            kind: KIND,
            name: name.to_string(),
        });
    }

    let mut plan = Plan::new();
    for server in mounted {
        plan.push(unmount(server, &pipeline_name));
    }
    if pipeline.is_some() {
        plan.push(Mutation::delete(ObjectKind::Pipeline, pipeline_name));
    }
    Ok(plan)
}
