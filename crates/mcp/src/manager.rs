//! Serialized read-plan-apply cycles against one Easegress instance.

use easegress_mcp_core::reconcile::{self, Plan};
use easegress_mcp_core::{CoreResult, LetsEncryptConfig, ObjectSet, ReverseProxy, ReverseProxyPatch};
use easegress_sdk::{EasegressClient, EasegressError, EasegressResult};
use serde::Serialize;
use tokio::sync::Mutex;

/// Outcome of a mutating operation.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeReport<T> {
    /// State after the change, if the object still exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
    /// Applied mutations, in order.
    pub changes: Vec<String>,
}

/// Owns the client and makes sure at most one plan is applied at a time.
///
/// Each mutation takes a fresh snapshot under the lock so that plans are
/// always computed against the state the previous one left behind.
pub struct ProxyManager {
    client: EasegressClient,
    lock: Mutex<()>,
}

impl ProxyManager {
    pub fn new(client: EasegressClient) -> Self {
        Self {
            client,
            lock: Mutex::new(()),
        }
    }

    async fn snapshot(&self) -> EasegressResult<ObjectSet> {
        self.client.objects().snapshot().await
    }

    /// Snapshot, plan and apply while holding the lock. Returns the applied
    /// summary and the post-change snapshot.
    async fn reconcile<F>(&self, operation: &str, plan: F) -> EasegressResult<(Vec<String>, ObjectSet)>
    where
        F: FnOnce(&ObjectSet) -> CoreResult<Plan>,
    {
        let _guard = self.lock.lock().await;

        let before = self.snapshot().await?;
        let plan = plan(&before)?;
        if plan.is_empty() {
            tracing::debug!(operation, "Nothing to change");
            return Ok((Vec::new(), before));
        }

        tracing::info!(operation, steps = plan.len(), "Applying plan");
        self.client.objects().apply(&plan).await?;
        let after = self.snapshot().await?;
        Ok((plan.summary(), after))
    }

    // Reverse proxies

    pub async fn list_proxies(&self) -> EasegressResult<Vec<ReverseProxy>> {
        Ok(reconcile::reconstruct_proxies(&self.snapshot().await?))
    }

    pub async fn get_proxy(&self, name: &str) -> EasegressResult<Option<ReverseProxy>> {
        Ok(reconcile::find_proxy(&self.snapshot().await?, name))
    }

    pub async fn create_proxy(
        &self,
        desired: &ReverseProxy,
    ) -> EasegressResult<ChangeReport<ReverseProxy>> {
        let (changes, after) = self
            .reconcile("create_proxy", |set| reconcile::plan_create(set, desired))
            .await?;
        Ok(ChangeReport {
            result: reconcile::find_proxy(&after, &desired.name),
            changes,
        })
    }

    pub async fn update_proxy(
        &self,
        patch: &ReverseProxyPatch,
    ) -> EasegressResult<ChangeReport<ReverseProxy>> {
        let (changes, after) = self
            .reconcile("update_proxy", |set| reconcile::plan_update(set, patch))
            .await?;
        Ok(ChangeReport {
            result: reconcile::find_proxy(&after, &patch.name),
            changes,
        })
    }

    pub async fn delete_proxy(&self, name: &str) -> EasegressResult<ChangeReport<ReverseProxy>> {
        let (changes, _) = self
            .reconcile("delete_proxy", |set| reconcile::plan_delete(set, name))
            .await?;
        Ok(ChangeReport {
            result: None,
            changes,
        })
    }

    // Let's Encrypt

    /// All configured domains, with API tokens masked.
    pub async fn list_lets_encrypt(&self) -> EasegressResult<Vec<LetsEncryptConfig>> {
        Ok(reconcile::reconstruct_lets_encrypt(&self.snapshot().await?)
            .iter()
            .map(LetsEncryptConfig::masked)
            .collect())
    }

    pub async fn get_lets_encrypt(&self, domain: &str) -> EasegressResult<Option<LetsEncryptConfig>> {
        Ok(reconcile::find_lets_encrypt(&self.snapshot().await?, domain).map(|c| c.masked()))
    }

    pub async fn create_lets_encrypt(
        &self,
        config: &LetsEncryptConfig,
    ) -> EasegressResult<ChangeReport<LetsEncryptConfig>> {
        let (changes, after) = self
            .reconcile("create_lets_encrypt", |set| {
                reconcile::plan_lets_encrypt_create(set, config)
            })
            .await?;
        Ok(ChangeReport {
            result: reconcile::find_lets_encrypt(&after, &config.domain_name).map(|c| c.masked()),
            changes,
        })
    }

    pub async fn update_lets_encrypt(
        &self,
        config: &LetsEncryptConfig,
    ) -> EasegressResult<ChangeReport<LetsEncryptConfig>> {
        let (changes, after) = self
            .reconcile("update_lets_encrypt", |set| {
                reconcile::plan_lets_encrypt_update(set, config)
            })
            .await?;
        Ok(ChangeReport {
            result: reconcile::find_lets_encrypt(&after, &config.domain_name).map(|c| c.masked()),
            changes,
        })
    }

    pub async fn delete_lets_encrypt(
        &self,
        domain: &str,
    ) -> EasegressResult<ChangeReport<LetsEncryptConfig>> {
        let (changes, _) = self
            .reconcile("delete_lets_encrypt", |set| {
                reconcile::plan_lets_encrypt_delete(set, domain)
            })
            .await?;
        Ok(ChangeReport {
            result: None,
            changes,
        })
    }
}

/// Message shown to tool callers for a failed operation.
pub fn describe_error(err: &EasegressError) -> String {
    match err {
        EasegressError::Http(e) if e.is_connect() || e.is_timeout() => {
            format!("Easegress is unreachable: {}", e)
        }
        other => other.to_string(),
    }
}
