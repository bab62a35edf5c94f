//! Objects API endpoints.

use crate::client::EasegressClient;
use crate::error::{EasegressError, EasegressResult};
use easegress_mcp_core::reconcile::{Mutation, Plan, RemoteObject};
use easegress_mcp_core::ObjectSet;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

/// Objects API for reading and writing Easegress objects of any kind.
pub struct ObjectsApi<'a> {
    client: &'a EasegressClient,
}

fn object_path(name: &str) -> String {
    format!("objects/{}", name)
}

impl<'a> ObjectsApi<'a> {
    pub(crate) fn new(client: &'a EasegressClient) -> Self {
        Self { client }
    }

    /// List every object, of every kind, as raw JSON.
    pub async fn list(&self) -> EasegressResult<Vec<serde_json::Value>> {
        let objects: Option<Vec<serde_json::Value>> = self.client.http.get("objects").await?;
        Ok(objects.unwrap_or_default())
    }

    /// Get one object by name. Returns `None` if it does not exist.
    pub async fn get<T: DeserializeOwned>(&self, name: &str) -> EasegressResult<Option<T>> {
        self.client.http.get_optional(&object_path(name)).await
    }

    pub async fn create(&self, object: &RemoteObject) -> EasegressResult<()> {
        self.client.http.post_no_response("objects", object).await
    }

    pub async fn update(&self, object: &RemoteObject) -> EasegressResult<()> {
        self.client
            .http
            .put_no_response(&object_path(object.name()), object)
            .await
    }

    pub async fn delete(&self, name: &str) -> EasegressResult<()> {
        self.client.http.delete_no_response(&object_path(name)).await
    }

    /// Snapshot of the objects relevant to reconciliation.
    pub async fn snapshot(&self) -> EasegressResult<ObjectSet> {
        let objects = self.list().await?;
        Ok(ObjectSet::from_objects(objects)?)
    }

    /// Execute one mutation. Deleting an object that is already gone succeeds.
    pub async fn execute(&self, mutation: &Mutation) -> EasegressResult<()> {
        match mutation {
            Mutation::Create(object) => self.create(object).await,
            Mutation::Update(object) => self.update(object).await,
            Mutation::Delete { name, .. } => match self.delete(name).await {
                Err(e) if e.is_not_found() => {
                    warn!(object = %name, "Object already deleted");
                    Ok(())
                }
                other => other,
            },
        }
    }

    /// Execute a plan in order, stopping at the first failure.
    ///
    /// Returns the number of applied mutations. Mutations applied before a
    /// failure are not rolled back; the error reports how far the plan got.
    pub async fn apply(&self, plan: &Plan) -> EasegressResult<usize> {
        let total = plan.len();
        for (applied, mutation) in plan.mutations().iter().enumerate() {
            if let Err(e) = self.execute(mutation).await {
                return Err(EasegressError::PartialApply {
                    applied,
                    total,
                    mutation: mutation.to_string(),
                    source: Box::new(e),
                });
            }
            info!(
                step = applied + 1,
                total = total,
                mutation = %mutation,
                "Applied change"
            );
        }
        Ok(total)
    }
}
