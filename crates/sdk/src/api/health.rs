//! Health API endpoints.

use crate::client::EasegressClient;
use crate::error::EasegressResult;

/// Health API for checking that the admin API is reachable.
pub struct HealthApi<'a> {
    client: &'a EasegressClient,
}

impl<'a> HealthApi<'a> {
    pub(crate) fn new(client: &'a EasegressClient) -> Self {
        Self { client }
    }

    /// Succeeds when the admin API answers its health endpoint with 2xx.
    pub async fn check(&self) -> EasegressResult<()> {
        self.client.http.get_no_response("healthz").await
    }
}
