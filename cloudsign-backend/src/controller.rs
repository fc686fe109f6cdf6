//! [`ControllerApi`] over the cloud controller's REST API.

use std::time::Duration;

use async_trait::async_trait;
use cloudsign_core::{BackendServer, ControllerApi, GroupInfo, SignError};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::trace;

pub struct HttpController {
    base_url: String,
    client: Client,
}

impl HttpController {
    pub fn new(mut base_url: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;
        let trimmed_len = base_url.trim_end_matches('/').len();
        base_url.truncate(trimmed_len);
        Ok(Self { base_url, client })
    }

    /// GET `path` and decode the body. `None` on 404.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> cloudsign_core::Result<Option<T>> {
        let url = format!("{}{}", self.base_url, path);
        trace!(%url, "controller request");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(SignError::controller)?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body = response.json::<T>().await.map_err(SignError::controller)?;
                Ok(Some(body))
            }
            status => Err(SignError::controller(format!(
                "controller answered {status} for {path}"
            ))),
        }
    }
}

#[async_trait]
impl ControllerApi for HttpController {
    async fn servers_by_group(&self, group: &str) -> cloudsign_core::Result<Vec<BackendServer>> {
        self.get_json(&format!("/v1/groups/{group}/servers"))
            .await?
            .ok_or_else(|| SignError::GroupNotFound(group.to_string()))
    }

    async fn group_by_name(&self, name: &str) -> cloudsign_core::Result<GroupInfo> {
        self.get_json(&format!("/v1/groups/{name}"))
            .await?
            .ok_or_else(|| SignError::GroupNotFound(name.to_string()))
    }

    async fn all_groups(&self) -> cloudsign_core::Result<Vec<GroupInfo>> {
        Ok(self.get_json("/v1/groups").await?.unwrap_or_default())
    }
}
